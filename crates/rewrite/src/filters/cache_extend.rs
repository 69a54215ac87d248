// crates/rewrite/src/filters/cache_extend.rs

//! Cache extension filter (`ce`).
//!
//! Renames referenced resources to content-hashed URLs without touching
//! their bytes, buying far-future caching. It only takes elements the
//! type-specific filters leave on the table: when `ic`, `cf`, or `jm` is
//! active for a tag, that filter owns it.

use domain::FilterId;
use html::{Document, ElementId, HtmlFilter, Keyword};

use crate::engine::RewriteRequest;
use crate::filters::{rel_is_stylesheet, FilterSeam};

pub struct CacheExtendFilter {
    seam: FilterSeam,
    extend_images: bool,
    extend_styles: bool,
    extend_scripts: bool,
}

impl CacheExtendFilter {
    pub(crate) fn new(seam: FilterSeam) -> Self {
        let options = seam.engine.options();
        CacheExtendFilter {
            extend_images: !options.is_enabled(FilterId::ImageCompress),
            extend_styles: !options.is_enabled(FilterId::CssFilter),
            extend_scripts: !options.is_enabled(FilterId::JsMinify),
            seam,
        }
    }
}

impl HtmlFilter for CacheExtendFilter {
    fn name(&self) -> &'static str {
        "cache-extend"
    }

    fn start_element(&mut self, doc: &mut Document, id: ElementId) {
        let element = doc.get(id);
        let attribute = match element.keyword {
            Keyword::Img if self.extend_images => "src",
            Keyword::Script if self.extend_scripts => "src",
            Keyword::Link if self.extend_styles => {
                let is_stylesheet = element
                    .attribute_value("rel")
                    .is_some_and(|rel| rel_is_stylesheet(&rel));
                if !is_stylesheet {
                    return;
                }
                "href"
            }
            _ => return,
        };
        let Some((index, url)) = self.seam.rewritable_url(doc, id, attribute) else {
            return;
        };
        self.seam.attach(
            doc,
            id,
            index,
            RewriteRequest {
                filter: FilterId::CacheExtend,
                inputs: vec![url],
                dimensions: None,
                context: self.seam.context,
            },
        );
    }
}
