// crates/rewrite/src/filters/css.rs

//! Stylesheet rewrite filter (`cf`).

use domain::FilterId;
use html::{Document, ElementId, HtmlFilter, Keyword};

use crate::engine::RewriteRequest;
use crate::filters::{rel_is_stylesheet, FilterSeam};

pub struct CssRewriteFilter {
    seam: FilterSeam,
}

impl CssRewriteFilter {
    pub(crate) fn new(seam: FilterSeam) -> Self {
        CssRewriteFilter { seam }
    }
}

impl HtmlFilter for CssRewriteFilter {
    fn name(&self) -> &'static str {
        "css-filter"
    }

    fn start_element(&mut self, doc: &mut Document, id: ElementId) {
        let element = doc.get(id);
        if element.keyword != Keyword::Link {
            return;
        }
        let is_stylesheet = element
            .attribute_value("rel")
            .is_some_and(|rel| rel_is_stylesheet(&rel));
        if !is_stylesheet {
            return;
        }
        let Some((index, url)) = self.seam.rewritable_url(doc, id, "href") else {
            return;
        };
        self.seam.attach(
            doc,
            id,
            index,
            RewriteRequest {
                filter: FilterId::CssFilter,
                inputs: vec![url],
                dimensions: None,
                context: self.seam.context,
            },
        );
    }
}
