// crates/rewrite/src/filters/js.rs

//! External script rewrite filter (`jm`). Inline scripts are untouched.

use domain::FilterId;
use html::{Document, ElementId, HtmlFilter, Keyword};

use crate::engine::RewriteRequest;
use crate::filters::FilterSeam;

pub struct JsRewriteFilter {
    seam: FilterSeam,
}

impl JsRewriteFilter {
    pub(crate) fn new(seam: FilterSeam) -> Self {
        JsRewriteFilter { seam }
    }
}

impl HtmlFilter for JsRewriteFilter {
    fn name(&self) -> &'static str {
        "js-minify"
    }

    fn start_element(&mut self, doc: &mut Document, id: ElementId) {
        if doc.get(id).keyword != Keyword::Script {
            return;
        }
        let Some((index, url)) = self.seam.rewritable_url(doc, id, "src") else {
            return;
        };
        self.seam.attach(
            doc,
            id,
            index,
            RewriteRequest {
                filter: FilterId::JsMinify,
                inputs: vec![url],
                dimensions: None,
                context: self.seam.context,
            },
        );
    }
}
