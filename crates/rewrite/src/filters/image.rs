// crates/rewrite/src/filters/image.rs

//! Image compression filter (`ic`).
//!
//! Rewrites `<img src>` references, carrying the declared width and height
//! into the request so the backend can resize to the rendered size. The
//! client context rides in the fingerprint, not in the attributes, so a
//! webp-capable and a webp-less client get distinct outputs.

use domain::FilterId;
use html::{Document, ElementId, HtmlFilter, Keyword};

use crate::encoder::ImageDimensions;
use crate::engine::RewriteRequest;
use crate::filters::FilterSeam;

pub struct ImageRewriteFilter {
    seam: FilterSeam,
}

impl ImageRewriteFilter {
    pub(crate) fn new(seam: FilterSeam) -> Self {
        ImageRewriteFilter { seam }
    }
}

/// Parse a width/height attribute. Percentages and other CSS lengths do
/// not name a pixel count, so they contribute no dimension.
fn parse_dimension(value: Option<String>) -> Option<u32> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<u32>().ok().filter(|&n| n > 0)
}

impl HtmlFilter for ImageRewriteFilter {
    fn name(&self) -> &'static str {
        "image-compress"
    }

    fn start_element(&mut self, doc: &mut Document, id: ElementId) {
        if doc.get(id).keyword != Keyword::Img {
            return;
        }
        let Some((index, url)) = self.seam.rewritable_url(doc, id, "src") else {
            return;
        };
        let element = doc.get(id);
        let dimensions = ImageDimensions::new(
            parse_dimension(element.attribute_value("width")),
            parse_dimension(element.attribute_value("height")),
        );
        self.seam.attach(
            doc,
            id,
            index,
            RewriteRequest {
                filter: FilterId::ImageCompress,
                inputs: vec![url],
                dimensions,
                context: self.seam.context,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_parsing_rejects_non_pixel_values() {
        assert_eq!(parse_dimension(Some("200".into())), Some(200));
        assert_eq!(parse_dimension(Some(" 64 ".into())), Some(64));
        assert_eq!(parse_dimension(Some("50%".into())), None);
        assert_eq!(parse_dimension(Some("auto".into())), None);
        assert_eq!(parse_dimension(Some("0".into())), None);
        assert_eq!(parse_dimension(None), None);
    }
}
