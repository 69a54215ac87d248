// crates/html/src/canonicalize.rs

//! Attribute canonicalization filter.
//!
//! Re-escapes every decodable attribute value, so sloppy source escaping
//! (a bare `&` in a query string, an unterminated `&amp`) comes out in
//! canonical form. Attributes whose raw value cannot be decoded are left
//! byte-for-byte alone.

use crate::document::{Document, ElementId};
use crate::entities::{decode_attribute, escape_attribute};
use crate::filter::HtmlFilter;

#[derive(Default)]
pub struct CanonicalizeAttributes;

impl CanonicalizeAttributes {
    pub fn new() -> Self {
        CanonicalizeAttributes
    }
}

impl HtmlFilter for CanonicalizeAttributes {
    fn name(&self) -> &'static str {
        "canonicalize-attributes"
    }

    fn start_element(&mut self, doc: &mut Document, id: ElementId) {
        let el = doc.get_mut(id);
        let mut touched = false;
        for attr in el.attributes.iter_mut() {
            let Some(raw) = attr.raw_value.as_deref() else {
                continue;
            };
            let Some(decoded) = decode_attribute(raw) else {
                // Must-leave-alone.
                continue;
            };
            let canonical = escape_attribute(&decoded);
            if canonical.as_bytes() != raw {
                attr.set_value(decoded);
                touched = true;
            }
        }
        if touched {
            el.mark_dirty();
        }
    }
}
