// crates/html/src/element.rs

//! Elements and attributes.
//!
//! Attribute values keep two representations: the raw escaped bytes exactly
//! as seen in the source, and a lazily computed decoded string. Setting a
//! new decoded value marks the attribute dirty, which forces re-escape on
//! write. Elements additionally keep the raw open-tag bytes so unmutated
//! tags serialize byte-for-byte, whitespace and all.

use smallvec::SmallVec;

use crate::entities::{decode_attribute, escape_attribute};
use crate::name::Keyword;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    None,
    Single,
    Double,
}

impl QuoteStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            QuoteStyle::None => "",
            QuoteStyle::Single => "'",
            QuoteStyle::Double => "\"",
        }
    }
}

/// How an element was (or was not) closed in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseStyle {
    /// `</tag>` present in the source.
    Explicit,
    /// `<tag/>`.
    Brief,
    /// Void element (`<img>`); nothing to serialize for the close.
    Implicit,
    /// Closed to rebalance the tree; not present in the source.
    Auto,
    /// Left open at a point where the stack forced it shut.
    Unclosed,
}

/// Element lifecycle; a filter may only mutate elements that are not yet
/// serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    Pending,
    Open,
    Closed,
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    /// Raw escaped bytes, exactly as in the source; `None` for a valueless
    /// attribute.
    pub raw_value: Option<Vec<u8>>,
    pub quote: QuoteStyle,
    /// Replacement decoded value; present only after mutation.
    decoded_override: Option<String>,
    dirty: bool,
}

impl Attribute {
    pub fn new_escaped(name: String, raw_value: Option<Vec<u8>>, quote: QuoteStyle) -> Self {
        Attribute {
            name,
            raw_value,
            quote,
            decoded_override: None,
            dirty: false,
        }
    }

    /// Decoded value, computed on demand. `None` when the attribute has no
    /// value or its raw form cannot be decoded (the decoding-error case).
    pub fn decoded_value(&self) -> Option<String> {
        if let Some(v) = &self.decoded_override {
            return Some(v.clone());
        }
        decode_attribute(self.raw_value.as_deref()?)
    }

    /// True when the raw form exists but cannot be decoded; such attributes
    /// must be left alone.
    pub fn has_decoding_error(&self) -> bool {
        self.decoded_override.is_none()
            && self
                .raw_value
                .as_deref()
                .is_some_and(|raw| decode_attribute(raw).is_none())
    }

    /// Replace the value with decoded text; re-escaped on write.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.decoded_override = Some(value.into());
        self.dirty = true;
        if self.quote == QuoteStyle::None {
            self.quote = QuoteStyle::Double;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The escaped bytes to serialize.
    pub fn escaped_value(&self) -> Option<Vec<u8>> {
        if self.dirty {
            self.decoded_override
                .as_ref()
                .map(|v| escape_attribute(v).into_bytes())
        } else {
            self.raw_value.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    /// Tag name as written (case preserved).
    pub name: String,
    pub keyword: Keyword,
    pub attributes: SmallVec<[Attribute; 4]>,
    pub state: ElementState,
    pub close_style: CloseStyle,
    /// Exact bytes of the open tag, `<` through `>`.
    pub raw_open: Vec<u8>,
    /// Exact bytes of the close tag when explicitly present.
    pub raw_close: Vec<u8>,
    /// Set when any attribute is added, removed, or rewritten; forces tag
    /// re-synthesis instead of raw replay.
    dirty: bool,
    /// Rewritten-at-most-once bookkeeping, per filter index in the chain.
    rewritten_by: SmallVec<[usize; 2]>,
}

impl Element {
    pub fn new(name: String) -> Self {
        let keyword = Keyword::lookup(&name);
        Element {
            name,
            keyword,
            attributes: SmallVec::new(),
            state: ElementState::Pending,
            close_style: CloseStyle::Implicit,
            raw_open: Vec::new(),
            raw_close: Vec::new(),
            dirty: false,
            rewritten_by: SmallVec::new(),
        }
    }

    pub fn find_attribute(&self, name: &str) -> Option<usize> {
        self.attributes
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn attribute_value(&self, name: &str) -> Option<String> {
        self.attributes
            .get(self.find_attribute(name)?)
            .and_then(|a| a.decoded_value())
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.dirty = true;
        match self.find_attribute(name) {
            Some(i) => self.attributes[i].set_value(value),
            None => {
                let mut attr =
                    Attribute::new_escaped(name.to_string(), None, QuoteStyle::Double);
                attr.set_value(value);
                self.attributes.push(attr);
            }
        }
    }

    pub fn remove_attribute(&mut self, name: &str) {
        if let Some(i) = self.find_attribute(name) {
            self.attributes.remove(i);
            self.dirty = true;
        }
    }

    /// Mark the attribute at `index` rewritten in place.
    pub fn set_attribute_value_at(&mut self, index: usize, value: &str) {
        if let Some(attr) = self.attributes.get_mut(index) {
            attr.set_value(value);
            self.dirty = true;
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty || self.attributes.iter().any(|a| a.is_dirty())
    }

    /// Enforces rewrite-at-most-once per filter: returns false if this
    /// filter already rewrote the element.
    pub fn claim_rewrite(&mut self, filter_index: usize) -> bool {
        if self.rewritten_by.contains(&filter_index) {
            return false;
        }
        self.rewritten_by.push(filter_index);
        true
    }
}
