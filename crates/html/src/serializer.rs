// crates/html/src/serializer.rs

//! Event stream serialization.
//!
//! Untouched elements replay their recorded raw bytes, so a lex/serialize
//! pass with no mutation is the identity on the input. A dirty element is
//! re-synthesized from its name and attributes, with mutated values
//! re-escaped canonically.

use bytes::{Bytes, BytesMut};

use crate::document::Document;
use crate::element::{CloseStyle, Element};
use crate::event::HtmlEvent;

#[derive(Default)]
pub struct Serializer {
    buf: BytesMut,
}

impl Serializer {
    pub fn new() -> Self {
        Serializer::default()
    }

    pub fn write_event(&mut self, doc: &Document, event: &HtmlEvent) {
        match event {
            HtmlEvent::StartDocument | HtmlEvent::EndDocument => {}
            HtmlEvent::Characters(b)
            | HtmlEvent::Comment(b)
            | HtmlEvent::Cdata(b)
            | HtmlEvent::IeDirective(b)
            | HtmlEvent::Directive(b) => self.buf.extend_from_slice(b),
            HtmlEvent::StartElement(id) => self.write_open(doc.get(*id)),
            HtmlEvent::EndElement(id) => self.write_close(doc.get(*id)),
        }
    }

    /// Take everything serialized so far; the serializer stays usable, so
    /// the caller can flush incrementally.
    pub fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    fn write_open(&mut self, el: &Element) {
        if !el.is_dirty() && !el.raw_open.is_empty() {
            self.buf.extend_from_slice(&el.raw_open);
            return;
        }
        self.buf.extend_from_slice(b"<");
        self.buf.extend_from_slice(el.name.as_bytes());
        for attr in &el.attributes {
            self.buf.extend_from_slice(b" ");
            self.buf.extend_from_slice(attr.name.as_bytes());
            if let Some(value) = attr.escaped_value() {
                self.buf.extend_from_slice(b"=");
                self.buf.extend_from_slice(attr.quote.as_str().as_bytes());
                self.buf.extend_from_slice(&value);
                self.buf.extend_from_slice(attr.quote.as_str().as_bytes());
            }
        }
        if el.close_style == CloseStyle::Brief {
            self.buf.extend_from_slice(b"/>");
        } else {
            self.buf.extend_from_slice(b">");
        }
    }

    fn write_close(&mut self, el: &Element) {
        match el.close_style {
            CloseStyle::Explicit => {
                if el.raw_close.is_empty() {
                    // Injected element; no source bytes to replay.
                    self.buf.extend_from_slice(b"</");
                    self.buf.extend_from_slice(el.name.as_bytes());
                    self.buf.extend_from_slice(b">");
                } else {
                    self.buf.extend_from_slice(&el.raw_close);
                }
            }
            // Brief closes live in the open tag; the rest were never in
            // the source.
            CloseStyle::Brief
            | CloseStyle::Implicit
            | CloseStyle::Auto
            | CloseStyle::Unclosed => {}
        }
    }
}

/// One-shot serialization of a full event stream.
pub fn serialize(doc: &Document, events: &[HtmlEvent]) -> Vec<u8> {
    let mut ser = Serializer::new();
    for event in events {
        ser.write_event(doc, event);
    }
    ser.take().to_vec()
}
