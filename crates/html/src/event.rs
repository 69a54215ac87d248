// crates/html/src/event.rs

//! The typed event stream.
//!
//! Literal events (characters, comments, directives) carry their exact
//! source bytes; element events carry arena handles. Serializing an
//! unmutated stream replays those bytes unchanged.

use bytes::Bytes;

use crate::document::ElementId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlEvent {
    StartDocument,
    EndDocument,
    StartElement(ElementId),
    EndElement(ElementId),
    /// Text between tags, including whitespace, verbatim.
    Characters(Bytes),
    /// `<!-- ... -->`, full raw bytes.
    Comment(Bytes),
    /// `<![CDATA[ ... ]]>`, full raw bytes.
    Cdata(Bytes),
    /// IE conditional comment (`<!--[if IE]>` ... `<![endif]-->`),
    /// passed through opaque.
    IeDirective(Bytes),
    /// `<!DOCTYPE ...>` and other `<!` declarations, full raw bytes.
    Directive(Bytes),
}

impl HtmlEvent {
    /// Raw byte length as it will appear on the wire, for literal events.
    pub fn literal_len(&self) -> usize {
        match self {
            HtmlEvent::Characters(b)
            | HtmlEvent::Comment(b)
            | HtmlEvent::Cdata(b)
            | HtmlEvent::IeDirective(b)
            | HtmlEvent::Directive(b) => b.len(),
            _ => 0,
        }
    }
}
