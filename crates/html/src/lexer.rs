// crates/html/src/lexer.rs

//! Incremental byte-level HTML lexer.
//!
//! Input arrives in arbitrary chunks; the lexer carries its state across
//! `feed` calls and never requires the full document in memory. Every
//! event preserves the exact source bytes (tag raws on the element,
//! literal bytes on the event), so an unmutated stream serializes back to
//! the input byte-for-byte. Malformed markup degrades to literal text
//! rather than erroring.

use bytes::Bytes;
use smallvec::SmallVec;

use crate::document::{Document, ElementId};
use crate::element::{Attribute, CloseStyle, Element, ElementState, QuoteStyle};
use crate::event::HtmlEvent;
use crate::name::Keyword;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    TagOpen,
    TagName,
    CloseTagName,
    BeforeAttr,
    AttrName,
    AfterAttrName,
    BeforeAttrValue,
    AttrValue,
    MarkupDecl,
    Comment,
    IeComment,
    Cdata,
    Directive,
    Literal,
    LiteralClose,
}

fn is_void(kw: Keyword) -> bool {
    use Keyword::*;
    matches!(
        kw,
        Area | Base | Br | Col | Hr | Img | Input | Link | Meta | Param | Wbr
    )
}

/// Tags whose content is opaque until the matching close tag.
fn is_literal(kw: Keyword) -> bool {
    use Keyword::*;
    matches!(kw, Script | Style | Textarea | Iframe | Xmp)
}

/// True when an open `open` element is implicitly terminated by an
/// incoming `next` start tag.
fn closes(open: Keyword, next: Keyword) -> bool {
    use Keyword::*;
    match open {
        P => matches!(
            next,
            Address
                | Article
                | Aside
                | Blockquote
                | Dir
                | Div
                | Dl
                | Fieldset
                | Footer
                | Form
                | H1
                | H2
                | H3
                | H4
                | H5
                | H6
                | Header
                | Hgroup
                | Hr
                | Menu
                | Nav
                | Ol
                | P
                | Pre
                | Section
                | Table
                | Ul
        ),
        Li => next == Li,
        Dd | Dt => matches!(next, Dd | Dt),
        Option => matches!(next, Option | Optgroup),
        Optgroup => next == Optgroup,
        Rp | Rt => matches!(next, Rp | Rt),
        Tr => matches!(next, Tr | Tbody | Tfoot | Thead),
        Td | Th => matches!(next, Td | Th | Tr | Tbody | Tfoot | Thead),
        Thead | Tbody | Tfoot => matches!(next, Tbody | Tfoot | Thead),
        Colgroup => matches!(next, Tr | Td | Th | Tbody | Tfoot | Thead),
        _ => false,
    }
}

/// Containment limits for close-tag matching: a close tag for `kw` may
/// not unwind past any of the returned boundary elements. A stray `</tr>`
/// never closes past its `table`; a stray `</li>` stays inside its list.
fn containment(kw: Keyword) -> &'static [Keyword] {
    use Keyword::*;
    match kw {
        Tr | Td | Th | Thead | Tbody | Tfoot | Colgroup | Col => &[Table],
        Li => &[Ul, Ol, Menu, Dir],
        Dd | Dt => &[Dl],
        _ => &[],
    }
}

pub struct Lexer {
    state: State,
    started: bool,
    /// Pending literal text.
    text: Vec<u8>,
    /// Raw bytes of the construct currently being lexed, `<` included.
    raw: Vec<u8>,
    /// Tag name, close-tag name, or markup-declaration classifier.
    name_buf: Vec<u8>,
    attr_name: Vec<u8>,
    attr_value: Vec<u8>,
    attr_quote: QuoteStyle,
    attrs: SmallVec<[Attribute; 4]>,
    pending_slash: bool,
    stack: Vec<ElementId>,
    /// `</tag` pattern for the current literal element.
    literal_pat: Vec<u8>,
}

impl Default for Lexer {
    fn default() -> Self {
        Lexer::new()
    }
}

impl Lexer {
    pub fn new() -> Self {
        Lexer {
            state: State::Text,
            started: false,
            text: Vec::new(),
            raw: Vec::new(),
            name_buf: Vec::new(),
            attr_name: Vec::new(),
            attr_value: Vec::new(),
            attr_quote: QuoteStyle::None,
            attrs: SmallVec::new(),
            pending_slash: false,
            stack: Vec::new(),
            literal_pat: Vec::new(),
        }
    }

    /// Lex one chunk. Trailing text is flushed so output can stream; a
    /// construct split across chunks is carried to the next call.
    pub fn feed(&mut self, input: &[u8], doc: &mut Document) -> Vec<HtmlEvent> {
        let mut out = Vec::new();
        if !self.started {
            self.started = true;
            out.push(HtmlEvent::StartDocument);
        }
        for &b in input {
            // A byte may be rejected by one state and re-examined by the
            // next (for example a stray `<` falling back to text).
            while !self.step(b, doc, &mut out) {}
        }
        if self.state == State::Text {
            self.flush_text(&mut out);
        }
        out
    }

    /// End of input: resolve any half-lexed construct, close what is still
    /// open, and emit `EndDocument`.
    pub fn finish(&mut self, doc: &mut Document) -> Vec<HtmlEvent> {
        let mut out = Vec::new();
        if !self.started {
            self.started = true;
            out.push(HtmlEvent::StartDocument);
        }
        match self.state {
            State::Text => {}
            State::Comment => {
                self.flush_text(&mut out);
                out.push(HtmlEvent::Comment(Bytes::from(std::mem::take(&mut self.raw))));
            }
            State::IeComment => {
                self.flush_text(&mut out);
                out.push(HtmlEvent::IeDirective(Bytes::from(std::mem::take(
                    &mut self.raw,
                ))));
            }
            State::Cdata => {
                self.flush_text(&mut out);
                out.push(HtmlEvent::Cdata(Bytes::from(std::mem::take(&mut self.raw))));
            }
            State::MarkupDecl | State::Directive => {
                self.flush_text(&mut out);
                out.push(HtmlEvent::Directive(Bytes::from(std::mem::take(
                    &mut self.raw,
                ))));
            }
            State::Literal | State::LiteralClose => {
                // Unterminated literal body; the partial close tag, if any,
                // is literal content too.
                let raw = std::mem::take(&mut self.raw);
                self.text.extend_from_slice(&raw);
            }
            _ => {
                // Truncated tag: degrade to text.
                let raw = std::mem::take(&mut self.raw);
                self.text.extend_from_slice(&raw);
            }
        }
        self.flush_text(&mut out);
        while let Some(id) = self.stack.pop() {
            let el = doc.get_mut(id);
            el.close_style = CloseStyle::Unclosed;
            el.state = ElementState::Closed;
            out.push(HtmlEvent::EndElement(id));
        }
        self.state = State::Text;
        out.push(HtmlEvent::EndDocument);
        out
    }

    // ── state machine ────────────────────────────────────────────────

    /// Process one byte; returns false when the byte must be re-examined
    /// under the new state.
    fn step(&mut self, b: u8, doc: &mut Document, out: &mut Vec<HtmlEvent>) -> bool {
        match self.state {
            State::Text => {
                if b == b'<' {
                    self.raw.clear();
                    self.raw.push(b);
                    self.state = State::TagOpen;
                } else {
                    self.text.push(b);
                }
                true
            }
            State::TagOpen => {
                if b == b'/' {
                    self.raw.push(b);
                    self.name_buf.clear();
                    self.state = State::CloseTagName;
                    true
                } else if b == b'!' {
                    self.raw.push(b);
                    self.name_buf.clear();
                    self.state = State::MarkupDecl;
                    true
                } else if b == b'?' || b.is_ascii_alphabetic() {
                    self.raw.push(b);
                    self.name_buf.clear();
                    self.name_buf.push(b);
                    self.attrs.clear();
                    self.pending_slash = false;
                    self.state = State::TagName;
                    true
                } else {
                    // Not a tag after all; the `<` was literal.
                    self.text.push(b'<');
                    self.state = State::Text;
                    false
                }
            }
            State::TagName => {
                self.raw.push(b);
                match b {
                    b'>' => {
                        self.finish_open_tag(doc, out);
                        true
                    }
                    b'/' => {
                        self.pending_slash = true;
                        self.state = State::BeforeAttr;
                        true
                    }
                    b if b.is_ascii_whitespace() => {
                        self.state = State::BeforeAttr;
                        true
                    }
                    _ => {
                        self.name_buf.push(b);
                        true
                    }
                }
            }
            State::CloseTagName => {
                self.raw.push(b);
                if b == b'>' {
                    self.finish_close_tag(doc, out);
                } else {
                    self.name_buf.push(b);
                }
                true
            }
            State::BeforeAttr => {
                self.raw.push(b);
                match b {
                    b'>' => {
                        self.finish_open_tag(doc, out);
                    }
                    b'/' => {
                        self.pending_slash = true;
                    }
                    b if b.is_ascii_whitespace() => {}
                    _ => {
                        self.pending_slash = false;
                        self.attr_name.clear();
                        self.attr_name.push(b);
                        self.state = State::AttrName;
                    }
                }
                true
            }
            State::AttrName => {
                self.raw.push(b);
                match b {
                    b'>' => {
                        self.commit_attr(None);
                        self.finish_open_tag(doc, out);
                    }
                    b'=' => {
                        self.state = State::BeforeAttrValue;
                    }
                    b'/' => {
                        self.commit_attr(None);
                        self.pending_slash = true;
                        self.state = State::BeforeAttr;
                    }
                    b if b.is_ascii_whitespace() => {
                        self.state = State::AfterAttrName;
                    }
                    _ => self.attr_name.push(b),
                }
                true
            }
            State::AfterAttrName => {
                self.raw.push(b);
                match b {
                    b'>' => {
                        self.commit_attr(None);
                        self.finish_open_tag(doc, out);
                        true
                    }
                    b'=' => {
                        self.state = State::BeforeAttrValue;
                        true
                    }
                    b'/' => {
                        self.commit_attr(None);
                        self.pending_slash = true;
                        self.state = State::BeforeAttr;
                        true
                    }
                    b if b.is_ascii_whitespace() => true,
                    _ => {
                        // New attribute begins; the previous one had no value.
                        self.raw.pop();
                        self.commit_attr(None);
                        self.state = State::BeforeAttr;
                        false
                    }
                }
            }
            State::BeforeAttrValue => {
                self.raw.push(b);
                match b {
                    b'>' => {
                        self.attr_quote = QuoteStyle::None;
                        self.commit_attr(Some(Vec::new()));
                        self.finish_open_tag(doc, out);
                    }
                    b'"' => {
                        self.attr_quote = QuoteStyle::Double;
                        self.attr_value.clear();
                        self.state = State::AttrValue;
                    }
                    b'\'' => {
                        self.attr_quote = QuoteStyle::Single;
                        self.attr_value.clear();
                        self.state = State::AttrValue;
                    }
                    b if b.is_ascii_whitespace() => {}
                    _ => {
                        self.attr_quote = QuoteStyle::None;
                        self.attr_value.clear();
                        self.attr_value.push(b);
                        self.state = State::AttrValue;
                    }
                }
                true
            }
            State::AttrValue => {
                self.raw.push(b);
                match self.attr_quote {
                    QuoteStyle::Double if b == b'"' => {
                        let v = std::mem::take(&mut self.attr_value);
                        self.commit_attr(Some(v));
                        self.state = State::BeforeAttr;
                    }
                    QuoteStyle::Single if b == b'\'' => {
                        let v = std::mem::take(&mut self.attr_value);
                        self.commit_attr(Some(v));
                        self.state = State::BeforeAttr;
                    }
                    QuoteStyle::None if b == b'>' => {
                        let v = std::mem::take(&mut self.attr_value);
                        self.commit_attr(Some(v));
                        self.finish_open_tag(doc, out);
                    }
                    QuoteStyle::None if b.is_ascii_whitespace() => {
                        let v = std::mem::take(&mut self.attr_value);
                        self.commit_attr(Some(v));
                        self.state = State::BeforeAttr;
                    }
                    _ => self.attr_value.push(b),
                }
                true
            }
            State::MarkupDecl => {
                self.raw.push(b);
                self.name_buf.push(b);
                if self.name_buf == b"--" {
                    self.name_buf.clear();
                    self.state = State::Comment;
                } else if self.name_buf == b"[CDATA[" {
                    self.state = State::Cdata;
                } else if b"--".starts_with(&self.name_buf)
                    || b"[CDATA[".starts_with(&self.name_buf)
                {
                    // Still ambiguous.
                } else if b == b'>' {
                    self.flush_text(out);
                    out.push(HtmlEvent::Directive(Bytes::from(std::mem::take(
                        &mut self.raw,
                    ))));
                    self.state = State::Text;
                } else {
                    self.state = State::Directive;
                }
                true
            }
            State::Directive => {
                self.raw.push(b);
                if b == b'>' {
                    self.flush_text(out);
                    out.push(HtmlEvent::Directive(Bytes::from(std::mem::take(
                        &mut self.raw,
                    ))));
                    self.state = State::Text;
                }
                true
            }
            State::Comment => {
                self.raw.push(b);
                // First three body bytes decide whether this is an IE
                // conditional comment opener.
                if self.name_buf.len() < 3 {
                    self.name_buf.push(b);
                    if self.name_buf.len() == 3 && self.name_buf.eq_ignore_ascii_case(b"[if") {
                        self.state = State::IeComment;
                        return true;
                    }
                }
                if self.raw.len() >= 7 && self.raw.ends_with(b"-->") {
                    self.flush_text(out);
                    out.push(HtmlEvent::Comment(Bytes::from(std::mem::take(&mut self.raw))));
                    self.state = State::Text;
                }
                true
            }
            State::IeComment => {
                self.raw.push(b);
                if b == b'>' {
                    self.flush_text(out);
                    out.push(HtmlEvent::IeDirective(Bytes::from(std::mem::take(
                        &mut self.raw,
                    ))));
                    self.state = State::Text;
                }
                true
            }
            State::Cdata => {
                self.raw.push(b);
                if self.raw.ends_with(b"]]>") {
                    self.flush_text(out);
                    out.push(HtmlEvent::Cdata(Bytes::from(std::mem::take(&mut self.raw))));
                    self.state = State::Text;
                }
                true
            }
            State::Literal => {
                self.text.push(b);
                let pat = self.literal_pat.len();
                if self.text.len() >= pat
                    && self.text[self.text.len() - pat..].eq_ignore_ascii_case(&self.literal_pat)
                {
                    // Candidate close tag; keep the source-cased bytes.
                    let split = self.text.len() - pat;
                    self.raw = self.text.split_off(split);
                    self.state = State::LiteralClose;
                }
                true
            }
            State::LiteralClose => {
                if b == b'>' {
                    self.raw.push(b);
                    self.flush_text(out);
                    if let Some(id) = self.stack.pop() {
                        let el = doc.get_mut(id);
                        el.raw_close = std::mem::take(&mut self.raw);
                        el.close_style = CloseStyle::Explicit;
                        el.state = ElementState::Closed;
                        out.push(HtmlEvent::EndElement(id));
                    }
                    self.state = State::Text;
                } else if b.is_ascii_whitespace() || b == b'/' {
                    self.raw.push(b);
                } else {
                    // `</scriptx` or similar: still literal content.
                    let raw = std::mem::take(&mut self.raw);
                    self.text.extend_from_slice(&raw);
                    self.state = State::Literal;
                    return false;
                }
                true
            }
        }
    }

    // ── tag completion ───────────────────────────────────────────────

    fn flush_text(&mut self, out: &mut Vec<HtmlEvent>) {
        if !self.text.is_empty() {
            out.push(HtmlEvent::Characters(Bytes::from(std::mem::take(
                &mut self.text,
            ))));
        }
    }

    fn commit_attr(&mut self, value: Option<Vec<u8>>) {
        let name = String::from_utf8_lossy(&self.attr_name).into_owned();
        let quote = if value.is_some() {
            self.attr_quote
        } else {
            QuoteStyle::None
        };
        self.attrs.push(Attribute::new_escaped(name, value, quote));
        self.attr_name.clear();
        self.attr_quote = QuoteStyle::None;
    }

    fn finish_open_tag(&mut self, doc: &mut Document, out: &mut Vec<HtmlEvent>) {
        self.flush_text(out);
        let name = String::from_utf8_lossy(&self.name_buf).into_owned();
        let mut el = Element::new(name);
        el.attributes = std::mem::take(&mut self.attrs);
        el.raw_open = std::mem::take(&mut self.raw);
        let kw = el.keyword;
        let brief = self.pending_slash;
        self.pending_slash = false;

        // Implicit termination of still-open elements.
        while let Some(&top) = self.stack.last() {
            if closes(doc.get(top).keyword, kw) {
                self.stack.pop();
                let open = doc.get_mut(top);
                open.close_style = CloseStyle::Auto;
                open.state = ElementState::Closed;
                out.push(HtmlEvent::EndElement(top));
            } else {
                break;
            }
        }

        el.state = ElementState::Open;
        let xml_prolog = el.name.starts_with('?');
        let id = doc.insert(el);
        out.push(HtmlEvent::StartElement(id));

        if brief {
            let el = doc.get_mut(id);
            el.close_style = CloseStyle::Brief;
            el.state = ElementState::Closed;
            out.push(HtmlEvent::EndElement(id));
        } else if is_void(kw) || xml_prolog {
            let el = doc.get_mut(id);
            el.close_style = CloseStyle::Implicit;
            el.state = ElementState::Closed;
            out.push(HtmlEvent::EndElement(id));
        } else if is_literal(kw) {
            self.stack.push(id);
            self.literal_pat.clear();
            self.literal_pat.extend_from_slice(b"</");
            self.literal_pat
                .extend_from_slice(doc.get(id).name.to_ascii_lowercase().as_bytes());
            self.state = State::Literal;
            return;
        } else {
            self.stack.push(id);
        }
        self.state = State::Text;
    }

    fn finish_close_tag(&mut self, doc: &mut Document, out: &mut Vec<HtmlEvent>) {
        let name = String::from_utf8_lossy(&self.name_buf).into_owned();
        let name = name.trim();
        let raw = std::mem::take(&mut self.raw);
        self.name_buf.clear();
        self.state = State::Text;

        let boundary = containment(Keyword::lookup(name));
        let mut matched = None;
        for (pos, &id) in self.stack.iter().enumerate().rev() {
            let el = doc.get(id);
            if el.name.eq_ignore_ascii_case(name) {
                matched = Some(pos);
                break;
            }
            if boundary.contains(&el.keyword) {
                // Contained: the match would cross a containment boundary,
                // so this close tag is treated as unmatched.
                break;
            }
        }
        match matched {
            Some(pos) => {
                self.flush_text(out);
                // Everything above the match is implicitly closed.
                while self.stack.len() > pos + 1 {
                    if let Some(id) = self.stack.pop() {
                        let el = doc.get_mut(id);
                        el.close_style = CloseStyle::Auto;
                        el.state = ElementState::Closed;
                        out.push(HtmlEvent::EndElement(id));
                    }
                }
                if let Some(id) = self.stack.pop() {
                    let el = doc.get_mut(id);
                    el.raw_close = raw;
                    el.close_style = CloseStyle::Explicit;
                    el.state = ElementState::Closed;
                    out.push(HtmlEvent::EndElement(id));
                }
            }
            None => {
                // Close tag with no matching open element: re-emit verbatim
                // as literal text.
                self.text.extend_from_slice(&raw);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &[u8]) -> (Document, Vec<HtmlEvent>) {
        let mut doc = Document::new();
        let mut lexer = Lexer::new();
        let mut events = lexer.feed(input, &mut doc);
        events.extend(lexer.finish(&mut doc));
        (doc, events)
    }

    fn start_names(doc: &Document, events: &[HtmlEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                HtmlEvent::StartElement(id) => Some(doc.get(*id).name.clone()),
                _ => None,
            })
            .collect()
    }

    // ── basic tagging ────────────────────────────────────────────────

    #[test]
    fn simple_element_with_attributes() {
        let (doc, events) = lex(b"<img src=\"a.png\" alt='x' loading=lazy>");
        let id = match events[1] {
            HtmlEvent::StartElement(id) => id,
            ref e => panic!("expected start element, got {e:?}"),
        };
        let el = doc.get(id);
        assert_eq!(el.keyword, Keyword::Img);
        assert_eq!(el.attributes.len(), 3);
        assert_eq!(el.attributes[0].quote, QuoteStyle::Double);
        assert_eq!(el.attributes[1].quote, QuoteStyle::Single);
        assert_eq!(el.attributes[2].quote, QuoteStyle::None);
        assert_eq!(el.attribute_value("src").as_deref(), Some("a.png"));
        assert_eq!(el.raw_open, b"<img src=\"a.png\" alt='x' loading=lazy>");
        // img is void
        assert_eq!(el.close_style, CloseStyle::Implicit);
    }

    #[test]
    fn brief_close() {
        let (doc, events) = lex(b"<br/>");
        let id = match events[1] {
            HtmlEvent::StartElement(id) => id,
            ref e => panic!("unexpected {e:?}"),
        };
        assert_eq!(doc.get(id).close_style, CloseStyle::Brief);
    }

    #[test]
    fn explicit_close_keeps_raw() {
        let (doc, events) = lex(b"<A HREF=/x>text</A >");
        let id = match events[1] {
            HtmlEvent::StartElement(id) => id,
            ref e => panic!("unexpected {e:?}"),
        };
        let el = doc.get(id);
        assert_eq!(el.name, "A");
        assert_eq!(el.close_style, CloseStyle::Explicit);
        assert_eq!(el.raw_close, b"</A >");
        assert!(matches!(&events[2], HtmlEvent::Characters(b) if &b[..] == b"text"));
    }

    // ── implicit closes ──────────────────────────────────────────────

    #[test]
    fn li_closes_li() {
        let (doc, events) = lex(b"<ul><li>a<li>b</ul>");
        assert_eq!(start_names(&doc, &events), vec!["ul", "li", "li"]);
        let closes: Vec<CloseStyle> = events
            .iter()
            .filter_map(|e| match e {
                HtmlEvent::EndElement(id) => Some(doc.get(*id).close_style),
                _ => None,
            })
            .collect();
        assert_eq!(
            closes,
            vec![CloseStyle::Auto, CloseStyle::Auto, CloseStyle::Explicit]
        );
    }

    #[test]
    fn p_closed_by_block_element() {
        let (doc, events) = lex(b"<p>one<div>two</div>");
        assert_eq!(start_names(&doc, &events), vec!["p", "div"]);
        let first_end = events
            .iter()
            .find_map(|e| match e {
                HtmlEvent::EndElement(id) => Some(*id),
                _ => None,
            })
            .unwrap();
        assert_eq!(doc.get(first_end).name, "p");
        assert_eq!(doc.get(first_end).close_style, CloseStyle::Auto);
    }

    #[test]
    fn table_close_unwinds_cells() {
        let (doc, events) = lex(b"<table><tr><td>x</table>");
        let ends: Vec<(String, CloseStyle)> = events
            .iter()
            .filter_map(|e| match e {
                HtmlEvent::EndElement(id) => {
                    let el = doc.get(*id);
                    Some((el.name.clone(), el.close_style))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            ends,
            vec![
                ("td".to_string(), CloseStyle::Auto),
                ("tr".to_string(), CloseStyle::Auto),
                ("table".to_string(), CloseStyle::Explicit),
            ]
        );
    }

    // ── misplaced close ──────────────────────────────────────────────

    #[test]
    fn unmatched_close_is_literal() {
        let (_doc, events) = lex(b"a</b>c");
        assert!(matches!(&events[1], HtmlEvent::Characters(b) if &b[..] == b"a</b>c"));
    }

    #[test]
    fn stray_tr_close_never_crosses_its_table() {
        let (doc, events) = lex(b"<tr><table></tr>x");
        // The close tag is contained by the inner table: it matches
        // nothing and lands in the text stream instead.
        let text: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                HtmlEvent::Characters(b) => Some(b.to_vec()),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(text, b"</tr>x");
        for e in &events {
            if let HtmlEvent::EndElement(id) = e {
                // Both elements run to end-of-input; neither is popped by
                // the stray close.
                assert_eq!(doc.get(*id).close_style, CloseStyle::Unclosed);
            }
        }
    }

    #[test]
    fn td_close_inside_its_table_still_matches() {
        let (doc, events) = lex(b"<table><tr><td>x</td>");
        let closed = events
            .iter()
            .find_map(|e| match e {
                HtmlEvent::EndElement(id) => Some(*id),
                _ => None,
            })
            .unwrap();
        assert_eq!(doc.get(closed).name, "td");
        assert_eq!(doc.get(closed).close_style, CloseStyle::Explicit);
    }

    // ── literal elements ─────────────────────────────────────────────

    #[test]
    fn script_body_is_opaque() {
        let (doc, events) = lex(b"<script>if (a < b) { x(\"<p>\"); }</script>");
        assert_eq!(start_names(&doc, &events), vec!["script"]);
        assert!(matches!(
            &events[2],
            HtmlEvent::Characters(b) if &b[..] == b"if (a < b) { x(\"<p>\"); }"
        ));
    }

    #[test]
    fn script_false_close_stays_literal() {
        let (_doc, events) = lex(b"<script>var s = \"</scripty\";</script>");
        assert!(matches!(
            &events[2],
            HtmlEvent::Characters(b) if &b[..] == b"var s = \"</scripty\";"
        ));
    }

    // ── comments, directives, cdata ──────────────────────────────────

    #[test]
    fn comment_and_doctype() {
        let (_doc, events) = lex(b"<!DOCTYPE html><!-- note -->");
        assert!(matches!(&events[1], HtmlEvent::Directive(b) if &b[..] == b"<!DOCTYPE html>"));
        assert!(matches!(&events[2], HtmlEvent::Comment(b) if &b[..] == b"<!-- note -->"));
    }

    #[test]
    fn ie_conditional_comment() {
        let (_doc, events) = lex(b"<!--[if IE]><p>old</p><![endif]-->");
        assert!(matches!(&events[1], HtmlEvent::IeDirective(b) if &b[..] == b"<!--[if IE]>"));
        // Inner HTML lexes normally; the endif is a directive.
        assert!(events
            .iter()
            .any(|e| matches!(e, HtmlEvent::Directive(b) if &b[..] == b"<![endif]-->")));
    }

    #[test]
    fn cdata_block() {
        let (_doc, events) = lex(b"<![CDATA[x < y]]>");
        assert!(matches!(&events[1], HtmlEvent::Cdata(b) if &b[..] == b"<![CDATA[x < y]]>"));
    }

    // ── incremental feeding ──────────────────────────────────────────

    #[test]
    fn tag_split_across_chunks() {
        let mut doc = Document::new();
        let mut lexer = Lexer::new();
        let mut events = lexer.feed(b"<im", &mut doc);
        events.extend(lexer.feed(b"g src=\"a", &mut doc));
        events.extend(lexer.feed(b".png\">", &mut doc));
        events.extend(lexer.finish(&mut doc));
        let id = events
            .iter()
            .find_map(|e| match e {
                HtmlEvent::StartElement(id) => Some(*id),
                _ => None,
            })
            .unwrap();
        assert_eq!(doc.get(id).attribute_value("src").as_deref(), Some("a.png"));
        assert_eq!(doc.get(id).raw_open, b"<img src=\"a.png\">");
    }

    #[test]
    fn truncated_tag_degrades_to_text() {
        let (_doc, events) = lex(b"before <a href=");
        let text: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                HtmlEvent::Characters(b) => Some(b.to_vec()),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(text, b"before <a href=");
    }

    #[test]
    fn unclosed_elements_closed_at_end() {
        let (doc, events) = lex(b"<div><span>x");
        let ends: Vec<String> = events
            .iter()
            .filter_map(|e| match e {
                HtmlEvent::EndElement(id) => Some(doc.get(*id).name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(ends, vec!["span", "div"]);
        for e in &events {
            if let HtmlEvent::EndElement(id) = e {
                assert_eq!(doc.get(*id).close_style, CloseStyle::Unclosed);
            }
        }
    }

    #[test]
    fn stray_lt_is_literal() {
        let (_doc, events) = lex(b"a < b");
        assert!(matches!(&events[1], HtmlEvent::Characters(b) if &b[..] == b"a < b"));
    }
}
