// crates/edge/src/rewriter.rs

//! Per-request HTML rewriting session.
//!
//! The host hands over the origin's response headers, then body chunks as
//! they arrive; output leaves through the `emit` sink the host supplied.
//! Events with no rewrite pending are serialized and emitted as soon as
//! they retire, so clean markup streams ahead of the first rewritable
//! element. `finish` resolves the held-back slots against the request
//! deadline and flushes the rest. A slot that misses the deadline keeps
//! its original reference while the rewrite completes in the background,
//! so the next request finds warm caches.

use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderMap, CONTENT_TYPE};
use tracing::debug;

use domain::ContentType;
use html::{Document, ElementId, FilterChain, HtmlEvent, Lexer, Serializer, SlotOutcome};
use rewrite::filters::build_chain;
use rewrite::{RewriteEngine, RewriteStats};

use crate::context::client_context;

/// Sink for rewritten output bytes.
pub type EmitFn = Box<dyn FnMut(&[u8]) + Send>;

pub struct HtmlRewriter {
    chain: FilterChain,
    lexer: Lexer,
    doc: Document,
    events: Vec<HtmlEvent>,
    /// Events already serialized into the sink.
    emitted: usize,
    serializer: Serializer,
    emit: EmitFn,
    deadline: tokio::time::Instant,
    stats: Arc<RewriteStats>,
    /// Cleared when the response headers name a non-HTML payload; the
    /// session then passes bytes through untouched.
    html: bool,
}

impl HtmlRewriter {
    pub fn new(
        engine: &Arc<RewriteEngine>,
        document_url: &str,
        request_headers: &HeaderMap,
        emit: EmitFn,
    ) -> Self {
        let context = client_context(request_headers);
        let (chain, _base) = build_chain(engine, context, document_url);
        let deadline = tokio::time::Instant::now()
            + Duration::from_millis(engine.options().fetch_deadline_ms);
        HtmlRewriter {
            chain,
            lexer: Lexer::new(),
            doc: Document::new(),
            events: Vec::new(),
            emitted: 0,
            serializer: Serializer::new(),
            emit,
            deadline,
            stats: Arc::clone(engine.stats()),
            html: true,
        }
    }

    /// Hand over the origin's response headers before any body bytes. A
    /// declared non-HTML content type turns the session into a plain
    /// pass-through.
    pub fn feed_response_headers(&mut self, response_headers: &HeaderMap) {
        if let Some(mime) = response_headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            self.html = ContentType::from_mime(mime).is_some_and(|t| t.is_html_like());
            if !self.html {
                debug!(mime, "non-HTML response, passing body through");
            }
        }
    }

    /// Feed one chunk of the response body.
    pub fn feed_response_body(&mut self, input: &[u8]) {
        if !self.html {
            (self.emit)(input);
            return;
        }
        let events = self.lexer.feed(input, &mut self.doc);
        self.chain.apply(&mut self.doc, &events);
        self.events.extend(events);
        self.flush_ready();
    }

    /// Flush the lexer, resolve pending slots against the deadline, and
    /// emit whatever was held back.
    pub async fn finish(mut self) {
        if !self.html {
            return;
        }
        let tail = self.lexer.finish(&mut self.doc);
        self.chain.apply(&mut self.doc, &tail);
        self.events.extend(tail);
        self.chain.flush(&mut self.doc);

        let slots = self.doc.take_slots();
        for slot in slots {
            match tokio::time::timeout_at(self.deadline, slot.rewrite.resolve()).await {
                Ok(SlotOutcome::Rewritten(url)) => {
                    self.doc
                        .get_mut(slot.element)
                        .set_attribute_value_at(slot.attribute_index, &url);
                }
                Ok(SlotOutcome::Unchanged) => {}
                Err(_) => {
                    // Deadline expired; the original reference serializes
                    // and the rewrite keeps going in the background.
                    RewriteStats::bump(&self.stats.deadline_expiries);
                    debug!(element = ?slot.element, "slot missed the request deadline");
                }
            }
        }
        self.flush_ready();
        debug_assert_eq!(self.emitted, self.events.len());
    }

    /// Serialize and emit retired events up to the first element still
    /// holding a pending slot. Everything behind a held element stays
    /// buffered so output order is preserved.
    fn flush_ready(&mut self) {
        let held: Vec<ElementId> = self.doc.slots().iter().map(|s| s.element).collect();
        while self.emitted < self.events.len() {
            if let HtmlEvent::StartElement(id) = &self.events[self.emitted] {
                if held.contains(id) {
                    break;
                }
            }
            self.serializer
                .write_event(&self.doc, &self.events[self.emitted]);
            self.emitted += 1;
        }
        let bytes = self.serializer.take();
        if !bytes.is_empty() {
            (self.emit)(&bytes);
        }
    }
}
