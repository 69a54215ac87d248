// crates/html/src/chain.rs

//! Filter chain dispatch.
//!
//! Filters run in registration order and each sees the effects of the
//! filters before it, since they share the element arena.

use tracing::trace;

use crate::document::Document;
use crate::event::HtmlEvent;
use crate::filter::HtmlFilter;

#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn HtmlFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        FilterChain::default()
    }

    pub fn add(&mut self, filter: Box<dyn HtmlFilter>) {
        trace!(filter = filter.name(), "registered html filter");
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Dispatch a batch of events to every filter, in order.
    pub fn apply(&mut self, doc: &mut Document, events: &[HtmlEvent]) {
        for event in events {
            for filter in &mut self.filters {
                match event {
                    HtmlEvent::StartDocument => filter.start_document(),
                    HtmlEvent::EndDocument => filter.end_document(doc),
                    HtmlEvent::StartElement(id) => filter.start_element(doc, *id),
                    HtmlEvent::EndElement(id) => filter.end_element(doc, *id),
                    HtmlEvent::Characters(b) => filter.characters(b),
                    HtmlEvent::Comment(b) => filter.comment(b),
                    HtmlEvent::Cdata(b) => filter.cdata(b),
                    HtmlEvent::IeDirective(b) => filter.ie_directive(b),
                    HtmlEvent::Directive(b) => filter.directive(b),
                }
            }
        }
    }

    /// Propagate a mid-document flush point.
    pub fn flush(&mut self, doc: &mut Document) {
        for filter in &mut self.filters {
            filter.flush(doc);
        }
    }
}
