// crates/html/src/filter.rs

//! Filter trait and pending rewrite slots.
//!
//! Filters are synchronous: they observe the event stream in order and
//! mutate elements in the arena. Work that depends on fetched resources is
//! not done inline; the filter registers a [`PendingSlot`] whose resolver
//! runs asynchronously, and the caller applies each outcome before the
//! element serializes or the request deadline expires, whichever is first.

use async_trait::async_trait;

use crate::document::{Document, ElementId};

/// Whether a filter injects or depends on inline script, which constrains
/// where in the chain it may run relative to script-sensitive filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptUsage {
    Never,
    MayInject,
    Always,
}

/// Result of resolving a pending rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    /// Replace the slot's attribute value with this URL.
    Rewritten(String),
    /// Leave the original reference untouched.
    Unchanged,
}

/// Asynchronous completion of a rewrite initiated during filtering.
///
/// Implementations must be safe to abandon: if the deadline expires before
/// `resolve` completes, the caller drops the future and serializes the
/// original bytes while the rewrite finishes in the background.
#[async_trait]
pub trait PendingRewrite: Send + Sync {
    async fn resolve(&self) -> SlotOutcome;
}

/// A deferred attribute rewrite attached to an element.
pub struct PendingSlot {
    pub element: ElementId,
    pub attribute_index: usize,
    pub rewrite: std::sync::Arc<dyn PendingRewrite>,
}

impl std::fmt::Debug for PendingSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingSlot")
            .field("element", &self.element)
            .field("attribute_index", &self.attribute_index)
            .finish()
    }
}

/// Event hooks for one stage of the filter chain.
///
/// Default implementations ignore the event, so a filter overrides only
/// what it observes.
pub trait HtmlFilter: Send {
    fn name(&self) -> &'static str;

    fn script_usage(&self) -> ScriptUsage {
        ScriptUsage::Never
    }

    fn start_document(&mut self) {}

    fn end_document(&mut self, _doc: &mut Document) {}

    fn start_element(&mut self, _doc: &mut Document, _id: ElementId) {}

    fn end_element(&mut self, _doc: &mut Document, _id: ElementId) {}

    fn characters(&mut self, _text: &[u8]) {}

    fn comment(&mut self, _raw: &[u8]) {}

    fn cdata(&mut self, _raw: &[u8]) {}

    fn ie_directive(&mut self, _raw: &[u8]) {}

    fn directive(&mut self, _raw: &[u8]) {}

    /// Called when the stream is flushed mid-document; filters holding
    /// buffered state must release anything past the flush point.
    fn flush(&mut self, _doc: &mut Document) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use std::sync::Arc;

    struct FixedRewrite(Option<String>);

    #[async_trait]
    impl PendingRewrite for FixedRewrite {
        async fn resolve(&self) -> SlotOutcome {
            match &self.0 {
                Some(url) => SlotOutcome::Rewritten(url.clone()),
                None => SlotOutcome::Unchanged,
            }
        }
    }

    #[tokio::test]
    async fn slot_outcome_applies_to_attribute() {
        let mut doc = Document::new();
        let mut el = Element::new("img".into());
        el.set_attribute("src", "a.png");
        let id = doc.insert(el);
        let index = doc.get(id).find_attribute("src").unwrap();
        doc.add_slot(PendingSlot {
            element: id,
            attribute_index: index,
            rewrite: Arc::new(FixedRewrite(Some("a.pagespeed.ic.H.png".into()))),
        });

        for slot in doc.take_slots() {
            if let SlotOutcome::Rewritten(url) = slot.rewrite.resolve().await {
                doc.get_mut(slot.element)
                    .set_attribute_value_at(slot.attribute_index, &url);
            }
        }
        assert_eq!(
            doc.get(id).attribute_value("src").as_deref(),
            Some("a.pagespeed.ic.H.png")
        );
    }
}
