// crates/html/src/document.rs

//! Element arena.
//!
//! Events refer to elements by [`ElementId`] into a per-document arena, so
//! the open-element stack, filters, and pending rewrite slots can all hold
//! handles without sharing mutable references.

use crate::element::Element;
use crate::filter::PendingSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub(crate) u32);

impl ElementId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
pub struct Document {
    elements: Vec<Element>,
    slots: Vec<PendingSlot>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    pub fn insert(&mut self, element: Element) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        self.elements.push(element);
        id
    }

    pub fn get(&self, id: ElementId) -> &Element {
        &self.elements[id.index()]
    }

    pub fn get_mut(&mut self, id: ElementId) -> &mut Element {
        &mut self.elements[id.index()]
    }

    /// Register a pending rewrite slot; resolved against the request
    /// deadline before serialization.
    pub fn add_slot(&mut self, slot: PendingSlot) {
        self.slots.push(slot);
    }

    pub fn slots(&self) -> &[PendingSlot] {
        &self.slots
    }

    /// Drain the registered slots for resolution.
    pub fn take_slots(&mut self) -> Vec<PendingSlot> {
        std::mem::take(&mut self.slots)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_handles_are_stable() {
        let mut doc = Document::new();
        let a = doc.insert(Element::new("img".into()));
        let b = doc.insert(Element::new("a".into()));
        assert_ne!(a, b);
        assert_eq!(doc.get(a).name, "img");
        doc.get_mut(b).set_attribute("href", "/x");
        assert_eq!(doc.get(b).attribute_value("href").as_deref(), Some("/x"));
    }
}
