// crates/html/src/lib.rs

//! Streaming HTML lexer, event model, and filter chain.
//!
//! The lexer consumes raw bytes and produces typed events over an arena of
//! elements. If no filter mutates the document, serializing the event stream
//! reproduces the input byte-for-byte. Filters may mutate attributes, inject
//! elements, and attach pending rewrite slots that are resolved against a
//! request deadline before serialization.

pub mod canonicalize;
pub mod chain;
pub mod document;
pub mod element;
pub mod entities;
pub mod event;
pub mod filter;
pub mod lexer;
pub mod name;
pub mod serializer;

pub use canonicalize::CanonicalizeAttributes;
pub use chain::FilterChain;
pub use document::{Document, ElementId};
pub use element::{Attribute, CloseStyle, Element, QuoteStyle};
pub use event::HtmlEvent;
pub use filter::{HtmlFilter, PendingRewrite, PendingSlot, ScriptUsage, SlotOutcome};
pub use lexer::Lexer;
pub use name::Keyword;
pub use serializer::{serialize, Serializer};
