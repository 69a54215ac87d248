// crates/edge/src/lib.rs

//! Host integration surface: settings loading, telemetry setup, client
//! context derivation, the per-request HTML rewriting session, and the
//! rewritten-resource serving path.

pub mod context;
pub mod error;
pub mod rewriter;
pub mod serve;
pub mod settings;
pub mod telemetry;

pub use context::client_context;
pub use error::EdgeError;
pub use rewriter::{EmitFn, HtmlRewriter};
pub use serve::{is_rewritten_url, serve_rewritten};
