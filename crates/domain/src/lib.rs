// crates/domain/src/lib.rs

//! Value types shared by the optimization core: the content-type table, the
//! options model and its signature, the client context vector, the resource
//! model, and the error taxonomy.
//!
//! Nothing in this crate performs I/O; everything here is cheap to clone,
//! deterministic, and safe to hash into cache keys.

pub mod content_type;
pub mod context;
pub mod error;
pub mod hash;
pub mod options;
pub mod resource;
pub mod status;

pub use content_type::{ContentCategory, ContentType};
pub use context::ClientContext;
pub use error::{CacheErrorKind, CoreError, FetchErrorKind};
pub use options::{FilterId, RewriteLevel, RewriteOptions};
pub use resource::Resource;
