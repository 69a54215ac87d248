// crates/domain/src/error.rs

//! The shared error taxonomy.
//!
//! Kinds, not type names: every layer maps its failures into these variants
//! so propagation policy can branch on kind alone.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Worth retrying with backoff.
    Transient,
    /// 404/410 and friends; remembered with a long negative TTL.
    Permanent,
    /// Origin not authorized for this URL.
    Unauthorized,
    /// Dropped by the fetcher's load shedding.
    Shed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheErrorKind {
    /// Not an error per se; propagated as a sentinel.
    Miss,
    /// Value present but failed validation or deserialization.
    Corrupt,
    /// Backend reports itself unhealthy; degrade the layer.
    Unhealthy,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("decode error: {0}")]
    Decode(String),

    #[error("fetch error ({kind:?}): {url}")]
    Fetch { kind: FetchErrorKind, url: String },

    #[error("cache error ({kind:?}): {detail}")]
    Cache {
        kind: CacheErrorKind,
        detail: String,
    },

    #[error("policy violation: {0}")]
    Policy(String),

    #[error("rewrite failed: {0}")]
    Rewrite(String),

    #[error("deadline reached with work pending")]
    Timeout,

    #[error("internal invariant violation: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn decode(detail: impl Into<String>) -> Self {
        CoreError::Decode(detail.into())
    }

    pub fn fetch(kind: FetchErrorKind, url: impl Into<String>) -> Self {
        CoreError::Fetch {
            kind,
            url: url.into(),
        }
    }

    pub fn cache(kind: CacheErrorKind, detail: impl Into<String>) -> Self {
        CoreError::Cache {
            kind,
            detail: detail.into(),
        }
    }

    /// True for failures that should be remembered with the long negative TTL.
    pub fn is_permanent_fetch_failure(&self) -> bool {
        matches!(
            self,
            CoreError::Fetch {
                kind: FetchErrorKind::Permanent,
                ..
            }
        )
    }
}
