// crates/domain/src/status.rs

//! Private sentinel status codes stored in the input cache to remember
//! failure modes. These live in a reserved range and must never escape to
//! a client.

/// Base of the reserved private range.
pub const PRIVATE_STATUS_BASE: u16 = 10000;

/// A fetch of this URL failed; do not retry until the entry expires.
pub const REMEMBER_FETCH_FAILED: u16 = 10001;

/// The response was not cacheable (non-200 or cache-control forbids).
pub const REMEMBER_NOT_CACHEABLE: u16 = 10002;

/// The response was a 200 but cache-control forbids caching; distinguished
/// so policy can optionally rewrite it once anyway.
pub const REMEMBER_NOT_CACHEABLE_200: u16 = 10003;

pub fn is_private_status(code: u16) -> bool {
    code >= PRIVATE_STATUS_BASE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_private() {
        assert!(is_private_status(REMEMBER_FETCH_FAILED));
        assert!(is_private_status(REMEMBER_NOT_CACHEABLE));
        assert!(is_private_status(REMEMBER_NOT_CACHEABLE_200));
        assert!(!is_private_status(200));
        assert!(!is_private_status(404));
    }
}
