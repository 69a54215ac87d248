// crates/edge/src/serve.rs

//! Serving rewritten resource URLs.
//!
//! The router recognizes a rewritten URL by its leaf shape alone: a known
//! two-character filter tag followed by at least three dot-separated
//! parts. Everything needed to rebuild the resource is in the name, so a
//! cold cache reconstructs instead of returning 404.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::debug;

use domain::FilterId;
use rewrite::RewriteEngine;

use crate::error::EdgeError;

/// Cheap shape test, suitable for the hot path of a URL router.
pub fn is_rewritten_url(url: &str) -> bool {
    let leaf = url.rsplit('/').next().unwrap_or(url);
    let mut parts = leaf.split('.');
    let tagged = parts.next().and_then(FilterId::from_str).is_some();
    tagged && leaf.matches('.').count() >= 3
}

/// Serve a rewritten resource, reconstructing it when the output cache has
/// no entry. Undecodable names and failed reconstructions are a 404, not
/// an error page; the origin still has the original bytes.
pub async fn serve_rewritten(
    engine: &Arc<RewriteEngine>,
    url: &str,
) -> Result<http::Response<Bytes>, EdgeError> {
    if !is_rewritten_url(url) {
        return Err(EdgeError::NotFound(url.to_string()));
    }
    let entry = match engine.serve_rewritten(url).await {
        Ok(entry) => entry,
        Err(err) => {
            debug!(url, %err, "rewritten resource not servable");
            return Err(EdgeError::NotFound(url.to_string()));
        }
    };

    let ttl = (entry.expires_at - Utc::now()).num_seconds().max(0);
    let mut builder = http::Response::builder().status(entry.status);
    for (name, value) in &entry.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    let response = builder
        .header("cache-control", format!("public, max-age={ttl}"))
        .body(entry.body)?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_shape_test() {
        assert!(is_rewritten_url(
            "http://e.com/ic.ABCDEFG.200x100x,hexample,c,_foo,j.webp"
        ));
        assert!(is_rewritten_url("ce.HASH.,hexample,c,_a,s.css"));
        assert!(!is_rewritten_url("http://e.com/foo.jpg"));
        // Unknown tag.
        assert!(!is_rewritten_url("http://e.com/zz.HASH.name.css"));
        // Too few parts.
        assert!(!is_rewritten_url("http://e.com/ic.HASH.css"));
    }
}
