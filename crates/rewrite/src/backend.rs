// crates/rewrite/src/backend.rs

//! The filter-specific rewrite seam.
//!
//! Real codecs and minifiers live outside the core; the engine only needs
//! a backend that accepts input resources and either produces optimized
//! bytes or declines. Cache extension is the one backend implemented
//! here, since it is pure renaming.

use async_trait::async_trait;
use bytes::Bytes;

use domain::{ClientContext, ContentType, CoreError, FilterId, Resource, RewriteOptions};

use crate::encoder::ImageDimensions;

/// Everything a backend may condition its output on.
#[derive(Debug, Clone)]
pub struct RewriteJob {
    pub options: std::sync::Arc<RewriteOptions>,
    pub context: ClientContext,
    pub dimensions: Option<ImageDimensions>,
}

#[derive(Debug, Clone)]
pub enum BackendOutput {
    Optimized {
        bytes: Bytes,
        content_type: ContentType,
    },
    /// The input is fine as-is; record the decision and leave the
    /// original reference in place.
    Passthrough,
}

#[async_trait]
pub trait RewriteBackend: Send + Sync {
    fn id(&self) -> FilterId;

    /// Input content types this backend will attempt.
    fn accepts(&self, content_type: Option<ContentType>) -> bool;

    async fn rewrite(
        &self,
        inputs: &[Resource],
        job: &RewriteJob,
    ) -> Result<BackendOutput, CoreError>;
}

/// Cache extension: the bytes pass through untouched; the win is the
/// content-hashed name with a far-future TTL.
pub struct CacheExtendBackend;

#[async_trait]
impl RewriteBackend for CacheExtendBackend {
    fn id(&self) -> FilterId {
        FilterId::CacheExtend
    }

    fn accepts(&self, content_type: Option<ContentType>) -> bool {
        // Anything with a known type can be renamed.
        content_type.is_some()
    }

    async fn rewrite(
        &self,
        inputs: &[Resource],
        _job: &RewriteJob,
    ) -> Result<BackendOutput, CoreError> {
        let input = inputs
            .first()
            .ok_or_else(|| CoreError::Internal("cache extend with no input".into()))?;
        let content_type = input
            .content_type
            .ok_or_else(|| CoreError::Rewrite("cache extend needs a content type".into()))?;
        Ok(BackendOutput::Optimized {
            bytes: input.bytes.clone(),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn cache_extend_is_identity_on_bytes() {
        let mut input = Resource::new(
            "http://e.com/a.css",
            Bytes::from_static(b"body{}"),
            Duration::seconds(300),
        );
        input.content_type = Some(ContentType::Css);
        let job = RewriteJob {
            options: std::sync::Arc::new(RewriteOptions::default()),
            context: ClientContext::default(),
            dimensions: None,
        };
        let out = CacheExtendBackend
            .rewrite(std::slice::from_ref(&input), &job)
            .await
            .unwrap();
        match out {
            BackendOutput::Optimized {
                bytes,
                content_type,
            } => {
                assert_eq!(&bytes[..], b"body{}");
                assert_eq!(content_type, ContentType::Css);
            }
            BackendOutput::Passthrough => panic!("expected optimized output"),
        }
    }
}
