// crates/rewrite/src/lib.rs

//! Resource rewriting core: URL escaping and naming, the layered cache
//! stack, cache-aware fetching, the metadata decision cache, and the
//! single-flight rewrite engine that HTML filters feed.
//!
//! The crate is self-describing on the wire: every output URL it mints can
//! be decoded back to the rewrite that produced it, so a cold process can
//! serve a rewritten URL with no side database.

pub mod backend;
pub mod cache;
pub mod encoder;
pub mod engine;
pub mod escape;
pub mod fetch;
pub mod filters;
pub mod http_cache;
pub mod lease;
pub mod metadata;
pub mod namer;
pub mod stats;
pub mod work_bound;

pub use backend::{BackendOutput, CacheExtendBackend, RewriteBackend, RewriteJob};
pub use cache::{Cache, CacheResult, CacheState, CacheStore, KeyedResult};
pub use encoder::{
    CssCapability, CssUrlEncoder, DecodedImageUrl, ImageDimensions, ImageUrlEncoder,
    MultipartEncoder,
};
pub use engine::{Outcome, RewriteEngine, RewriteHandle, RewriteRequest, RewriteState};
pub use escape::{decode_segment, encode_segment};
pub use fetch::{CachingFetcher, FetchedResponse, UrlFetcher};
pub use filters::{build_chain, BaseUrl};
pub use http_cache::{HttpCache, HttpCacheEntry};
pub use metadata::{metadata_key, Decision, MetadataCache, MetadataEntry};
pub use namer::ResourceName;
pub use stats::RewriteStats;
pub use work_bound::WorkBound;
