// crates/rewrite/src/engine.rs

//! The rewrite context state machine and the engine that drives it.
//!
//! One `start` call drives one rewrite attempt from "these N URLs with
//! these options" to a final outcome, exploiting cache at every layer:
//! input cache on fetch, metadata cache for prior decisions, output cache
//! for the produced bytes, and a process-wide single-flight lease so the
//! expensive step runs at most once per fingerprint.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use domain::hash::{short_hash, NAME_HASH_CHARS};
use domain::{ClientContext, CoreError, FilterId, Resource, RewriteOptions};

use html::{PendingRewrite, SlotOutcome};

use crate::backend::{BackendOutput, RewriteBackend, RewriteJob};
use crate::encoder::{CssUrlEncoder, ImageDimensions, ImageUrlEncoder, MultipartEncoder};
use crate::escape::{decode_segment, encode_segment};
use crate::fetch::CachingFetcher;
use crate::http_cache::{HttpCache, HttpCacheEntry};
use crate::lease::{LeaseOutcome, LeaseTable};
use crate::metadata::{metadata_key, Decision, MetadataCache, MetadataEntry};
use crate::namer::ResourceName;
use crate::stats::RewriteStats;
use crate::work_bound::WorkBound;

/// Lifecycle of one rewrite attempt; transitions are forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RewriteState {
    Constructed,
    InputsRequested,
    InputsReady,
    MetadataConsulted,
    RewriteAttempted,
    Finalized,
}

fn transition(state: &mut RewriteState, next: RewriteState, key: &str) {
    debug_assert!(*state < next, "rewrite state must move forward");
    debug!(?next, key, "rewrite state");
    *state = next;
}

/// Final disposition of a rewrite as observed by a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Substitute this URL.
    Rewritten(String),
    /// Leave the original.
    Passthrough,
    /// Not finalized yet (deadline observation only; the pipeline keeps
    /// going in the background).
    NotReady,
}

/// What a filter asks the engine to do.
#[derive(Debug, Clone)]
pub struct RewriteRequest {
    pub filter: FilterId,
    pub inputs: Vec<String>,
    pub dimensions: Option<ImageDimensions>,
    pub context: ClientContext,
}

/// Completion handle; cloneable, deadline-aware, and detachable (dropping
/// it never stops the underlying attempt).
#[derive(Clone)]
pub struct RewriteHandle {
    rx: watch::Receiver<Outcome>,
}

impl RewriteHandle {
    /// Wait for finalization without a deadline.
    pub async fn outcome(&self) -> Outcome {
        let mut rx = self.rx.clone();
        let outcome = match rx.wait_for(|o| *o != Outcome::NotReady).await {
            Ok(value) => value.clone(),
            // The task died before finalizing; worst case is the origin's
            // own bytes.
            Err(_) => Outcome::Passthrough,
        };
        outcome
    }

    /// Wait until `deadline`; `NotReady` when it passes first.
    pub async fn outcome_by(&self, deadline: tokio::time::Instant) -> Outcome {
        match tokio::time::timeout_at(deadline, self.outcome()).await {
            Ok(outcome) => outcome,
            Err(_) => Outcome::NotReady,
        }
    }

    pub fn peek(&self) -> Outcome {
        self.rx.borrow().clone()
    }
}

#[async_trait]
impl PendingRewrite for RewriteHandle {
    async fn resolve(&self) -> SlotOutcome {
        match self.outcome().await {
            Outcome::Rewritten(url) => SlotOutcome::Rewritten(url),
            _ => SlotOutcome::Unchanged,
        }
    }
}

pub struct RewriteEngine {
    options: Arc<RewriteOptions>,
    fetcher: Arc<CachingFetcher>,
    metadata: Arc<MetadataCache>,
    outputs: Arc<HttpCache>,
    leases: LeaseTable,
    work_bound: WorkBound,
    backends: HashMap<FilterId, Arc<dyn RewriteBackend>>,
    stats: Arc<RewriteStats>,
    /// Bound on one backend invocation; exceeding it blacklists the
    /// fingerprint for the permanent negative TTL.
    rewrite_timeout: StdDuration,
}

impl RewriteEngine {
    pub fn new(
        options: Arc<RewriteOptions>,
        fetcher: Arc<CachingFetcher>,
        metadata: Arc<MetadataCache>,
        outputs: Arc<HttpCache>,
        stats: Arc<RewriteStats>,
    ) -> Self {
        let work_bound = WorkBound::new(options.max_concurrent_rewrites);
        RewriteEngine {
            options,
            fetcher,
            metadata,
            outputs,
            leases: LeaseTable::new(),
            work_bound,
            backends: HashMap::new(),
            stats,
            rewrite_timeout: StdDuration::from_secs(30),
        }
    }

    pub fn register_backend(&mut self, backend: Arc<dyn RewriteBackend>) {
        self.backends.insert(backend.id(), backend);
    }

    pub fn stats(&self) -> &Arc<RewriteStats> {
        &self.stats
    }

    pub fn options(&self) -> &Arc<RewriteOptions> {
        &self.options
    }

    /// Enqueue a rewrite; returns immediately. The attempt runs to
    /// completion in the background even if every handle is dropped, so
    /// later requests hit warm caches.
    pub fn start(self: &Arc<Self>, request: RewriteRequest) -> RewriteHandle {
        let (tx, rx) = watch::channel(Outcome::NotReady);
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = engine.run(request).await;
            let _ = tx.send(outcome);
        });
        RewriteHandle { rx }
    }

    /// Serve a rewritten URL from the output cache, reconstructing the
    /// resource from the URL alone on a cold cache.
    pub async fn serve_rewritten(
        self: &Arc<Self>,
        url: &str,
    ) -> Result<HttpCacheEntry, CoreError> {
        if let Some(entry) = self.outputs.get(url).await {
            return Ok(entry);
        }
        let leaf = url.rsplit('/').next().unwrap_or(url);
        let request = self.request_from_leaf(leaf)?;
        let handle = self.start(request);
        match handle.outcome().await {
            Outcome::Rewritten(out_url) => self
                .outputs
                .get(&out_url)
                .await
                .ok_or_else(|| CoreError::Rewrite("output cache write did not stick".into())),
            _ => Err(CoreError::Rewrite(format!(
                "could not reconstruct {url} from its name"
            ))),
        }
    }

    /// Decode a leaf back into the rewrite that produced it.
    fn request_from_leaf(&self, leaf: &str) -> Result<RewriteRequest, CoreError> {
        let name = ResourceName::decode(leaf)?;
        let (inputs, dimensions) = match name.id {
            FilterId::ImageCompress => {
                let decoded = ImageUrlEncoder::decode(&name.name)?;
                (vec![decoded.url], decoded.dimensions)
            }
            FilterId::CssFilter => {
                let (url, _capability) = CssUrlEncoder::decode(&name.name)?;
                (vec![url], None)
            }
            FilterId::CssCombine => (MultipartEncoder::decode(&name.name)?, None),
            FilterId::JsMinify | FilterId::CacheExtend => {
                (vec![decode_segment(&name.name)?], None)
            }
        };
        Ok(RewriteRequest {
            filter: name.id,
            inputs,
            dimensions,
            context: ClientContext::default(),
        })
    }

    // ── the state machine ────────────────────────────────────────────

    async fn run(&self, request: RewriteRequest) -> Outcome {
        RewriteStats::bump(&self.stats.rewrites_started);
        let mut state = RewriteState::Constructed;

        let Some(backend) = self.backends.get(&request.filter) else {
            error!(filter = request.filter.as_str(), "no backend registered");
            RewriteStats::bump(&self.stats.invariant_violations);
            return self.passthrough();
        };
        if request.inputs.is_empty() {
            RewriteStats::bump(&self.stats.invariant_violations);
            return self.passthrough();
        }
        let key = metadata_key(request.filter, &request.inputs, &self.options, &request.context);

        if !self.metadata.is_healthy() {
            RewriteStats::bump(&self.stats.cache_unhealthy);
            warn!(key, "metadata cache unhealthy, serving passthrough");
            return self.passthrough();
        }

        // Fetch all inputs through the input cache.
        transition(&mut state, RewriteState::InputsRequested, &key);
        let mut inputs = Vec::with_capacity(request.inputs.len());
        for url in &request.inputs {
            match self.fetcher.fetch_resource(url).await {
                Ok(resource) => inputs.push(resource),
                Err(err) => {
                    debug!(url, %err, "input fetch failed");
                    let ttl = if err.is_permanent_fetch_failure() {
                        self.options.negative_ttl_permanent_secs
                    } else {
                        self.options.negative_ttl_transient_secs
                    };
                    self.record_negative(&key, Decision::NotYetRewritable, ttl).await;
                    return self.passthrough();
                }
            }
        }
        transition(&mut state, RewriteState::InputsReady, &key);
        let hashes: Vec<&str> = inputs.iter().map(|r| r.hash.as_str()).collect();

        // Prior decision?
        transition(&mut state, RewriteState::MetadataConsulted, &key);
        if let Some(outcome) = self.consult(&key, &hashes, &request).await {
            RewriteStats::bump(&self.stats.metadata_hits);
            transition(&mut state, RewriteState::Finalized, &key);
            return outcome;
        }
        RewriteStats::bump(&self.stats.metadata_misses);

        // Single-flight gate.
        let _lease = match self.leases.try_acquire(&key) {
            LeaseOutcome::Acquired(lease) => lease,
            LeaseOutcome::Busy(waiter) => {
                debug!(key, "attached as single-flight waiter");
                waiter.released().await;
                // The holder wrote its decision before releasing.
                return match self.consult(&key, &hashes, &request).await {
                    Some(outcome) => {
                        RewriteStats::bump(&self.stats.metadata_hits);
                        outcome
                    }
                    None => self.passthrough(),
                };
            }
        };

        // Validate inputs against policy before spending work.
        if let Some(reason) = self.validate(&inputs, backend.as_ref()) {
            debug!(key, reason, "inputs failed validation");
            self.record_negative(
                &key,
                Decision::PassthroughOk,
                self.options.negative_ttl_transient_secs,
            )
            .await;
            return self.passthrough();
        }

        // Admission control on the expensive step.
        let Some(_permit) = self.work_bound.try_acquire() else {
            RewriteStats::bump(&self.stats.work_bound_rejections);
            debug!(key, "work bound reached, passthrough without negative entry");
            return self.passthrough();
        };

        transition(&mut state, RewriteState::RewriteAttempted, &key);
        let job = RewriteJob {
            options: Arc::clone(&self.options),
            context: request.context,
            dimensions: request.dimensions,
        };
        let result =
            tokio::time::timeout(self.rewrite_timeout, backend.rewrite(&inputs, &job)).await;

        let outcome = match result {
            Ok(Ok(BackendOutput::Optimized {
                bytes,
                content_type,
            })) => {
                let ttl = self.output_ttl(&inputs);
                let hash = short_hash(&bytes, NAME_HASH_CHARS);
                let leaf = ResourceName::new(
                    request.filter,
                    hash.clone(),
                    self.encode_name(&request),
                    content_type.extension().to_string(),
                )
                .encode();
                let output_url = output_url(&request.inputs[0], &leaf);

                let entry = HttpCacheEntry {
                    status: 200,
                    headers: vec![("content-type".into(), content_type.mime().to_string())],
                    body: bytes,
                    expires_at: Utc::now() + ttl,
                    no_cache: false,
                    fetched_under_load_shed: false,
                };
                // A failed write still returns the computed URL for this
                // request; a later request recomputes.
                self.outputs.put(&output_url, &entry).await;
                self.metadata
                    .put(
                        &key,
                        &MetadataEntry {
                            decision: Decision::Rewritten,
                            output_leaf: Some(leaf),
                            input_hashes: hashes.iter().map(|h| h.to_string()).collect(),
                            expires_unix: (Utc::now() + ttl).timestamp(),
                        },
                    )
                    .await;
                RewriteStats::bump(&self.stats.rewrites_completed);
                info!(key, url = %output_url, "rewrite finalized");
                Outcome::Rewritten(output_url)
            }
            Ok(Ok(BackendOutput::Passthrough)) => {
                let ttl = self.output_ttl(&inputs);
                self.metadata
                    .put(
                        &key,
                        &MetadataEntry {
                            decision: Decision::PassthroughOk,
                            output_leaf: None,
                            input_hashes: hashes.iter().map(|h| h.to_string()).collect(),
                            expires_unix: (Utc::now() + ttl).timestamp(),
                        },
                    )
                    .await;
                self.passthrough()
            }
            Ok(Err(err)) => {
                warn!(key, %err, "rewrite backend failed, blacklisting fingerprint");
                self.record_negative(
                    &key,
                    Decision::Forbidden,
                    self.options.negative_ttl_permanent_secs,
                )
                .await;
                self.passthrough()
            }
            Err(_) => {
                warn!(key, "rewrite backend timed out, blacklisting fingerprint");
                self.record_negative(
                    &key,
                    Decision::Forbidden,
                    self.options.negative_ttl_permanent_secs,
                )
                .await;
                self.passthrough()
            }
        };
        transition(&mut state, RewriteState::Finalized, &key);
        // The lease guard drops here, after the metadata write, so woken
        // waiters always observe the decision.
        outcome
    }

    fn passthrough(&self) -> Outcome {
        self.stats.passthroughs.fetch_add(1, Ordering::Relaxed);
        Outcome::Passthrough
    }

    /// Re-validate a metadata entry against the current inputs.
    async fn consult(
        &self,
        key: &str,
        hashes: &[&str],
        request: &RewriteRequest,
    ) -> Option<Outcome> {
        let entry = self.metadata.get(key).await?;
        match entry.decision {
            Decision::Rewritten => {
                if !entry.inputs_match(hashes) {
                    // Inputs changed since the rewrite; demote to miss.
                    return None;
                }
                let leaf = entry.output_leaf?;
                Some(Outcome::Rewritten(output_url(&request.inputs[0], &leaf)))
            }
            // Negative decisions hold until expiry regardless of hashes.
            Decision::PassthroughOk | Decision::NotYetRewritable | Decision::Forbidden => {
                Some(Outcome::Passthrough)
            }
        }
    }

    fn validate(&self, inputs: &[Resource], backend: &dyn RewriteBackend) -> Option<String> {
        for input in inputs {
            if !input.authoritative {
                return Some(format!("{} origin not authorized", input.url));
            }
            if !backend.accepts(input.content_type) {
                return Some(format!("{} content type not accepted", input.url));
            }
            if input.bytes.len() > self.options.max_rewrite_bytes {
                return Some(format!("{} exceeds the rewrite size bound", input.url));
            }
        }
        None
    }

    async fn record_negative(&self, key: &str, decision: Decision, ttl_secs: u64) {
        self.metadata
            .put(
                key,
                &MetadataEntry {
                    decision,
                    output_leaf: None,
                    input_hashes: Vec::new(),
                    expires_unix: (Utc::now() + Duration::seconds(ttl_secs as i64)).timestamp(),
                },
            )
            .await;
    }

    /// Output TTL: minimum input TTL, capped, never raised.
    fn output_ttl(&self, inputs: &[Resource]) -> Duration {
        let now = Utc::now();
        let shortest = inputs
            .iter()
            .map(|r| r.ttl(now))
            .min()
            .unwrap_or_else(Duration::zero);
        shortest.min(Duration::seconds(self.options.max_cache_ttl_secs as i64))
    }

    fn encode_name(&self, request: &RewriteRequest) -> String {
        match request.filter {
            FilterId::ImageCompress => {
                ImageUrlEncoder::encode(&request.inputs[0], request.dimensions)
            }
            FilterId::CssFilter => CssUrlEncoder::encode(&request.inputs[0]),
            FilterId::CssCombine => MultipartEncoder::encode(&request.inputs),
            FilterId::JsMinify | FilterId::CacheExtend => encode_segment(&request.inputs[0]),
        }
    }
}

/// Place the leaf next to the first input.
fn output_url(first_input: &str, leaf: &str) -> String {
    match first_input.rfind('/') {
        Some(pos) if pos >= first_input.find("://").map_or(0, |s| s + 3) => {
            format!("{}{}", &first_input[..=pos], leaf)
        }
        _ => leaf.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CacheExtendBackend;
    use crate::cache::{Cache, LockedCache, LruStore};
    use crate::fetch::{FetchedResponse, UrlFetcher};
    use bytes::Bytes;
    use domain::ContentType;
    use std::sync::atomic::AtomicU32;

    struct StaticFetcher {
        calls: AtomicU32,
    }

    #[async_trait]
    impl UrlFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<FetchedResponse, CoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchedResponse {
                status: 200,
                headers: vec![("content-type".into(), "image/jpeg".into())],
                body: Bytes::from_static(b"jpegjpegjpeg"),
                ttl: Duration::seconds(600),
                no_cache: false,
                under_load_shed: false,
            })
        }
    }

    struct SlowBackend {
        delay: StdDuration,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl RewriteBackend for SlowBackend {
        fn id(&self) -> FilterId {
            FilterId::ImageCompress
        }

        fn accepts(&self, content_type: Option<ContentType>) -> bool {
            matches!(content_type, Some(ct) if ct.is_image())
        }

        async fn rewrite(
            &self,
            _inputs: &[Resource],
            _job: &RewriteJob,
        ) -> Result<BackendOutput, CoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(BackendOutput::Optimized {
                bytes: Bytes::from_static(b"webp"),
                content_type: ContentType::Webp,
            })
        }
    }

    fn engine_with_backend(delay: StdDuration, calls: Arc<AtomicU32>) -> Arc<RewriteEngine> {
        let mut options = RewriteOptions::default();
        options.origin_authorization.push("http://e.com".into());
        let options = Arc::new(options);

        let backend_store: Arc<dyn Cache> = Arc::new(LockedCache::new(LruStore::new(256)));
        let input_cache = Arc::new(HttpCache::new(Arc::clone(&backend_store)));
        let outputs = Arc::new(HttpCache::new(Arc::clone(&backend_store)));
        let metadata = Arc::new(MetadataCache::new(backend_store));
        let fetcher = Arc::new(CachingFetcher::new(
            input_cache,
            Arc::new(StaticFetcher {
                calls: AtomicU32::new(0),
            }),
            Arc::clone(&options),
        ));
        let mut engine = RewriteEngine::new(
            options,
            fetcher,
            metadata,
            outputs,
            Arc::new(RewriteStats::default()),
        );
        engine.register_backend(Arc::new(SlowBackend { delay, calls }));
        engine.register_backend(Arc::new(CacheExtendBackend));
        Arc::new(engine)
    }

    fn image_request() -> RewriteRequest {
        RewriteRequest {
            filter: FilterId::ImageCompress,
            inputs: vec!["http://e.com/foo.jpg".into()],
            dimensions: None,
            context: ClientContext::default(),
        }
    }

    #[tokio::test]
    async fn rewrite_produces_a_decodable_output_url() {
        let calls = Arc::new(AtomicU32::new(0));
        let engine = engine_with_backend(StdDuration::from_millis(0), Arc::clone(&calls));
        let outcome = engine.start(image_request()).outcome().await;
        let Outcome::Rewritten(url) = outcome else {
            panic!("expected a rewritten url, got {outcome:?}");
        };
        assert!(url.starts_with("http://e.com/ic."));
        assert!(url.ends_with(".webp"));
        let leaf = url.rsplit('/').next().unwrap();
        let name = ResourceName::decode(leaf).unwrap();
        let decoded = ImageUrlEncoder::decode(&name.name).unwrap();
        assert_eq!(decoded.url, "http://e.com/foo.jpg");
    }

    #[tokio::test]
    async fn single_flight_invokes_backend_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let engine = engine_with_backend(StdDuration::from_millis(20), Arc::clone(&calls));

        let a = engine.start(image_request());
        let b = engine.start(image_request());
        let (ra, rb) = tokio::join!(a.outcome(), b.outcome());
        assert_eq!(ra, rb);
        assert!(matches!(ra, Outcome::Rewritten(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deadline_leaves_original_then_warms_cache() {
        let calls = Arc::new(AtomicU32::new(0));
        let engine = engine_with_backend(StdDuration::from_millis(100), Arc::clone(&calls));

        let handle = engine.start(image_request());
        let deadline = tokio::time::Instant::now() + StdDuration::from_millis(10);
        assert_eq!(handle.outcome_by(deadline).await, Outcome::NotReady);

        // Background completion still lands in the caches.
        let warm = handle.outcome().await;
        assert!(matches!(warm, Outcome::Rewritten(_)));

        // A later identical request hits metadata without a second
        // backend call.
        let again = engine.start(image_request()).outcome().await;
        assert_eq!(again, warm);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unauthorized_origin_is_passthrough() {
        let calls = Arc::new(AtomicU32::new(0));
        let engine = engine_with_backend(StdDuration::from_millis(0), Arc::clone(&calls));
        let request = RewriteRequest {
            inputs: vec!["http://other.com/foo.jpg".into()],
            ..image_request()
        };
        assert_eq!(engine.start(request).outcome().await, Outcome::Passthrough);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn served_from_output_cache_by_url_alone() {
        let calls = Arc::new(AtomicU32::new(0));
        let engine = engine_with_backend(StdDuration::from_millis(0), Arc::clone(&calls));
        let Outcome::Rewritten(url) = engine.start(image_request()).outcome().await else {
            panic!("expected rewrite");
        };
        let entry = engine.serve_rewritten(&url).await.unwrap();
        assert_eq!(&entry.body[..], b"webp");
        assert_eq!(entry.header("content-type"), Some("image/webp"));
    }

    #[test]
    fn output_url_sits_next_to_the_input() {
        assert_eq!(
            output_url("http://e.com/a/b/foo.jpg", "ic.H.N.webp"),
            "http://e.com/a/b/ic.H.N.webp"
        );
        assert_eq!(output_url("http://e.com", "ic.H.N.webp"), "ic.H.N.webp");
    }
}
