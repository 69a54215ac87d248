// crates/domain/src/options.rs

//! The options model: an immutable value object fixed at request start.
//!
//! Only *rewriting-affecting* fields participate in [`RewriteOptions::signature`];
//! operational fields (log verbosity, stats cohort) are excluded so that
//! unrelated config changes never shift cache fingerprints.

use serde::{Deserialize, Serialize};

use crate::hash::short_hash;

/// Two-character filter tags as they appear in rewritten URLs.
///
/// The URL router recognizes rewritten resources by this component being in
/// the fixed set below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterId {
    /// Image compression / recompression.
    #[serde(rename = "ic")]
    ImageCompress,
    /// CSS rewriting (minify + subresource rewriting).
    #[serde(rename = "cf")]
    CssFilter,
    /// JavaScript minification.
    #[serde(rename = "jm")]
    JsMinify,
    /// Cache extension: content-hashed rename without semantic change.
    #[serde(rename = "ce")]
    CacheExtend,
    /// CSS combining (multi-input).
    #[serde(rename = "cc")]
    CssCombine,
}

impl FilterId {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterId::ImageCompress => "ic",
            FilterId::CssFilter => "cf",
            FilterId::JsMinify => "jm",
            FilterId::CacheExtend => "ce",
            FilterId::CssCombine => "cc",
        }
    }

    pub fn from_str(s: &str) -> Option<FilterId> {
        match s {
            "ic" => Some(FilterId::ImageCompress),
            "cf" => Some(FilterId::CssFilter),
            "jm" => Some(FilterId::JsMinify),
            "ce" => Some(FilterId::CacheExtend),
            "cc" => Some(FilterId::CssCombine),
            _ => None,
        }
    }

    /// All recognized ids, in canonical chain order.
    pub const ALL: [FilterId; 5] = [
        FilterId::ImageCompress,
        FilterId::CssFilter,
        FilterId::JsMinify,
        FilterId::CacheExtend,
        FilterId::CssCombine,
    ];
}

/// Baseline filter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteLevel {
    /// No filters unless explicitly enabled.
    Passthrough,
    /// The standard set: image compression, CSS and JS rewriting,
    /// cache extension.
    CoreFilters,
    /// Core plus combining filters.
    AllFilters,
}

impl RewriteLevel {
    fn baseline(self) -> &'static [FilterId] {
        match self {
            RewriteLevel::Passthrough => &[],
            RewriteLevel::CoreFilters => &[
                FilterId::ImageCompress,
                FilterId::CssFilter,
                FilterId::JsMinify,
                FilterId::CacheExtend,
            ],
            RewriteLevel::AllFilters => &FilterId::ALL,
        }
    }
}

/// Immutable per-request options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteOptions {
    pub rewrite_level: RewriteLevel,
    /// Filters force-enabled on top of the level baseline.
    pub enable_filters: Vec<FilterId>,
    /// Filters force-disabled; wins over `enable_filters`.
    pub disable_filters: Vec<FilterId>,

    /// Baseline JPEG/WebP quality, 1..=100.
    pub image_recompress_quality: u8,
    /// Quality applied on small screens; 0 disables the tier.
    pub image_small_screen_quality: u8,
    /// Quality applied when the client requests `Save-Data`; 0 disables.
    pub image_save_data_quality: u8,

    /// Upper bound for data-URI inlining.
    pub inline_max_bytes: usize,
    /// Inputs larger than this bypass rewriting entirely.
    pub max_rewrite_bytes: usize,
    /// Size cap for cached inputs.
    pub max_cacheable_response_content_length: usize,

    pub allow_vary_on_user_agent: bool,
    pub allow_vary_on_accept: bool,
    pub allow_vary_on_auto: bool,

    /// Origins the core is allowed to rewrite (scheme+host[:port]).
    pub origin_authorization: Vec<String>,

    /// Request-scoped rewrite deadline.
    pub fetch_deadline_ms: u64,
    /// Maximum concurrent expensive rewrites (work bound).
    pub max_concurrent_rewrites: usize,
    /// Transient fetch failures are retried up to this many times.
    pub fetch_retry_attempts: u32,
    /// A no-cache input may still be rewritten once when set.
    pub reuse_no_cache_once: bool,

    /// Output TTL cap in seconds; never raises an input's own TTL.
    pub max_cache_ttl_secs: u64,
    /// Negative metadata TTL after a permanent fetch failure.
    pub negative_ttl_permanent_secs: u64,
    /// Negative metadata TTL after transient/validation failures.
    pub negative_ttl_transient_secs: u64,

    // Operational fields: excluded from the signature.
    pub log_verbosity: u8,
    pub stats_cohort: String,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        RewriteOptions {
            rewrite_level: RewriteLevel::CoreFilters,
            enable_filters: Vec::new(),
            disable_filters: Vec::new(),
            image_recompress_quality: 85,
            image_small_screen_quality: 0,
            image_save_data_quality: 0,
            inline_max_bytes: 2048,
            max_rewrite_bytes: 4 * 1024 * 1024,
            max_cacheable_response_content_length: 16 * 1024 * 1024,
            allow_vary_on_user_agent: false,
            allow_vary_on_accept: false,
            allow_vary_on_auto: true,
            origin_authorization: Vec::new(),
            fetch_deadline_ms: 100,
            max_concurrent_rewrites: 8,
            fetch_retry_attempts: 2,
            reuse_no_cache_once: false,
            max_cache_ttl_secs: 365 * 24 * 3600,
            negative_ttl_permanent_secs: 300,
            negative_ttl_transient_secs: 30,
            log_verbosity: 0,
            stats_cohort: String::new(),
        }
    }
}

impl RewriteOptions {
    /// The active filter set in deterministic chain order: the level
    /// baseline, plus `enable_filters`, minus `disable_filters`.
    pub fn active_filters(&self) -> Vec<FilterId> {
        FilterId::ALL
            .iter()
            .copied()
            .filter(|id| {
                if self.disable_filters.contains(id) {
                    return false;
                }
                self.rewrite_level.baseline().contains(id) || self.enable_filters.contains(id)
            })
            .collect()
    }

    pub fn is_enabled(&self, id: FilterId) -> bool {
        self.active_filters().contains(&id)
    }

    /// Whether a tier quality distinct from the baseline is configured.
    pub fn has_small_screen_quality(&self) -> bool {
        self.image_small_screen_quality != 0
            && self.image_small_screen_quality != self.image_recompress_quality
    }

    pub fn has_save_data_quality(&self) -> bool {
        self.image_save_data_quality != 0
            && self.image_save_data_quality != self.image_recompress_quality
    }

    /// True if `origin` (scheme+host[:port]) may be rewritten.
    pub fn is_origin_authorized(&self, origin: &str) -> bool {
        self.origin_authorization
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(origin))
    }

    /// Deterministic signature over rewriting-affecting fields only.
    ///
    /// Recomputed per request and compared for equality; must be stable
    /// across processes as long as these fields are unchanged.
    pub fn signature(&self) -> String {
        let mut buf = String::new();
        for id in self.active_filters() {
            buf.push_str(id.as_str());
            buf.push(',');
        }
        buf.push_str(&format!(
            "q{};sq{};dq{};in{};mr{};mc{};v{}{}{};ttl{};np{};nt{};nc{};",
            self.image_recompress_quality,
            self.image_small_screen_quality,
            self.image_save_data_quality,
            self.inline_max_bytes,
            self.max_rewrite_bytes,
            self.max_cacheable_response_content_length,
            self.allow_vary_on_user_agent as u8,
            self.allow_vary_on_accept as u8,
            self.allow_vary_on_auto as u8,
            self.max_cache_ttl_secs,
            self.negative_ttl_permanent_secs,
            self.negative_ttl_transient_secs,
            self.reuse_no_cache_once as u8,
        ));
        for origin in &self.origin_authorization {
            buf.push_str(origin);
            buf.push(';');
        }
        short_hash(buf.as_bytes(), 12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_baseline_and_overrides_compose() {
        let mut opts = RewriteOptions::default();
        assert!(opts.is_enabled(FilterId::ImageCompress));
        assert!(!opts.is_enabled(FilterId::CssCombine));

        opts.enable_filters.push(FilterId::CssCombine);
        assert!(opts.is_enabled(FilterId::CssCombine));

        // Disable wins over enable.
        opts.disable_filters.push(FilterId::CssCombine);
        assert!(!opts.is_enabled(FilterId::CssCombine));
    }

    #[test]
    fn active_filter_order_is_canonical() {
        let mut opts = RewriteOptions::default();
        opts.enable_filters = vec![FilterId::CssCombine, FilterId::ImageCompress];
        let active = opts.active_filters();
        let mut sorted = active.clone();
        sorted.sort();
        assert_eq!(active, sorted);
    }

    #[test]
    fn signature_ignores_operational_fields() {
        let base = RewriteOptions::default();
        let mut noisy = base.clone();
        noisy.log_verbosity = 3;
        noisy.stats_cohort = "b".into();
        assert_eq!(base.signature(), noisy.signature());
    }

    #[test]
    fn signature_tracks_filter_set_and_quality() {
        let base = RewriteOptions::default();

        let mut disabled = base.clone();
        disabled.disable_filters.push(FilterId::JsMinify);
        assert_ne!(base.signature(), disabled.signature());

        let mut quality = base.clone();
        quality.image_recompress_quality = 70;
        assert_ne!(base.signature(), quality.signature());
    }

    #[test]
    fn origin_authorization_is_case_insensitive() {
        let mut opts = RewriteOptions::default();
        opts.origin_authorization.push("http://example.com".into());
        assert!(opts.is_origin_authorized("http://EXAMPLE.com"));
        assert!(!opts.is_origin_authorized("http://evil.com"));
    }
}
