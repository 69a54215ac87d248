// crates/domain/src/context.rs

//! The client context vector: request properties that influence which
//! rewritten variant a client should receive.
//!
//! Context does not appear in rewritten URLs; instead it is folded into the
//! metadata-cache key so that URLs stay identical across clients while cache
//! hits remain client-aware. The key fragments here must stay stable: they
//! are part of the persisted cache key format.

use serde::{Deserialize, Serialize};

use crate::options::RewriteOptions;

/// Degree of WebP support advertised by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WebpLevel {
    #[default]
    None,
    /// Lossy WebP only.
    LossyOnly,
    /// Lossy + lossless + alpha.
    LossyLosslessAlpha,
    /// Animated WebP as well.
    Animated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientContext {
    pub webp: WebpLevel,
    pub mobile_user_agent: bool,
    pub save_data: bool,
    pub small_screen: bool,
    /// Set when the request arrived through another proxy (`Via` header);
    /// drives the vary-on-auto policy.
    pub has_via_header: bool,
}

impl ClientContext {
    /// Cache-key fragment for this context.
    ///
    /// WebP levels map to `.` (none), `w`, `v`, `a`; mobile appends `m`.
    /// Save-Data quality takes precedence over small-screen quality, so only
    /// one of `d` / `ss` is emitted, and only when the corresponding quality
    /// tier is actually configured.
    pub fn cache_key(&self, options: &RewriteOptions) -> String {
        let mut key = String::new();
        key.push_str(match self.webp {
            WebpLevel::None => ".",
            WebpLevel::LossyOnly => "w",
            WebpLevel::LossyLosslessAlpha => "v",
            WebpLevel::Animated => "a",
        });
        if self.mobile_user_agent {
            key.push('m');
        }
        if self.save_data && options.has_save_data_quality() {
            key.push('d');
        } else if self.small_screen && options.has_small_screen_quality() {
            key.push_str("ss");
        }
        key
    }

    /// Vary policy: may the output vary on User-Agent?
    pub fn allow_vary_on_user_agent(&self, options: &RewriteOptions) -> bool {
        options.allow_vary_on_user_agent
            || (options.allow_vary_on_auto && !self.has_via_header)
    }

    /// Vary policy: may the output vary on Accept?
    pub fn allow_vary_on_accept(&self, options: &RewriteOptions) -> bool {
        options.allow_vary_on_accept || (options.allow_vary_on_auto && self.has_via_header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiered_options() -> RewriteOptions {
        RewriteOptions {
            image_small_screen_quality: 50,
            image_save_data_quality: 40,
            ..RewriteOptions::default()
        }
    }

    #[test]
    fn webp_levels_have_distinct_fragments() {
        let opts = RewriteOptions::default();
        let mut ctx = ClientContext::default();
        let none = ctx.cache_key(&opts);
        ctx.webp = WebpLevel::LossyOnly;
        let lossy = ctx.cache_key(&opts);
        ctx.webp = WebpLevel::LossyLosslessAlpha;
        let alpha = ctx.cache_key(&opts);
        ctx.webp = WebpLevel::Animated;
        let animated = ctx.cache_key(&opts);
        let keys = [none, lossy, alpha, animated];
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn save_data_takes_precedence_over_small_screen() {
        let opts = tiered_options();
        let ctx = ClientContext {
            save_data: true,
            small_screen: true,
            ..ClientContext::default()
        };
        assert_eq!(ctx.cache_key(&opts), ".d");
    }

    #[test]
    fn quality_keys_require_configured_tiers() {
        // Without distinct tier qualities the context bits are inert.
        let opts = RewriteOptions::default();
        let ctx = ClientContext {
            save_data: true,
            small_screen: true,
            ..ClientContext::default()
        };
        assert_eq!(ctx.cache_key(&opts), ".");
    }

    #[test]
    fn vary_on_auto_splits_on_via_header() {
        let opts = RewriteOptions::default(); // allow_vary_on_auto = true
        let direct = ClientContext::default();
        assert!(direct.allow_vary_on_user_agent(&opts));
        assert!(!direct.allow_vary_on_accept(&opts));

        let proxied = ClientContext {
            has_via_header: true,
            ..ClientContext::default()
        };
        assert!(!proxied.allow_vary_on_user_agent(&opts));
        assert!(proxied.allow_vary_on_accept(&opts));
    }
}
