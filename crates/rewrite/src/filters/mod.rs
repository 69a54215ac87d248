// crates/rewrite/src/filters/mod.rs

//! HTML filters that mint rewrite requests.
//!
//! Each filter watches the event stream for the elements it owns, resolves
//! the referenced URL against the document base, claims the element, and
//! attaches a pending slot backed by an engine handle. The slot resolves
//! asynchronously; the element keeps its original reference until the
//! outcome is applied.

mod cache_extend;
mod css;
mod image;
mod js;

pub use cache_extend::CacheExtendFilter;
pub use css::CssRewriteFilter;
pub use image::ImageRewriteFilter;
pub use js::JsRewriteFilter;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use domain::resource::origin_of;
use domain::{ClientContext, FilterId};
use html::{
    CanonicalizeAttributes, Document, ElementId, FilterChain, HtmlFilter, Keyword, PendingSlot,
};

use crate::engine::{RewriteEngine, RewriteHandle, RewriteRequest};

/// Document base for resolving relative references, shared by every filter
/// in one chain and updated when a `<base href>` is seen.
pub struct BaseUrl {
    inner: Mutex<String>,
}

impl BaseUrl {
    pub fn new(document_url: impl Into<String>) -> Self {
        BaseUrl {
            inner: Mutex::new(document_url.into()),
        }
    }

    pub fn get(&self) -> String {
        self.inner.lock().clone()
    }

    pub fn set(&self, url: impl Into<String>) {
        *self.inner.lock() = url.into();
    }
}

/// Resolve `href` against `base`. Returns `None` for references that are
/// not rewritable URLs (fragments, data and javascript schemes, empty).
pub fn resolve(base: &str, href: &str) -> Option<String> {
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if lower.starts_with("data:") || lower.starts_with("javascript:") || lower.starts_with("mailto:")
    {
        return None;
    }
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(href.to_string());
    }
    if let Some(rest) = href.strip_prefix("//") {
        let scheme = base.split("://").next()?;
        return Some(format!("{scheme}://{rest}"));
    }
    if href.starts_with('/') {
        return Some(format!("{}{}", origin_of(base)?, href));
    }
    // Relative path: replace everything after the base's last slash.
    let origin_end = origin_of(base)?.len();
    let dir_end = base.rfind('/').filter(|&p| p >= origin_end).map(|p| p + 1);
    match dir_end {
        Some(end) => Some(format!("{}{}", &base[..end], href)),
        None => Some(format!("{}/{}", base, href)),
    }
}

/// Updates the shared base when the document declares one. Only absolute
/// bases are honored.
pub struct BaseTracker {
    base: Arc<BaseUrl>,
}

impl HtmlFilter for BaseTracker {
    fn name(&self) -> &'static str {
        "base-tracker"
    }

    fn start_element(&mut self, doc: &mut Document, id: ElementId) {
        let element = doc.get(id);
        if element.keyword != Keyword::Base {
            return;
        }
        if let Some(href) = element.attribute_value("href") {
            let lower = href.to_ascii_lowercase();
            if lower.starts_with("http://") || lower.starts_with("https://") {
                debug!(base = %href, "document base updated");
                self.base.set(href);
            }
        }
    }
}

/// Shared per-filter state: the engine seam, the client context the
/// request was made under, and this filter's position in the chain for
/// rewrite-at-most-once bookkeeping.
pub(crate) struct FilterSeam {
    pub engine: Arc<RewriteEngine>,
    pub context: ClientContext,
    pub base: Arc<BaseUrl>,
    pub filter_index: usize,
}

impl FilterSeam {
    /// Claim the element and attach a slot on `attribute_index`, feeding
    /// it from a freshly started rewrite.
    pub fn attach(
        &self,
        doc: &mut Document,
        id: ElementId,
        attribute_index: usize,
        request: RewriteRequest,
    ) {
        if !doc.get_mut(id).claim_rewrite(self.filter_index) {
            return;
        }
        let handle: RewriteHandle = self.engine.start(request);
        doc.add_slot(PendingSlot {
            element: id,
            attribute_index,
            rewrite: Arc::new(handle),
        });
    }

    /// Decoded, base-resolved value of the named attribute, or `None`
    /// when the attribute is missing, undecodable, or not a fetchable URL.
    pub fn rewritable_url(
        &self,
        doc: &Document,
        id: ElementId,
        attribute: &str,
    ) -> Option<(usize, String)> {
        let element = doc.get(id);
        let index = element.find_attribute(attribute)?;
        let attr = &element.attributes[index];
        if attr.has_decoding_error() {
            return None;
        }
        let url = resolve(&self.base.get(), &attr.decoded_value()?)?;
        Some((index, url))
    }
}

/// Assemble the filter chain for one request in options-derived order:
/// base tracking, attribute canonicalization, then one rewrite filter per
/// active filter id. CSS combining is served on demand from its URL form
/// and does not run in the streaming chain.
pub fn build_chain(
    engine: &Arc<RewriteEngine>,
    context: ClientContext,
    document_url: &str,
) -> (FilterChain, Arc<BaseUrl>) {
    let base = Arc::new(BaseUrl::new(document_url));
    let mut chain = FilterChain::new();
    chain.add(Box::new(BaseTracker {
        base: Arc::clone(&base),
    }));
    chain.add(Box::new(CanonicalizeAttributes::new()));
    for id in engine.options().active_filters() {
        let seam = FilterSeam {
            engine: Arc::clone(engine),
            context,
            base: Arc::clone(&base),
            filter_index: chain.len(),
        };
        match id {
            FilterId::ImageCompress => chain.add(Box::new(ImageRewriteFilter::new(seam))),
            FilterId::CssFilter => chain.add(Box::new(CssRewriteFilter::new(seam))),
            FilterId::JsMinify => chain.add(Box::new(JsRewriteFilter::new(seam))),
            FilterId::CacheExtend => chain.add(Box::new(CacheExtendFilter::new(seam))),
            FilterId::CssCombine => {}
        }
    }
    (chain, base)
}

/// True when a `rel` attribute names a stylesheet relation.
pub(crate) fn rel_is_stylesheet(rel: &str) -> bool {
    rel.split_ascii_whitespace()
        .any(|token| token.eq_ignore_ascii_case("stylesheet"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_covers_the_usual_reference_shapes() {
        let base = "http://example.com/dir/page.html";
        assert_eq!(
            resolve(base, "foo.jpg").as_deref(),
            Some("http://example.com/dir/foo.jpg")
        );
        assert_eq!(
            resolve(base, "/foo.jpg").as_deref(),
            Some("http://example.com/foo.jpg")
        );
        assert_eq!(
            resolve(base, "//cdn.example.com/foo.jpg").as_deref(),
            Some("http://cdn.example.com/foo.jpg")
        );
        assert_eq!(
            resolve(base, "https://other.net/a.css").as_deref(),
            Some("https://other.net/a.css")
        );
        assert_eq!(resolve(base, "#anchor"), None);
        assert_eq!(resolve(base, "data:image/png;base64,AAAA"), None);
        assert_eq!(resolve(base, "javascript:void(0)"), None);
    }

    #[test]
    fn bare_origin_base_gets_a_slash() {
        assert_eq!(
            resolve("http://example.com", "foo.jpg").as_deref(),
            Some("http://example.com/foo.jpg")
        );
    }

    #[test]
    fn stylesheet_relation_is_token_based() {
        assert!(rel_is_stylesheet("stylesheet"));
        assert!(rel_is_stylesheet("alternate Stylesheet"));
        assert!(!rel_is_stylesheet("preload"));
    }
}
