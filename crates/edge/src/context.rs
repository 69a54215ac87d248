// crates/edge/src/context.rs

//! Client context derivation from request headers.
//!
//! The derived vector rides in the rewrite fingerprint, so two clients
//! with different capabilities never share an output.

use http::header::{HeaderMap, ACCEPT, USER_AGENT, VIA};

use domain::context::WebpLevel;
use domain::ClientContext;

const SMALL_SCREEN_MAX_WIDTH: u32 = 640;

fn header_str<'a>(headers: &'a HeaderMap, name: impl http::header::AsHeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Derive the context vector for one request.
pub fn client_context(headers: &HeaderMap) -> ClientContext {
    let accept = header_str(headers, ACCEPT).unwrap_or("");
    let user_agent = header_str(headers, USER_AGENT).unwrap_or("");
    let ua_lower = user_agent.to_ascii_lowercase();

    let webp = if accept.contains("image/webp") {
        WebpLevel::LossyLosslessAlpha
    } else if ua_lower.contains("android 4.") {
        // Old Android decodes lossy WebP but not lossless or alpha.
        WebpLevel::LossyOnly
    } else {
        WebpLevel::None
    };

    let mobile_user_agent = ["mobile", "android", "iphone", "ipod"]
        .iter()
        .any(|needle| ua_lower.contains(needle));

    let save_data = header_str(headers, "save-data")
        .is_some_and(|v| v.eq_ignore_ascii_case("on"));

    let small_screen = header_str(headers, "viewport-width")
        .or_else(|| header_str(headers, "sec-ch-viewport-width"))
        .and_then(|v| v.trim().parse::<u32>().ok())
        .is_some_and(|w| w < SMALL_SCREEN_MAX_WIDTH);

    ClientContext {
        webp,
        mobile_user_agent,
        save_data,
        small_screen,
        has_via_header: headers.contains_key(VIA),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                http::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn webp_comes_from_the_accept_header() {
        let ctx = client_context(&headers(&[("accept", "image/avif,image/webp,*/*")]));
        assert_eq!(ctx.webp, WebpLevel::LossyLosslessAlpha);

        let ctx = client_context(&headers(&[("accept", "*/*")]));
        assert_eq!(ctx.webp, WebpLevel::None);
    }

    #[test]
    fn old_android_gets_lossy_only() {
        let ctx = client_context(&headers(&[(
            "user-agent",
            "Mozilla/5.0 (Linux; Android 4.2; GT-I9505)",
        )]));
        assert_eq!(ctx.webp, WebpLevel::LossyOnly);
        assert!(ctx.mobile_user_agent);
    }

    #[test]
    fn save_data_and_viewport_flags() {
        let ctx = client_context(&headers(&[
            ("save-data", "on"),
            ("viewport-width", "360"),
            ("via", "1.1 proxy"),
        ]));
        assert!(ctx.save_data);
        assert!(ctx.small_screen);
        assert!(ctx.has_via_header);
    }

    #[test]
    fn empty_headers_give_the_default_context() {
        assert_eq!(client_context(&HeaderMap::new()), ClientContext::default());
    }
}
