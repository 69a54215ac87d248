// crates/domain/src/content_type.rs

//! Canonical mapping from file extension / MIME type to an internal content
//! type tag and routing category.
//!
//! The table is fixed by design: the core does no sniffing beyond it.

/// Routing category for a resource, used to pick filter-appropriate handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentCategory {
    Script,
    Image,
    Stylesheet,
    OtherResource,
    Hyperlink,
}

/// Internal content-type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Html,
    Xhtml,
    Css,
    Javascript,
    Jpeg,
    Png,
    Gif,
    Webp,
    Svg,
    Ico,
    Text,
    Json,
    Xml,
    Pdf,
    Octet,
}

struct Entry {
    ty: ContentType,
    mime: &'static str,
    ext: &'static str,
    category: ContentCategory,
}

const TABLE: &[Entry] = &[
    Entry { ty: ContentType::Html, mime: "text/html", ext: "html", category: ContentCategory::Hyperlink },
    Entry { ty: ContentType::Xhtml, mime: "application/xhtml+xml", ext: "xhtml", category: ContentCategory::Hyperlink },
    Entry { ty: ContentType::Css, mime: "text/css", ext: "css", category: ContentCategory::Stylesheet },
    Entry { ty: ContentType::Javascript, mime: "application/javascript", ext: "js", category: ContentCategory::Script },
    Entry { ty: ContentType::Javascript, mime: "text/javascript", ext: "js", category: ContentCategory::Script },
    Entry { ty: ContentType::Jpeg, mime: "image/jpeg", ext: "jpg", category: ContentCategory::Image },
    Entry { ty: ContentType::Jpeg, mime: "image/jpeg", ext: "jpeg", category: ContentCategory::Image },
    Entry { ty: ContentType::Png, mime: "image/png", ext: "png", category: ContentCategory::Image },
    Entry { ty: ContentType::Gif, mime: "image/gif", ext: "gif", category: ContentCategory::Image },
    Entry { ty: ContentType::Webp, mime: "image/webp", ext: "webp", category: ContentCategory::Image },
    Entry { ty: ContentType::Svg, mime: "image/svg+xml", ext: "svg", category: ContentCategory::Image },
    Entry { ty: ContentType::Ico, mime: "image/x-icon", ext: "ico", category: ContentCategory::Image },
    Entry { ty: ContentType::Text, mime: "text/plain", ext: "txt", category: ContentCategory::OtherResource },
    Entry { ty: ContentType::Json, mime: "application/json", ext: "json", category: ContentCategory::OtherResource },
    Entry { ty: ContentType::Xml, mime: "application/xml", ext: "xml", category: ContentCategory::OtherResource },
    Entry { ty: ContentType::Pdf, mime: "application/pdf", ext: "pdf", category: ContentCategory::OtherResource },
    Entry { ty: ContentType::Octet, mime: "application/octet-stream", ext: "bin", category: ContentCategory::OtherResource },
];

impl ContentType {
    /// Look up by file extension (without the dot, case-insensitive).
    pub fn from_extension(ext: &str) -> Option<ContentType> {
        let lower = ext.to_ascii_lowercase();
        TABLE.iter().find(|e| e.ext == lower).map(|e| e.ty)
    }

    /// Look up by MIME type, ignoring any `;charset=` parameters.
    pub fn from_mime(mime: &str) -> Option<ContentType> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        TABLE.iter().find(|e| e.mime == essence).map(|e| e.ty)
    }

    /// Canonical extension for this type (no dot). Aliased extensions
    /// resolve to the first table entry, so `Jpeg` yields `jpg`.
    pub fn extension(self) -> &'static str {
        TABLE
            .iter()
            .find(|e| e.ty == self)
            .map(|e| e.ext)
            .unwrap_or("bin")
    }

    /// Canonical MIME string.
    pub fn mime(self) -> &'static str {
        TABLE
            .iter()
            .find(|e| e.ty == self)
            .map(|e| e.mime)
            .unwrap_or("application/octet-stream")
    }

    pub fn category(self) -> ContentCategory {
        TABLE
            .iter()
            .find(|e| e.ty == self)
            .map(|e| e.category)
            .unwrap_or(ContentCategory::OtherResource)
    }

    pub fn is_image(self) -> bool {
        self.category() == ContentCategory::Image
    }

    pub fn is_css(self) -> bool {
        self == ContentType::Css
    }

    pub fn is_js(self) -> bool {
        self == ContentType::Javascript
    }

    pub fn is_html_like(self) -> bool {
        matches!(self, ContentType::Html | ContentType::Xhtml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(ContentType::from_extension("JPG"), Some(ContentType::Jpeg));
        assert_eq!(ContentType::from_extension("jpeg"), Some(ContentType::Jpeg));
        assert_eq!(ContentType::from_extension("webp"), Some(ContentType::Webp));
        assert_eq!(ContentType::from_extension("exe"), None);
    }

    #[test]
    fn mime_lookup_strips_parameters() {
        assert_eq!(
            ContentType::from_mime("text/html; charset=utf-8"),
            Some(ContentType::Html)
        );
        assert_eq!(
            ContentType::from_mime("text/javascript"),
            Some(ContentType::Javascript)
        );
        assert_eq!(ContentType::from_mime("video/mp4"), None);
    }

    #[test]
    fn canonical_extension_collapses_aliases() {
        assert_eq!(ContentType::Jpeg.extension(), "jpg");
        assert_eq!(ContentType::Css.extension(), "css");
    }

    #[test]
    fn categories_route_as_expected() {
        assert_eq!(ContentType::Css.category(), ContentCategory::Stylesheet);
        assert_eq!(ContentType::Png.category(), ContentCategory::Image);
        assert_eq!(ContentType::Javascript.category(), ContentCategory::Script);
        assert_eq!(ContentType::Html.category(), ContentCategory::Hyperlink);
    }
}
