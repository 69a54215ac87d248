// crates/rewrite/src/namer.rs

//! Rewritten-resource leaf names: `ID.HASH.NAME.EXT`.
//!
//! `ID` is the two-character filter tag, `HASH` the short content hash,
//! `NAME` the filter-defined payload (dot-free by construction, see the
//! segment escaper), `EXT` the output extension. Legacy CSS names carry an
//! extra `W.`/`I.`/`A.` segment inside `NAME`; the parser therefore joins
//! any middle segments back together and leaves prefix handling to the
//! CSS encoder.

use domain::{ContentType, CoreError, FilterId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceName {
    pub id: FilterId,
    pub hash: String,
    pub name: String,
    pub ext: String,
}

impl ResourceName {
    pub fn new(id: FilterId, hash: String, name: String, ext: String) -> Self {
        ResourceName {
            id,
            hash,
            name,
            ext,
        }
    }

    /// Assemble the leaf. The modern form always contains exactly three
    /// dots.
    pub fn encode(&self) -> String {
        format!("{}.{}.{}.{}", self.id.as_str(), self.hash, self.name, self.ext)
    }

    /// Parse a leaf produced by [`encode`](Self::encode) (or a legacy CSS
    /// leaf with one extra internal dot).
    pub fn decode(leaf: &str) -> Result<Self, CoreError> {
        let parts: Vec<&str> = leaf.split('.').collect();
        if parts.len() < 4 {
            return Err(CoreError::decode(format!(
                "resource leaf {leaf:?} has fewer than four components"
            )));
        }
        let id = FilterId::from_str(parts[0]).ok_or_else(|| {
            CoreError::decode(format!("unknown filter id {:?}", parts[0]))
        })?;
        let hash = parts[1];
        let ext = parts[parts.len() - 1];
        if hash.is_empty() || ext.is_empty() {
            return Err(CoreError::decode("empty hash or extension component"));
        }
        let name = parts[2..parts.len() - 1].join(".");
        if name.is_empty() {
            return Err(CoreError::decode("empty name component"));
        }
        Ok(ResourceName {
            id,
            hash: hash.to_string(),
            name,
            ext: ext.to_string(),
        })
    }

    /// Output content type implied by the extension.
    pub fn content_type(&self) -> Option<ContentType> {
        ContentType::from_extension(&self.ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_matches_expected_shape() {
        let name = ResourceName::new(
            FilterId::ImageCompress,
            "ABCDEFG".into(),
            "200x100x,hexample,c,_foo,j".into(),
            "webp".into(),
        );
        assert_eq!(name.encode(), "ic.ABCDEFG.200x100x,hexample,c,_foo,j.webp");
        assert_eq!(name.encode().matches('.').count(), 3);
    }

    #[test]
    fn decode_round_trips() {
        let leaf = "ic.ABCDEFG.200x100x,hexample,c,_foo,j.webp";
        let name = ResourceName::decode(leaf).unwrap();
        assert_eq!(name.id, FilterId::ImageCompress);
        assert_eq!(name.hash, "ABCDEFG");
        assert_eq!(name.name, "200x100x,hexample,c,_foo,j");
        assert_eq!(name.ext, "webp");
        assert_eq!(name.encode(), leaf);
    }

    #[test]
    fn legacy_css_extra_dot_joins_into_name() {
        let name = ResourceName::decode("cf.H.W.,hwww,cexample,c,_a,s.css").unwrap();
        assert_eq!(name.id, FilterId::CssFilter);
        assert_eq!(name.name, "W.,hwww,cexample,c,_a,s");
    }

    #[test]
    fn decode_rejects_malformed() {
        assert!(ResourceName::decode("ic.H.name").is_err()); // three parts
        assert!(ResourceName::decode("zz.H.name.css").is_err()); // bad id
        assert!(ResourceName::decode("ic..name.css").is_err()); // empty hash
        assert!(ResourceName::decode("ic.H..css").is_err()); // empty name
    }
}
