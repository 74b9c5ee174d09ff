//! # Document Identity Newtypes
//!
//! `DocumentCode` is the public identifier handed back at upload and used
//! by every later validation request. `BlobRef` is the opaque handle under
//! which the blob store keeps a document's content or proof.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::digest::ContentDigest;
use crate::error::CoreError;

/// Globally unique document identifier.
///
/// Format: `XXXXXXXX-YYYYYYYY`, upper-case hex. The first half is the
/// leading 8 hex chars of the content digest, the second half is random.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentCode(String);

impl DocumentCode {
    /// Derive a fresh code for `digest` with a random suffix.
    pub fn generate(digest: &ContentDigest) -> Self {
        let random = Uuid::new_v4().simple().to_string();
        Self::from_parts(digest, &random[..8])
    }

    fn from_parts(digest: &ContentDigest, random: &str) -> Self {
        let hex = digest.to_hex();
        Self(format!("{}-{}", &hex[..8], random).to_uppercase())
    }

    /// Parse and validate a code. Lower-case input is normalized.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let normalized = s.trim().to_uppercase();
        let valid = normalized.len() == 17
            && normalized.as_bytes()[8] == b'-'
            && normalized
                .bytes()
                .enumerate()
                .all(|(i, b)| i == 8 || b.is_ascii_hexdigit());
        if !valid {
            return Err(CoreError::InvalidCode(s.to_string()));
        }
        Ok(Self(normalized))
    }

    /// The digest prefix half of the code.
    pub fn digest_prefix(&self) -> &str {
        &self.0[..8]
    }

    /// Return the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocumentCode {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<DocumentCode> for String {
    fn from(code: DocumentCode) -> Self {
        code.0
    }
}

/// Opaque handle to a blob held by the external blob store.
///
/// Relative, `/`-separated, never empty, and never containing `..`
/// segments or a leading `/`, so any store can map it onto its own
/// namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlobRef(String);

impl BlobRef {
    /// Validate a blob reference.
    pub fn new(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if !s.split('/').all(Self::is_valid_segment) {
            return Err(CoreError::InvalidBlobRef(s));
        }
        Ok(Self(s))
    }

    /// Whether `segment` can appear between two `/` of a reference.
    pub fn is_valid_segment(segment: &str) -> bool {
        !segment.is_empty()
            && segment != "."
            && segment != ".."
            && !segment.contains(['/', '\\'])
    }

    /// Reference for a document's content: `{code}/{filename}`.
    pub fn content(code: &DocumentCode, filename: &str) -> Result<Self, CoreError> {
        Self::new(format!("{code}/{filename}"))
    }

    /// Reference for a document's serialized proof: `{code}.proof`.
    pub fn proof(code: &DocumentCode) -> Self {
        Self(format!("{code}.proof"))
    }

    /// Return the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlobRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BlobRef {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BlobRef> for String {
    fn from(r: BlobRef) -> Self {
        r.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::sha256_digest;

    #[test]
    fn generated_code_has_digest_prefix() {
        let digest = sha256_digest(b"hello");
        let code = DocumentCode::generate(&digest);
        assert_eq!(code.digest_prefix(), "2CF24DBA");
        assert_eq!(code.as_str().len(), 17);
        assert_eq!(code.as_str(), code.as_str().to_uppercase());
        assert!(DocumentCode::parse(code.as_str()).is_ok());
    }

    #[test]
    fn generated_codes_differ_for_same_content() {
        let digest = sha256_digest(b"same");
        assert_ne!(DocumentCode::generate(&digest), DocumentCode::generate(&digest));
    }

    #[test]
    fn from_parts_is_uppercased() {
        let digest = sha256_digest(b"hello");
        let code = DocumentCode::from_parts(&digest, "abcdef01");
        assert_eq!(code.as_str(), "2CF24DBA-ABCDEF01");
    }

    #[test]
    fn parse_normalizes_case() {
        let code = DocumentCode::parse("2cf24dba-abcdef01").unwrap();
        assert_eq!(code.as_str(), "2CF24DBA-ABCDEF01");
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["", "2CF24DBA", "2CF24DBAABCDEF012", "2CF24DBA_ABCDEF01", "ZZF24DBA-ABCDEF01"] {
            assert!(DocumentCode::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn code_serde_validates() {
        let ok: DocumentCode = serde_json::from_str("\"2CF24DBA-ABCDEF01\"").unwrap();
        assert_eq!(ok.as_str(), "2CF24DBA-ABCDEF01");
        assert!(serde_json::from_str::<DocumentCode>("\"nope\"").is_err());
    }

    #[test]
    fn blob_refs_for_document() {
        let code = DocumentCode::parse("2CF24DBA-ABCDEF01").unwrap();
        assert_eq!(
            BlobRef::content(&code, "report.pdf").unwrap().as_str(),
            "2CF24DBA-ABCDEF01/report.pdf"
        );
        assert_eq!(BlobRef::proof(&code).as_str(), "2CF24DBA-ABCDEF01.proof");
    }

    #[test]
    fn blob_ref_rejects_traversal() {
        for bad in ["", "/abs", "a/../b", "a//b", "..", "a\\b"] {
            assert!(BlobRef::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn dot_filenames_cannot_become_content_refs() {
        let code = DocumentCode::parse("2CF24DBA-ABCDEF01").unwrap();
        for name in [".", ".."] {
            assert!(!BlobRef::is_valid_segment(name));
            assert!(BlobRef::content(&code, name).is_err());
        }
        assert!(BlobRef::is_valid_segment(".hidden"));
        assert!(BlobRef::is_valid_segment("a..b"));
    }

    proptest::proptest! {
        #[test]
        fn generated_codes_always_parse(content in proptest::collection::vec(proptest::num::u8::ANY, 0..256)) {
            let digest = sha256_digest(&content);
            let code = DocumentCode::generate(&digest);
            let parsed = DocumentCode::parse(&code.as_str().to_lowercase()).unwrap();
            proptest::prop_assert_eq!(&parsed, &code);
            proptest::prop_assert_eq!(code.digest_prefix(), digest.to_hex()[..8].to_uppercase());
        }
    }
}
