use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{TypeError, TypeResult};

/// MD5 content fingerprint, stored as 16 raw bytes.
///
/// The remote store reports the same value as an ETag (quoted, usually
/// upper-case hex). Both sides are parsed into a `Digest` so that comparison
/// never depends on quoting or letter case.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 16]);

impl Digest {
    /// Wrap a pre-computed MD5 sum.
    pub const fn from_md5(sum: [u8; 16]) -> Self {
        Self(sum)
    }

    /// The raw 16-byte sum.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Lower-case hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string (either case).
    pub fn from_hex(s: &str) -> TypeResult<Self> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 16 {
            return Err(TypeError::InvalidLength {
                expected: 16,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Parse an ETag header or listing field such as `"5EB63BBBE01EEED093CB22BB8F5ACDC3"`.
    ///
    /// Returns `None` for ETags that are not a plain MD5 (multipart uploads
    /// produce `"<hex>-<parts>"`), which then never match a local digest.
    pub fn from_etag(etag: &str) -> Option<Self> {
        Self::from_hex(etag.trim().trim_matches('"')).ok()
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl From<[u8; 16]> for Digest {
    fn from(sum: [u8; 16]) -> Self {
        Self(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_MD5: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";

    #[test]
    fn hex_roundtrip_is_lower_case() {
        let d = Digest::from_hex(&HELLO_MD5.to_uppercase()).unwrap();
        assert_eq!(d.to_hex(), HELLO_MD5);
        assert_eq!(d.to_string(), HELLO_MD5);
    }

    #[test]
    fn etag_quotes_and_case_are_ignored() {
        let etag = format!("\"{}\"", HELLO_MD5.to_uppercase());
        assert_eq!(Digest::from_etag(&etag), Some(Digest::from_hex(HELLO_MD5).unwrap()));
    }

    #[test]
    fn multipart_etag_is_not_a_digest() {
        assert_eq!(Digest::from_etag("\"5EB63BBBE01EEED093CB22BB8F5ACDC3-2\""), None);
        assert_eq!(Digest::from_etag(""), None);
    }

    #[test]
    fn wrong_length_rejected() {
        let err = Digest::from_hex("abcd").unwrap_err();
        assert_eq!(err, TypeError::InvalidLength { expected: 16, actual: 2 });
    }

    #[test]
    fn invalid_hex_rejected() {
        assert!(matches!(Digest::from_hex("zz"), Err(TypeError::InvalidHex(_))));
    }

    #[test]
    fn serializes_as_hex_string() {
        let d = Digest::from_hex(HELLO_MD5).unwrap();
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{HELLO_MD5}\""));
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn debug_shows_hex() {
        let d = Digest::from_md5([0xab; 16]);
        assert!(format!("{d:?}").starts_with("Digest(abab"));
    }
}
