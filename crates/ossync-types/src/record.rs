use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::key;

/// A file or object seen while enumerating one side of a comparison.
///
/// Local files and remote objects use the same record so that the diff
/// engine can run in either direction. Records are immutable once
/// enumeration has finished.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Full local path or slash-prefixed remote key.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Content digest, when it was computed (local) or reported (remote).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
    /// Read failure attached during checksum enumeration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ObjectRecord {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            digest: None,
            error: None,
        }
    }

    pub fn with_digest(mut self, digest: Digest) -> Self {
        self.digest = Some(digest);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Name with the first `offset` bytes removed.
    pub fn relative_name(&self, offset: usize) -> &str {
        key::relative_name(&self.name, offset)
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// A common prefix ("directory") returned by a delimited remote listing.
///
/// Directories are never diffed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub name: String,
}

impl DirectoryRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let d = Digest::from_md5([1; 16]);
        let r = ObjectRecord::new("/a", 3).with_digest(d);
        assert_eq!(r.name, "/a");
        assert_eq!(r.size, 3);
        assert_eq!(r.digest, Some(d));
        assert!(!r.is_failed());
    }

    #[test]
    fn error_marks_failed() {
        let r = ObjectRecord::new("/a", 0).with_error("permission denied");
        assert!(r.is_failed());
    }

    #[test]
    fn relative_name_strips_offset() {
        let r = ObjectRecord::new("/home/me/site/index.html", 10);
        assert_eq!(r.relative_name("/home/me/site".len()), "/index.html");
    }

    #[test]
    fn json_omits_empty_optionals() {
        let r = ObjectRecord::new("/a", 1);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"name":"/a","size":1}"#);
    }

    #[test]
    fn directory_record_name() {
        assert_eq!(DirectoryRecord::new("photos/").name, "photos/");
    }
}
