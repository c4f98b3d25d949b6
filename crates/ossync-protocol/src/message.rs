use std::fmt;

use serde::Deserialize;

/// Body of a bucket listing (`GET /?prefix=...`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListBucketResult {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub marker: String,
    #[serde(default)]
    pub max_keys: u32,
    #[serde(default)]
    pub delimiter: String,
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(default)]
    pub next_marker: String,
    #[serde(rename = "Contents", default)]
    pub contents: Vec<ObjectSummary>,
    #[serde(rename = "CommonPrefixes", default)]
    pub common_prefixes: Vec<CommonPrefix>,
}

/// One `<Contents>` entry of a listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ObjectSummary {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "LastModified", default)]
    pub last_modified: String,
    #[serde(rename = "ETag", default)]
    pub etag: String,
    #[serde(rename = "Size", default)]
    pub size: u64,
}

/// One `<CommonPrefixes>` entry of a delimited listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CommonPrefix {
    #[serde(rename = "Prefix")]
    pub prefix: String,
}

/// `<Error>` document returned with any non-200 status.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub host_id: String,
}

/// A non-200 response, reduced to what is shown to the operator.
///
/// `message` is the `<Message>` of the error document, or the trimmed raw
/// body when that cannot be decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteError {
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
    pub request_id: Option<String>,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "HTTP {}", self.status)
        } else {
            f.write_str(&self.message)
        }
    }
}

impl std::error::Error for RemoteError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_display_prefers_message() {
        let e = RemoteError {
            status: 403,
            code: Some("AccessDenied".into()),
            message: "Access denied.".into(),
            request_id: None,
        };
        assert_eq!(e.to_string(), "Access denied.");
    }

    #[test]
    fn remote_error_display_falls_back_to_status() {
        let e = RemoteError {
            status: 502,
            code: None,
            message: String::new(),
            request_id: None,
        };
        assert_eq!(e.to_string(), "HTTP 502");
    }

    #[test]
    fn defaults_are_empty() {
        let l = ListBucketResult::default();
        assert!(!l.is_truncated);
        assert!(l.contents.is_empty());
        assert!(l.common_prefixes.is_empty());
    }
}
