use url::form_urlencoded::byte_serialize;

/// Page size requested from the listing endpoint.
pub const MAX_KEYS: u32 = 1000;

/// Resolve the API base URL for a bucket.
///
/// A template containing exactly one `%s` has it replaced by the bucket name
/// (`https://%s.oss-cn-hangzhou.aliyuncs.com`); anything else, such as a
/// custom domain, is used verbatim. Trailing slashes are dropped so keys can
/// be appended directly.
pub fn endpoint_for_bucket(template: &str, bucket: &str) -> String {
    let resolved = if template.matches("%s").count() == 1 {
        template.replacen("%s", bucket, 1)
    } else {
        template.to_string()
    };
    resolved.trim_end_matches('/').to_string()
}

/// Query for one page of a bucket listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery {
    pub prefix: String,
    pub marker: Option<String>,
    /// Group keys below the next `/` into common prefixes.
    pub delimited: bool,
    pub max_keys: u32,
}

impl ListQuery {
    pub fn new(prefix: impl Into<String>, recursive: bool) -> Self {
        Self {
            prefix: prefix.into(),
            marker: None,
            delimited: !recursive,
            max_keys: MAX_KEYS,
        }
    }

    /// The same query continued after `marker`.
    pub fn after(&self, marker: impl Into<String>) -> Self {
        Self {
            marker: Some(marker.into()),
            ..self.clone()
        }
    }

    /// Request path including the query string, e.g.
    /// `/?max-keys=1000&delimiter=/&prefix=photos%2F`.
    pub fn to_path(&self) -> String {
        let mut path = format!("/?max-keys={}", self.max_keys);
        if self.delimited {
            path.push_str("&delimiter=/");
        }
        path.push_str("&prefix=");
        path.extend(byte_serialize(self.prefix.as_bytes()));
        if let Some(marker) = &self.marker {
            path.push_str("&marker=");
            path.extend(byte_serialize(marker.as_bytes()));
        }
        path
    }
}
