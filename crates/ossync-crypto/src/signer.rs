use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Date layout required by the store. `%a`/`%b` are always English here, and
/// the zone is the literal `GMT` rather than chrono's RFC 2822 offset.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Errors from signing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

/// Format a timestamp for the `Date` header, e.g. `Mon, 02 Jan 2006 15:04:05 GMT`.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE_FORMAT).to_string()
}

/// Access key pair used to sign every request of a run.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .finish()
    }
}

/// The canonical string covered by a request signature.
///
/// Lines are `METHOD`, `Content-MD5`, `Content-Type`, `Date` and the
/// resource `/<bucket><key>`, joined by `\n`. `key` is the resource path
/// only; callers leave any query string out, so a `?` inside an object name
/// is signed as part of the name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringToSign<'a> {
    pub method: &'a str,
    pub content_md5: &'a str,
    pub content_type: &'a str,
    pub date: &'a str,
    pub bucket: &'a str,
    pub key: &'a str,
}

impl StringToSign<'_> {
    pub fn canonical(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n/{}{}",
            self.method, self.content_md5, self.content_type, self.date, self.bucket, self.key
        )
    }
}

/// HMAC-SHA1 signer bound to one bucket and one credential pair.
#[derive(Clone, Debug)]
pub struct RequestSigner {
    credentials: Credentials,
    bucket: String,
}

impl RequestSigner {
    pub fn new(credentials: Credentials, bucket: impl Into<String>) -> Self {
        Self {
            credentials,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn access_key_id(&self) -> &str {
        &self.credentials.access_key_id
    }

    /// Base64 signature of a canonical string.
    pub fn signature(&self, canonical: &str) -> Result<String, CryptoError> {
        let mut mac = HmacSha1::new_from_slice(self.credentials.access_key_secret.as_bytes())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        mac.update(canonical.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Value for the `Authorization` header: `OSS <key id>:<signature>`.
    pub fn authorization(
        &self,
        method: &str,
        content_md5: &str,
        content_type: &str,
        date: &str,
        key: &str,
    ) -> Result<String, CryptoError> {
        let canonical = StringToSign {
            method,
            content_md5,
            content_type,
            date,
            bucket: &self.bucket,
            key,
        }
        .canonical();
        let signature = self.signature(&canonical)?;
        Ok(format!("OSS {}:{}", self.credentials.access_key_id, signature))
    }

    /// Signature for a pre-signed GET URL expiring at `expires` (Unix seconds).
    ///
    /// The expiry takes the place of the `Date` line.
    pub fn presign_get(&self, key: &str, expires: i64) -> Result<String, CryptoError> {
        let expires = expires.to_string();
        let canonical = StringToSign {
            method: "GET",
            content_md5: "",
            content_type: "",
            date: &expires,
            bucket: &self.bucket,
            key,
        }
        .canonical();
        self.signature(&canonical)
    }
}
