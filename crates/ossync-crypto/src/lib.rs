//! Cryptographic primitives for ossync.
//!
//! Provides MD5 content digests (used for `Content-MD5` headers, ETag
//! comparison and checksum diffs) and the HMAC-SHA1 request signer the
//! remote store expects in its `Authorization` header.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod hasher;
pub mod signer;

pub use hasher::ContentHasher;
pub use signer::{http_date, CryptoError, Credentials, RequestSigner, StringToSign};
