use base64::{engine::general_purpose::STANDARD, Engine as _};
use md5::{Digest as _, Md5};
use ossync_types::Digest;

/// Incremental MD5 hasher producing an ossync [`Digest`].
///
/// The remote store fingerprints single-part objects with the MD5 of their
/// content, so this is the digest used for ETag comparison and `--md5`
/// diffs alike.
#[derive(Clone, Default)]
pub struct ContentHasher {
    inner: Md5,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more bytes into the hash.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Consume the hasher and return the digest.
    pub fn finalize(self) -> Digest {
        Digest::from_md5(self.inner.finalize().into())
    }

    /// One-shot digest of a byte slice.
    pub fn digest(data: &[u8]) -> Digest {
        Digest::from_md5(Md5::digest(data).into())
    }

    /// Base64 value for a `Content-MD5` header.
    pub fn content_md5(digest: &Digest) -> String {
        STANDARD.encode(digest.as_bytes())
    }
}
