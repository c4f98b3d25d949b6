//! Content-type sniffing for uploaded bodies.
//!
//! The content type is part of the signed string, so it must be derived the
//! same way every time a body is sent. Only the first 512 bytes are looked at.

const SNIFF_LEN: usize = 512;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b\x08", "application/x-gzip"),
];

/// Guess a MIME type from leading bytes.
///
/// Known binary signatures win; otherwise HTML-looking text is `text/html`,
/// other UTF-8 text without NUL bytes is `text/plain`, and everything else is
/// `application/octet-stream`. An empty body is plain text.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    let head = &data[..data.len().min(SNIFF_LEN)];
    if let Some((_, mime)) = SIGNATURES.iter().find(|(magic, _)| head.starts_with(magic)) {
        return mime;
    }
    if head.contains(&0) {
        return OCTET_STREAM;
    }
    let text = match std::str::from_utf8(head) {
        Ok(text) => text,
        // a multi-byte character may straddle the cut-off
        Err(e) if e.error_len().is_none() => std::str::from_utf8(&head[..e.valid_up_to()]).unwrap_or(""),
        Err(_) => return OCTET_STREAM,
    };
    let lead = text.trim_start().to_ascii_lowercase();
    if lead.starts_with("<!doctype html") || lead.starts_with("<html") {
        "text/html; charset=utf-8"
    } else {
        TEXT_PLAIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_text() {
        assert_eq!(sniff_content_type(b""), TEXT_PLAIN);
    }

    #[test]
    fn plain_text() {
        assert_eq!(sniff_content_type("héllo\n".as_bytes()), TEXT_PLAIN);
    }

    #[test]
    fn html() {
        assert_eq!(sniff_content_type(b"  <!DOCTYPE html><html>"), "text/html; charset=utf-8");
    }

    #[test]
    fn png_signature() {
        assert_eq!(sniff_content_type(b"\x89PNG\r\n\x1a\n\0\0"), "image/png");
    }

    #[test]
    fn binary_with_nul() {
        assert_eq!(sniff_content_type(b"abc\0def"), OCTET_STREAM);
    }

    #[test]
    fn invalid_utf8() {
        assert_eq!(sniff_content_type(&[0xc3, 0x28, 0x41]), OCTET_STREAM);
    }

    #[test]
    fn truncated_multibyte_at_limit_is_text() {
        let mut data = vec![b'a'; SNIFF_LEN - 1];
        data.extend_from_slice("é".as_bytes());
        assert_eq!(sniff_content_type(&data), TEXT_PLAIN);
    }
}
