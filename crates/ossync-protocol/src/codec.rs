use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{ErrorResponse, ListBucketResult, RemoteError};

/// Decoder for the XML documents returned by the object store.
pub struct XmlCodec;

impl XmlCodec {
    /// Decode a listing page.
    pub fn decode_listing(body: &[u8]) -> ProtocolResult<ListBucketResult> {
        let text = std::str::from_utf8(body)?;
        quick_xml::de::from_str(text).map_err(|e| ProtocolError::Deserialization {
            document: "ListBucketResult",
            reason: e.to_string(),
        })
    }

    /// Turn a non-200 response into a [`RemoteError`]. Never fails: an
    /// undecodable body becomes the message verbatim (trimmed).
    pub fn decode_error(status: u16, body: &[u8]) -> RemoteError {
        let text = String::from_utf8_lossy(body);
        match quick_xml::de::from_str::<ErrorResponse>(&text) {
            Ok(doc) if !doc.message.is_empty() => RemoteError {
                status,
                code: (!doc.code.is_empty()).then_some(doc.code),
                message: doc.message,
                request_id: (!doc.request_id.is_empty()).then_some(doc.request_id),
            },
            _ => RemoteError {
                status,
                code: None,
                message: text.trim().to_string(),
                request_id: None,
            },
        }
    }
}
