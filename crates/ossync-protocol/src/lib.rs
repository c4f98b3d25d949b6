//! Wire protocol for ossync.
//!
//! Defines the XML documents the object store answers with (bucket
//! listings and error bodies), the query strings used to page through a
//! listing, and the content-type sniffing that feeds request signing.

pub mod codec;
pub mod content_type;
pub mod endpoint;
pub mod error;
pub mod message;

pub use codec::XmlCodec;
pub use content_type::sniff_content_type;
pub use endpoint::{endpoint_for_bucket, ListQuery, MAX_KEYS};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{CommonPrefix, ErrorResponse, ListBucketResult, ObjectSummary, RemoteError};
