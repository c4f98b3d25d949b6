//! Foundation types for ossync.
//!
//! Every other ossync crate depends on `ossync-types`. Records produced by
//! the local walker and the remote lister share one shape so the diff engine
//! can compare the two sides symmetrically.
//!
//! # Key Types
//!
//! - [`ObjectRecord`] -- a local file or a remote object (name, size, digest)
//! - [`DirectoryRecord`] -- a remote common prefix from a delimited listing
//! - [`Digest`] -- lower-case hex MD5, comparable against a remote ETag
//!
//! The [`key`] module holds the lexical path helpers shared by the path
//! mapper and the argument parsers.

pub mod digest;
pub mod error;
pub mod key;
pub mod record;

pub use digest::Digest;
pub use error::{TypeError, TypeResult};
pub use record::{DirectoryRecord, ObjectRecord};
