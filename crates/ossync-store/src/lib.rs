//! Object store access for ossync.
//!
//! The remote side of every command goes through the [`ObjectStore`] trait:
//! one paginated listing call, and single-object HEAD, PUT and GET. Keys
//! handed to the trait are slash-prefixed (`/dir/file.txt`); keys coming back
//! in listings are the raw store keys without the leading slash.
//!
//! # Backends
//!
//! - [`HttpObjectStore`] -- signed requests over HTTP(S) with `reqwest`
//! - [`InMemoryObjectStore`] -- `BTreeMap`-based store for tests
//!
//! Neither backend retries. A non-200 answer becomes
//! [`StoreError::Remote`] carrying the decoded error document.

pub mod error;
pub mod http;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use http::HttpObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{ObjectBody, ObjectHead};
pub use traits::ObjectStore;
