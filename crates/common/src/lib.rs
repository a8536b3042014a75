//! Shared data-model types for the cryostore restoration and multipart
//! engines: bucket identity, object keys, digests, and the per-object
//! custom metadata bag (ETag, LastModified, source-object-id).

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
