use thiserror::Error;

/// Error vocabulary shared across the restoration and multipart engines.
///
/// Every other crate in the workspace wraps this enum via `#[from]` rather
/// than minting its own top-level "kind" type, so a caller two crates away
/// from the origin can still match on `Error::NotFound` etc.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not found")]
    NotFound,

    #[error("corrupted metadata: {0}")]
    Corrupted(String),

    #[error("no EC metafile available")]
    NoMetafile,

    #[error("too few slices: have {have}, need {need}")]
    TooFewSlices { have: usize, need: usize },

    #[error("data checksum mismatch: {0}")]
    DataChecksum(String),

    #[error("part ETag mismatch: {0}")]
    PartEtagMismatch(String),

    #[error("bucket gone")]
    BucketGone,

    #[error("erasure coding disabled for this bucket")]
    EcDisabled,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("timed out")]
    Timeout,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
