use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found")]
    NotFound,

    #[error("corrupted metadata: {0}")]
    Corrupted(String),

    #[error("bucket gone")]
    BucketGone,

    #[error("invalid metadata: {0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for cryostore_common::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::NotFound => cryostore_common::Error::NotFound,
            Error::Corrupted(s) => cryostore_common::Error::Corrupted(s),
            Error::BucketGone => cryostore_common::Error::BucketGone,
            Error::Invalid(s) => cryostore_common::Error::BadRequest(s),
            Error::Io(e) => cryostore_common::Error::Io(e),
        }
    }
}
