use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found")]
    NotFound,

    #[error("timed out")]
    Timeout,

    #[error("peer io error: {0}")]
    Io(String),

    #[error("writer already registered for this key")]
    WriterAlreadyRegistered,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for cryostore_common::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::NotFound => cryostore_common::Error::NotFound,
            Error::Timeout => cryostore_common::Error::Timeout,
            Error::Io(s) => cryostore_common::Error::Io(std::io::Error::other(s)),
            Error::WriterAlreadyRegistered => cryostore_common::Error::Internal(e.to_string()),
        }
    }
}
