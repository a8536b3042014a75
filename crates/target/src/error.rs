use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Restore(#[from] cryostore_restore::Error),

    #[error(transparent)]
    Multipart(#[from] cryostore_multipart::S3Error),

    #[error(transparent)]
    Filemeta(#[from] cryostore_filemeta::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for cryostore_common::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Restore(e) => e.into(),
            Error::Multipart(e) => e.into(),
            Error::Filemeta(e) => e.into(),
        }
    }
}
