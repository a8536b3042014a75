use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid codec configuration: {0}")]
    InvalidConfig(String),

    #[error("too few shards: have {have}, need {need}")]
    TooFewShards { have: usize, need: usize },

    #[error("codec error: {0}")]
    Codec(String),
}

impl From<Error> for cryostore_common::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::TooFewShards { have, need } => cryostore_common::Error::TooFewSlices { have, need },
            other => cryostore_common::Error::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
