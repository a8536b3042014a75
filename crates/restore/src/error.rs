use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("erasure coding is disabled for this bucket")]
    EcDisabled,

    #[error("no metafile found for this object on any reachable peer")]
    NoMetafile,

    #[error("no peer returned a non-empty replica stream")]
    ReplicaUnavailable,

    #[error("cannot restore: found {have} slices, need {need} or more")]
    TooFewSlices { have: usize, need: usize },

    #[error("peer exchange failed: {0}")]
    Peer(#[from] cryostore_peer_exchange::Error),

    #[error("erasure coding failed: {0}")]
    Codec(#[from] cryostore_erasure_coding::Error),

    #[error("metadata store failed: {0}")]
    Filemeta(#[from] cryostore_filemeta::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("restore orchestrator is shutting down")]
    ShuttingDown,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for cryostore_common::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::EcDisabled => cryostore_common::Error::EcDisabled,
            Error::NoMetafile => cryostore_common::Error::NoMetafile,
            Error::TooFewSlices { have, need } => cryostore_common::Error::TooFewSlices { have, need },
            Error::Filemeta(e) => e.into(),
            Error::ShuttingDown => cryostore_common::Error::Timeout,
            other => cryostore_common::Error::Internal(other.to_string()),
        }
    }
}
