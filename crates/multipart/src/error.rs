use thiserror::Error;

/// Carries the HTTP status and S3 error code a caller-facing handler would
/// report, alongside the internal cause — grounded in `tgts3mpt.go`'s use of
/// `s3.WriteErr`, which always needs both a status code and an S3-flavored
/// error code.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct S3Error {
    pub status: u16,
    pub code: &'static str,
    pub message: String,
}

impl S3Error {
    fn new(status: u16, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }

    pub fn no_such_upload(upload_id: &str) -> Self {
        Self::new(404, "NoSuchUpload", format!("upload {upload_id:?} does not exist"))
    }

    pub fn invalid_part(message: impl Into<String>) -> Self {
        Self::new(400, "InvalidPart", message.into())
    }

    pub fn invalid_part_order() -> Self {
        Self::new(400, "InvalidPartOrder", "part numbers must be strictly increasing")
    }

    pub fn entity_too_small() -> Self {
        Self::new(400, "EntityTooSmall", "completion body listed no parts")
    }

    pub fn max_parts_exceeded(upload_id: &str, limit: u32) -> Self {
        Self::new(400, "InvalidArgument", format!("upload {upload_id:?} exceeds {limit} parts"))
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(501, "NotImplemented", message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, "InternalError", message.into())
    }
}

impl From<std::io::Error> for S3Error {
    fn from(e: std::io::Error) -> Self {
        S3Error::internal(e.to_string())
    }
}

impl From<cryostore_filemeta::Error> for S3Error {
    fn from(e: cryostore_filemeta::Error) -> Self {
        S3Error::internal(e.to_string())
    }
}

impl From<S3Error> for cryostore_common::Error {
    fn from(e: S3Error) -> Self {
        match e.code {
            "NoSuchUpload" | "InvalidPart" | "InvalidPartOrder" | "EntityTooSmall" | "InvalidArgument" => {
                cryostore_common::Error::BadRequest(e.message)
            }
            "NotImplemented" => cryostore_common::Error::Unsupported(e.message),
            _ => cryostore_common::Error::Internal(e.message),
        }
    }
}

pub type Result<T> = std::result::Result<T, S3Error>;
