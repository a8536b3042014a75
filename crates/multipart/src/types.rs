use cryostore_common::BucketId;
use serde::{Deserialize, Serialize};

/// S3 hard-caps a single multipart upload at 10,000 parts.
pub const MAX_PARTS_PER_UPLOAD: u32 = 10_000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartInfo {
    pub part_number: u32,
    pub size: u64,
    /// Hex-encoded MD5, quoted the way S3 ETags are conventionally rendered
    /// is the caller's concern; this field stores the bare hex digest.
    pub etag: String,
    pub sha256: Option<String>,
}

#[derive(Clone, Debug)]
pub struct UploadState {
    pub upload_id: String,
    pub bucket: BucketId,
    pub key: String,
    pub initiated_at_unix_nanos: i64,
    /// Keyed by part number so completion can validate the caller-supplied
    /// ordering against what was actually uploaded.
    pub parts: std::collections::BTreeMap<u32, PartInfo>,
}

impl UploadState {
    pub fn new(upload_id: String, bucket: BucketId, key: String, initiated_at_unix_nanos: i64) -> Self {
        Self {
            upload_id,
            bucket,
            key,
            initiated_at_unix_nanos,
            parts: Default::default(),
        }
    }

    pub fn total_size(&self) -> u64 {
        self.parts.values().map(|p| p.size).sum()
    }
}
