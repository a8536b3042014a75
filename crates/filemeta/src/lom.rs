use cryostore_common::{BucketId, CustomMeta, Digest, ObjectKey};
use serde::{Deserialize, Serialize};

/// Local Object Metadata: the canonical record of one object on one
/// mountpath (spec.md §3 "Local Object (LOM)"). Lifecycle: allocated from a
/// pool on access, loaded from on-disk metadata lazily, persisted atomically
/// after mutation, released to the pool when no caller holds it -- see
/// [`LomPool`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Lom {
    pub bucket: Option<BucketId>,
    pub key: ObjectKey,
    pub size: u64,
    pub digest: Digest,
    pub version: String,
    pub atime_unix_nanos: i64,
    pub custom: CustomMeta,
}

impl Lom {
    pub fn new(bucket: BucketId, key: impl Into<ObjectKey>) -> Self {
        Self {
            bucket: Some(bucket),
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    pub fn set_digest(&mut self, digest: Digest) {
        self.digest = digest;
    }

    pub fn set_custom(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom.set(key, value);
    }

    pub fn stamp_atime_now(&mut self) {
        self.atime_unix_nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos() as i64;
    }

    fn reset(&mut self) {
        self.bucket = None;
        self.key.clear();
        self.size = 0;
        self.digest = Digest::none();
        self.version.clear();
        self.atime_unix_nanos = 0;
        self.custom = CustomMeta::default();
    }
}

/// A simple free-list pool for [`Lom`] instances, avoiding a fresh
/// allocation (and its custom-metadata `HashMap`) on every access. Mirrors
/// the `allocLOM`/`FreeLOM` pooled-object pattern (Design Notes §9: arenas
/// instead of cyclic back-references).
#[derive(Default)]
pub struct LomPool {
    free: parking_lot::Mutex<Vec<Lom>>,
}

impl LomPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, bucket: BucketId, key: impl Into<ObjectKey>) -> Lom {
        let mut lom = self.free.lock().pop().unwrap_or_default();
        lom.bucket = Some(bucket);
        lom.key = key.into();
        lom
    }

    pub fn release(&self, mut lom: Lom) {
        lom.reset();
        self.free.lock().push(lom);
    }
}
