use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::ec_meta::EcMetadata;
use crate::error::{Error, Result};
use crate::lom::Lom;

/// Callback the restore/write path uses to detect a bucket-deletion race
/// after writing a metafile (spec.md §4.3): "on bucket deletion race...the
/// metafile is removed and the operation fails with `bucket-gone`". Kept as
/// an injected trait rather than a concrete cluster-metadata dependency,
/// since bucket metadata propagation is an out-of-scope collaborator
/// (spec.md §1).
pub trait BucketExists: Send + Sync {
    fn bucket_exists(&self, bucket_name: &str) -> bool;
}

/// Reads and writes the two on-disk metadata records that live beside an
/// object: the EC metafile and the LOM record.
pub struct MetadataStore {
    fsync_put: bool,
}

impl MetadataStore {
    pub fn new(fsync_put: bool) -> Self {
        Self { fsync_put }
    }

    /// Loads and validates a metafile. `not-found` and `corrupted` are
    /// distinguished so discovery callers can treat a missing peer
    /// differently from a peer whose metafile failed validation.
    pub async fn load(&self, path: &Path) -> Result<EcMetadata> {
        let md: EcMetadata = self.load_json(path, "metafile").await?;
        md.validate().map_err(|e| Error::Corrupted(e.to_string()))?;
        Ok(md)
    }

    /// Atomically writes `md` to `path` (temp file in the same directory +
    /// rename), re-checking bucket existence afterwards via `bucket_gone`.
    pub async fn write(&self, path: &Path, bucket_name: &str, md: &EcMetadata, bucket_exists: &dyn BucketExists) -> Result<()> {
        md.validate()?;
        self.write_json(path, bucket_name, md, "metafile", bucket_exists).await
    }

    /// Loads a persisted [`Lom`] record.
    pub async fn load_lom(&self, path: &Path) -> Result<Lom> {
        self.load_json(path, "LOM").await
    }

    /// Atomically persists a [`Lom`] record, mirroring [`write`](Self::write)'s
    /// temp+rename idiom for the object-level metadata record rather than
    /// the EC metafile.
    pub async fn write_lom(&self, path: &Path, bucket_name: &str, lom: &Lom, bucket_exists: &dyn BucketExists) -> Result<()> {
        self.write_json(path, bucket_name, lom, "LOM", bucket_exists).await
    }

    async fn load_json<T: DeserializeOwned>(&self, path: &Path, kind: &str) -> Result<T> {
        let bytes = match fs::read(path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Error::NotFound),
            Err(e) => return Err(Error::Io(e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| Error::Corrupted(format!("{kind} decode failed: {e}")))
    }

    async fn write_json<T: Serialize>(
        &self,
        path: &Path,
        bucket_name: &str,
        value: &T,
        kind: &str,
        bucket_exists: &dyn BucketExists,
    ) -> Result<()> {
        let dir = path.parent().ok_or_else(|| Error::Invalid(format!("{kind} path has no parent")))?;
        let tmp_path = dir.join(format!(".{}.tmp", uuid_like_suffix()));

        let bytes = serde_json::to_vec(value).map_err(|e| Error::Corrupted(format!("{kind} encode failed: {e}")))?;
        {
            let mut f = fs::File::create(&tmp_path).await?;
            f.write_all(&bytes).await?;
            if self.fsync_put {
                f.sync_all().await?;
            }
        }
        fs::rename(&tmp_path, path).await?;

        if !bucket_exists.bucket_exists(bucket_name) {
            let _ = fs::remove_file(path).await;
            return Err(Error::BucketGone);
        }
        Ok(())
    }
}

fn uuid_like_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    format!("{nanos:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysExists;
    impl BucketExists for AlwaysExists {
        fn bucket_exists(&self, _bucket_name: &str) -> bool {
            true
        }
    }

    struct NeverExists;
    impl BucketExists for NeverExists {
        fn bucket_exists(&self, _bucket_name: &str) -> bool {
            false
        }
    }

    fn sample_md() -> EcMetadata {
        EcMetadata {
            generation: 1,
            size: 1024,
            data: 4,
            parity: 2,
            is_copy: false,
            slice_id: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obj.ecmeta");
        let store = MetadataStore::new(false);

        store.write(&path, "bucket-a", &sample_md(), &AlwaysExists).await.unwrap();
        let loaded = store.load(&path).await.unwrap();
        assert_eq!(loaded, sample_md());
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.ecmeta");
        let store = MetadataStore::new(false);
        assert!(matches!(store.load(&path).await.unwrap_err(), Error::NotFound));
    }

    #[tokio::test]
    async fn corrupted_file_is_distinguished_from_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ecmeta");
        fs::write(&path, b"not json").await.unwrap();
        let store = MetadataStore::new(false);
        assert!(matches!(store.load(&path).await.unwrap_err(), Error::Corrupted(_)));
    }

    #[tokio::test]
    async fn bucket_gone_removes_the_just_written_metafile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obj.ecmeta");
        let store = MetadataStore::new(false);

        let err = store.write(&path, "bucket-a", &sample_md(), &NeverExists).await.unwrap_err();
        assert!(matches!(err, Error::BucketGone));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn lom_round_trips_through_disk() {
        use crate::lom::LomPool;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obj.lom");
        let store = MetadataStore::new(false);

        let pool = LomPool::new();
        let mut lom = pool.acquire(cryostore_common::BucketId::new("local", "default", "bucket-a"), "a/b.bin");
        lom.set_size(99);
        lom.set_version("v1");

        store.write_lom(&path, "bucket-a", &lom, &AlwaysExists).await.unwrap();
        let loaded = store.load_lom(&path).await.unwrap();
        assert_eq!(loaded.size, 99);
        assert_eq!(loaded.version, "v1");
    }

    #[tokio::test]
    async fn lom_bucket_gone_removes_the_just_written_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obj.lom");
        let store = MetadataStore::new(false);
        let lom = crate::lom::Lom::new(cryostore_common::BucketId::new("local", "default", "bucket-a"), "a/b.bin");

        let err = store.write_lom(&path, "bucket-a", &lom, &NeverExists).await.unwrap_err();
        assert!(matches!(err, Error::BucketGone));
        assert!(!path.exists());
    }
}
