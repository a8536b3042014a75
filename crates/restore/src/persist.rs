//! Atomic local persistence of a restored object, mirroring
//! `cryostore_filemeta::MetadataStore`'s temp-file-plus-rename idiom for the
//! object's data bytes rather than its metafile.

use std::path::Path;

use bytes::Bytes;
use cryostore_filemeta::{BucketExists, EcMetadata, MetadataStore};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::Result;

/// Atomically writes `bytes` to `path`: temp file in the same directory,
/// optional fsync, then rename.
pub async fn write_object_atomic(path: &Path, bytes: &Bytes, fsync: bool) -> std::io::Result<()> {
    let dir = path.parent().expect("object path always has a parent directory");
    let tmp_path = dir.join(format!(".{}.tmp", uuid_like_suffix()));
    {
        let mut f = fs::File::create(&tmp_path).await?;
        f.write_all(bytes).await?;
        if fsync {
            f.sync_all().await?;
        }
    }
    fs::rename(&tmp_path, path).await?;
    Ok(())
}

fn uuid_like_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    format!("{nanos:x}")
}

/// Writes the restored object's bytes and metafile atomically: spec.md
/// §4.5.1's "After fetch, write replica + metafile atomically" and
/// §4.5.2 step 3's "Persist with a 'main' metafile".
pub async fn persist_restored_object(
    metadata_store: &MetadataStore,
    object_path: &Path,
    metafile_path: &Path,
    bucket_name: &str,
    bytes: &Bytes,
    md: &EcMetadata,
    fsync: bool,
    bucket_exists: &dyn BucketExists,
) -> Result<()> {
    write_object_atomic(object_path, bytes, fsync).await?;
    metadata_store.write(metafile_path, bucket_name, md, bucket_exists).await?;
    Ok(())
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

    #[tokio::test]
    async fn writes_both_object_bytes_and_metafile() {
        let dir = tempfile::tempdir().unwrap();
        let object_path = dir.path().join("obj");
        let metafile_path = dir.path().join("obj.ecmeta");
        let store = MetadataStore::new(false);
        let md = EcMetadata {
            generation: 1,
            is_copy: true,
            ..Default::default()
        };

        persist_restored_object(
            &store,
            &object_path,
            &metafile_path,
            "bucket-a",
            &Bytes::from_static(b"payload"),
            &md,
            false,
            &AlwaysExists,
        )
        .await
        .unwrap();

        assert_eq!(fs::read(&object_path).await.unwrap(), b"payload");
        let loaded = store.load(&metafile_path).await.unwrap();
        assert_eq!(loaded, md);
    }
}
