//! S3-compatible multipart upload engine: tracks in-flight uploads, streams
//! and hashes parts to per-part workfiles, and assembles completion into a
//! single object with a composite ETag (spec.md §6), grounded in
//! `tgts3mpt.go`.

pub mod assembler;
pub mod error;
pub mod registry;
pub mod types;
pub mod xml;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cryostore_common::{BucketId, CksumType, Digest};
use cryostore_filemeta::{BucketExists, Lom, MetadataStore};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::instrument;

pub use error::{Result, S3Error};
pub use registry::{UploadRegistry, UploadSummary, UploadsPage};
pub use types::{PartInfo, UploadState, MAX_PARTS_PER_UPLOAD};

/// Ties the upload table and the on-disk assembler together behind the
/// operations a caller actually issues (init / put-part / complete / abort /
/// list-parts / list-uploads / get-part).
pub struct MultipartEngine {
    registry: UploadRegistry,
    workdir: PathBuf,
    metadata_store: Arc<MetadataStore>,
}

impl MultipartEngine {
    pub fn new(workdir: impl Into<PathBuf>, metadata_store: Arc<MetadataStore>) -> Self {
        Self {
            registry: UploadRegistry::new(),
            workdir: workdir.into(),
            metadata_store,
        }
    }

    #[instrument(skip(self))]
    pub fn init_upload(&self, bucket: BucketId, key: &str, now_unix_nanos: i64) -> String {
        self.registry.init_upload(bucket, key.to_string(), now_unix_nanos)
    }

    #[instrument(skip(self, reader))]
    pub async fn put_part(
        &self,
        upload_id: &str,
        key: &str,
        part_number: u32,
        reader: impl AsyncRead + Unpin,
        compute_sha256: bool,
    ) -> Result<PartInfo> {
        if part_number == 0 || part_number > MAX_PARTS_PER_UPLOAD {
            return Err(S3Error::invalid_part(format!("part number {part_number} out of range")));
        }
        let path = assembler::part_workfile_path(&self.workdir, upload_id, part_number, key);
        let written = assembler::write_part(&path, reader, compute_sha256).await?;
        let part = PartInfo {
            part_number,
            size: written.size,
            etag: written.md5_hex,
            sha256: written.sha256_hex,
        };
        self.registry.add_part(upload_id, part.clone())?;
        Ok(part)
    }

    /// Copying an existing object's byte range in as a part is out of scope
    /// (spec.md Non-goals): callers must upload part bytes directly.
    pub fn put_part_copy(&self) -> Result<PartInfo> {
        Err(S3Error::not_implemented("part copy from an existing object is not supported"))
    }

    /// Assembles the completion into the bucket's normal object storage and
    /// persists its Local Object Metadata. If EC is enabled for the bucket,
    /// re-encoding the published object is the caller's concern (it owns the
    /// erasure-coding path); this only ever writes the plain object plus LOM.
    #[instrument(skip(self, requested_parts, bucket_exists))]
    #[allow(clippy::too_many_arguments)]
    pub async fn complete_upload(
        &self,
        upload_id: &str,
        key: &str,
        requested_parts: &[(u32, String)],
        final_object_path: &Path,
        lom_path: &Path,
        fsync: bool,
        bucket_exists: &dyn BucketExists,
    ) -> Result<(u64, String)> {
        let trimmed: Vec<(u32, String)> = requested_parts.iter().map(|(n, e)| (*n, e.trim_matches('"').to_string())).collect();
        let parts = self.registry.check_parts(upload_id, &trimmed)?;
        let bucket = self.registry.bucket_of(upload_id).ok_or_else(|| S3Error::no_such_upload(upload_id))?;

        let dest = assembler::complete_workfile_path(&self.workdir, upload_id, key);
        let assembled = assembler::assemble_parts(&self.workdir, upload_id, key, &parts, &dest).await?;
        let etag = assembler::composite_etag(&parts);

        assembler::publish_object(&dest, final_object_path, fsync).await?;

        let mut lom = Lom::new(bucket.clone(), key);
        lom.set_size(assembled.size);
        lom.set_digest(Digest { algo: CksumType::Md5, value: assembled.content_md5_hex });
        lom.stamp_atime_now();
        self.metadata_store.write_lom(lom_path, &bucket.name, &lom, bucket_exists).await?;

        assembler::remove_part_workfiles(&self.workdir, upload_id, key, &parts).await;
        self.registry.cleanup_upload(upload_id);
        Ok((assembled.size, etag))
    }

    #[instrument(skip(self))]
    pub async fn abort_upload(&self, upload_id: &str, key: &str) -> Result<()> {
        if let Ok(parts) = self.registry.list_parts(upload_id) {
            assembler::remove_part_workfiles(&self.workdir, upload_id, key, &parts).await;
        }
        if !self.registry.cleanup_upload(upload_id) {
            return Err(S3Error::no_such_upload(upload_id));
        }
        Ok(())
    }

    pub fn list_parts(&self, upload_id: &str) -> Result<Vec<PartInfo>> {
        let mut parts = self.registry.list_parts(upload_id)?;
        parts.sort_by_key(|p| p.part_number);
        Ok(parts)
    }

    pub fn list_uploads(&self, bucket: &BucketId, key_marker: Option<&str>, id_marker: Option<&str>, max_uploads: usize) -> UploadsPage {
        self.registry.list_uploads(bucket, key_marker, id_marker, max_uploads)
    }

    /// Streams the byte range for `part_number` out of the completed
    /// object, the counterpart of `getMptPart`. Only valid after
    /// [`Self::complete_upload`] — the upload is no longer in the registry
    /// at that point, so the caller supplies the already-known part list.
    pub async fn get_part(&self, object_path: &Path, parts: &[PartInfo], part_number: u32, writer: &mut (impl AsyncWrite + Unpin)) -> Result<()> {
        let (offset, size) = assembler::offset_sorted(parts, part_number).ok_or_else(|| S3Error::invalid_part(format!("no such part {part_number}")))?;
        assembler::get_part(object_path, offset, size, writer).await?;
        Ok(())
    }
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

    fn bucket() -> BucketId {
        BucketId::new("ais", "", "bck")
    }

    fn engine(dir: &Path) -> MultipartEngine {
        MultipartEngine::new(dir, Arc::new(MetadataStore::new(false)))
    }

    #[tokio::test]
    async fn full_upload_lifecycle_produces_a_composite_etag() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let upload_id = engine.init_upload(bucket(), "obj", 0);

        let p1 = engine.put_part(&upload_id, "obj", 1, b"hello ".as_slice(), false).await.unwrap();
        let p2 = engine.put_part(&upload_id, "obj", 2, b"world".as_slice(), false).await.unwrap();

        let object_path = dir.path().join("obj");
        let lom_path = dir.path().join("obj.lom");
        let requested = vec![(1, format!("\"{}\"", p1.etag)), (2, format!("\"{}\"", p2.etag))];
        let (size, etag) = engine
            .complete_upload(&upload_id, "obj", &requested, &object_path, &lom_path, false, &AlwaysExists)
            .await
            .unwrap();
        assert_eq!(size, 11);
        assert!(etag.ends_with("-2"));

        let contents = tokio::fs::read(&object_path).await.unwrap();
        assert_eq!(contents, b"hello world");
        let lom = engine.metadata_store.load_lom(&lom_path).await.unwrap();
        assert_eq!(lom.size, 11);
        assert_eq!(lom.digest.algo, CksumType::Md5);
    }

    #[tokio::test]
    async fn abort_cleans_up_part_workfiles() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let upload_id = engine.init_upload(bucket(), "obj", 0);
        engine.put_part(&upload_id, "obj", 1, b"data".as_slice(), false).await.unwrap();

        let workfile = assembler::part_workfile_path(dir.path(), &upload_id, 1, "obj");
        assert!(workfile.exists());

        engine.abort_upload(&upload_id, "obj").await.unwrap();
        assert!(!workfile.exists());
        assert!(engine.list_parts(&upload_id).is_err());
    }

    #[tokio::test]
    async fn part_copy_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let err = engine.put_part_copy().unwrap_err();
        assert_eq!(err.code, "NotImplemented");
    }

    #[tokio::test]
    async fn list_uploads_is_paginated_through_the_engine() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        engine.init_upload(bucket(), "a", 0);
        engine.init_upload(bucket(), "b", 0);

        let page = engine.list_uploads(&bucket(), None, None, 1);
        assert_eq!(page.uploads.len(), 1);
        assert_eq!(page.uploads[0].key, "a");
        assert!(page.is_truncated);
    }
}
