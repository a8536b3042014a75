use cryostore_common::BucketId;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{Result, S3Error};
use crate::types::{PartInfo, UploadState, MAX_PARTS_PER_UPLOAD};

pub struct UploadSummary {
    pub upload_id: String,
    pub key: String,
    pub initiated_at_unix_nanos: i64,
}

pub struct UploadsPage {
    pub uploads: Vec<UploadSummary>,
    /// Whether more uploads exist past this page, for the response's
    /// `IsTruncated`/`NextKeyMarker` fields.
    pub is_truncated: bool,
}

/// Process-wide table of in-flight multipart uploads, grounded in
/// `tgts3mpt.go`'s package-level `s3.InitUpload`/`s3.AddPart`/`s3.CheckParts`
/// helpers — a `DashMap` stands in for the original's sharded map plus
/// per-entry mutex.
#[derive(Default)]
pub struct UploadRegistry {
    uploads: DashMap<String, Mutex<UploadState>>,
}

impl UploadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init_upload(&self, bucket: BucketId, key: impl Into<String>, now_unix_nanos: i64) -> String {
        let upload_id = Uuid::new_v4().to_string();
        let state = UploadState::new(upload_id.clone(), bucket, key.into(), now_unix_nanos);
        self.uploads.insert(upload_id.clone(), Mutex::new(state));
        upload_id
    }

    pub fn add_part(&self, upload_id: &str, part: PartInfo) -> Result<()> {
        let entry = self.uploads.get(upload_id).ok_or_else(|| S3Error::no_such_upload(upload_id))?;
        let mut state = entry.lock();
        if !state.parts.contains_key(&part.part_number) && state.parts.len() as u32 >= MAX_PARTS_PER_UPLOAD {
            return Err(S3Error::max_parts_exceeded(upload_id, MAX_PARTS_PER_UPLOAD));
        }
        state.parts.insert(part.part_number, part);
        Ok(())
    }

    /// Validates the caller-supplied completion list against what was
    /// actually uploaded: part numbers must be strictly increasing, every
    /// part must exist, and its reported ETag must match.
    pub fn check_parts(&self, upload_id: &str, requested: &[(u32, String)]) -> Result<Vec<PartInfo>> {
        if requested.is_empty() {
            return Err(S3Error::entity_too_small());
        }
        if requested.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err(S3Error::invalid_part_order());
        }
        let entry = self.uploads.get(upload_id).ok_or_else(|| S3Error::no_such_upload(upload_id))?;
        let state = entry.lock();
        requested
            .iter()
            .map(|(num, etag)| match state.parts.get(num) {
                Some(part) if &part.etag == etag => Ok(part.clone()),
                Some(_) => Err(S3Error::invalid_part(format!("part {num}: etag mismatch"))),
                None => Err(S3Error::invalid_part(format!("part {num}: not uploaded"))),
            })
            .collect()
    }

    pub fn obj_size(&self, upload_id: &str) -> Result<u64> {
        let entry = self.uploads.get(upload_id).ok_or_else(|| S3Error::no_such_upload(upload_id))?;
        Ok(entry.lock().total_size())
    }

    pub fn list_parts(&self, upload_id: &str) -> Result<Vec<PartInfo>> {
        let entry = self.uploads.get(upload_id).ok_or_else(|| S3Error::no_such_upload(upload_id))?;
        Ok(entry.lock().parts.values().cloned().collect())
    }

    /// Lists in-flight uploads for `bucket`, S3-style: sorted by `(key,
    /// uploadID)`, skipping everything at or before `(key_marker,
    /// id_marker)` and capping the page at `max_uploads`. `id_marker` only
    /// disambiguates two uploads sharing the same key -- S3 requires it be
    /// paired with a `key_marker`, which callers are expected to enforce.
    pub fn list_uploads(&self, bucket: &BucketId, key_marker: Option<&str>, id_marker: Option<&str>, max_uploads: usize) -> UploadsPage {
        let mut all: Vec<UploadSummary> = self
            .uploads
            .iter()
            .filter(|e| e.lock().bucket == *bucket)
            .map(|e| {
                let state = e.lock();
                UploadSummary {
                    upload_id: state.upload_id.clone(),
                    key: state.key.clone(),
                    initiated_at_unix_nanos: state.initiated_at_unix_nanos,
                }
            })
            .collect();
        all.sort_by(|a, b| (&a.key, &a.upload_id).cmp(&(&b.key, &b.upload_id)));

        let start = match key_marker {
            Some(key_marker) => all
                .iter()
                .position(|u| (u.key.as_str(), u.upload_id.as_str()) > (key_marker, id_marker.unwrap_or("")))
                .unwrap_or(all.len()),
            None => 0,
        };
        let remaining = all.len() - start;
        let is_truncated = remaining > max_uploads;
        all.truncate(start + max_uploads);
        all.drain(..start);
        UploadsPage { uploads: all, is_truncated }
    }

    /// Removes the upload from the table; returns whether it existed. The
    /// caller is responsible for deleting any on-disk part workfiles
    /// (spec.md's assembler owns that path, not the registry).
    pub fn cleanup_upload(&self, upload_id: &str) -> bool {
        self.uploads.remove(upload_id).is_some()
    }

    pub fn bucket_of(&self, upload_id: &str) -> Option<BucketId> {
        self.uploads.get(upload_id).map(|e| e.lock().bucket.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket() -> BucketId {
        BucketId::new("ais", "", "bck")
    }

    fn part(n: u32, etag: &str) -> PartInfo {
        PartInfo { part_number: n, size: 10, etag: etag.to_string(), sha256: None }
    }

    #[test]
    fn check_parts_rejects_non_increasing_order() {
        let reg = UploadRegistry::new();
        let id = reg.init_upload(bucket(), "obj", 0);
        reg.add_part(&id, part(1, "a")).unwrap();
        reg.add_part(&id, part(2, "b")).unwrap();
        let err = reg.check_parts(&id, &[(2, "b".into()), (1, "a".into())]).unwrap_err();
        assert_eq!(err.code, "InvalidPartOrder");
    }

    #[test]
    fn check_parts_rejects_etag_mismatch() {
        let reg = UploadRegistry::new();
        let id = reg.init_upload(bucket(), "obj", 0);
        reg.add_part(&id, part(1, "a")).unwrap();
        let err = reg.check_parts(&id, &[(1, "wrong".into())]).unwrap_err();
        assert_eq!(err.code, "InvalidPart");
    }

    #[test]
    fn check_parts_accepts_matching_sequence() {
        let reg = UploadRegistry::new();
        let id = reg.init_upload(bucket(), "obj", 0);
        reg.add_part(&id, part(1, "a")).unwrap();
        reg.add_part(&id, part(2, "b")).unwrap();
        let parts = reg.check_parts(&id, &[(1, "a".into()), (2, "b".into())]).unwrap();
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn cleanup_removes_the_upload() {
        let reg = UploadRegistry::new();
        let id = reg.init_upload(bucket(), "obj", 0);
        assert!(reg.cleanup_upload(&id));
        assert!(reg.list_parts(&id).is_err());
    }

    #[test]
    fn unknown_upload_id_is_no_such_upload() {
        let reg = UploadRegistry::new();
        let err = reg.obj_size("does-not-exist").unwrap_err();
        assert_eq!(err.code, "NoSuchUpload");
    }

    #[test]
    fn list_uploads_is_sorted_and_capped() {
        let reg = UploadRegistry::new();
        reg.init_upload(bucket(), "b", 0);
        reg.init_upload(bucket(), "a", 0);
        reg.init_upload(bucket(), "c", 0);

        let page = reg.list_uploads(&bucket(), None, None, 2);
        assert_eq!(page.uploads.len(), 2);
        assert_eq!(page.uploads[0].key, "a");
        assert_eq!(page.uploads[1].key, "b");
        assert!(page.is_truncated);
    }

    #[test]
    fn list_uploads_resumes_after_the_given_marker() {
        let reg = UploadRegistry::new();
        reg.init_upload(bucket(), "a", 0);
        reg.init_upload(bucket(), "b", 0);
        reg.init_upload(bucket(), "c", 0);

        let page = reg.list_uploads(&bucket(), Some("a"), None, 10);
        assert_eq!(page.uploads.iter().map(|u| u.key.as_str()).collect::<Vec<_>>(), vec!["b", "c"]);
        assert!(!page.is_truncated);
    }

    #[test]
    fn list_uploads_id_marker_breaks_ties_on_the_same_key() {
        let reg = UploadRegistry::new();
        let first = reg.init_upload(bucket(), "same", 0);
        let second = reg.init_upload(bucket(), "same", 0);
        let (low, high) = if first < second { (first, second) } else { (second, first) };

        let page = reg.list_uploads(&bucket(), Some("same"), Some(&low), 10);
        assert_eq!(page.uploads.len(), 1);
        assert_eq!(page.uploads[0].upload_id, high);
    }
}
