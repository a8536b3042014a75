use std::path::Path;

use cryostore_filemeta::{BucketExists, MetadataStore};

/// Everything one restoration needs to stage fetched bytes and persist the
/// result, gathered in one place so the `restore_ops` functions don't carry
/// a dozen loose parameters -- the Rust counterpart of the pooled
/// per-request context spec.md §4.5 describes the worker loop building and
/// releasing around each restoration.
pub struct RestoreIoCtx<'a> {
    pub metadata_store: &'a MetadataStore,
    /// Final path the restored object's bytes are atomically renamed into.
    pub object_path: &'a Path,
    /// Final path the restored EC metafile is atomically renamed into.
    pub metafile_path: &'a Path,
    pub bucket_name: &'a str,
    pub fsync: bool,
    pub bucket_exists: &'a dyn BucketExists,
    /// Directory restore workfiles (`ec-restore-repl`, `ec-restore-<id>`)
    /// are staged under.
    pub workdir: &'a Path,
    /// Whether to stage fetched bytes to a workfile instead of memory --
    /// the caller's `useDisk(size, config)` decision (spec.md §4.5.1).
    pub stage_to_disk: bool,
}
