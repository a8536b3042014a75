use std::path::PathBuf;
use std::sync::Arc;

use cryostore_common::{BucketId, PeerId};
use cryostore_filemeta::{BucketExists, LomPool, MetadataStore};
use cryostore_listing::{merge_listings, ListingPage};
use cryostore_multipart::MultipartEngine;
use cryostore_peer_exchange::{PeerTransport, WriterRegistry};
use cryostore_restore::{RestoreOrchestrator, RestoreOutcome, RestoreRequest};
use tokio::sync::oneshot;

use crate::config::Config;

/// The assembled set of engines a running target needs, wired from one
/// [`Config`] — the counterpart of the teacher's top-level binary crate
/// wiring `ecstore`/`filemeta`/`workers` together behind one `ServerState`.
pub struct Target {
    pub config: Config,
    pub metadata_store: Arc<MetadataStore>,
    pub multipart: MultipartEngine,
    pub writer_registry: Arc<WriterRegistry>,
    pub restore: RestoreOrchestrator,
    restore_workdir: PathBuf,
    bucket_exists: Arc<dyn BucketExists>,
}

impl Target {
    #[tracing::instrument(skip(multipart_workdir, transport, bucket_exists))]
    pub fn new(
        config: Config,
        multipart_workdir: impl Into<PathBuf>,
        transport: Arc<dyn PeerTransport>,
        bucket_exists: Arc<dyn BucketExists>,
        restore_concurrency: usize,
    ) -> Self {
        let writer_registry = Arc::new(WriterRegistry::new());
        let metadata_store = Arc::new(MetadataStore::new(config.fsync_put));
        let multipart_workdir = multipart_workdir.into();
        Self {
            restore: RestoreOrchestrator::spawn(
                transport,
                writer_registry.clone(),
                metadata_store.clone(),
                Arc::new(LomPool::new()),
                restore_concurrency,
            ),
            restore_workdir: multipart_workdir.clone(),
            multipart: MultipartEngine::new(multipart_workdir, metadata_store.clone()),
            metadata_store,
            writer_registry,
            bucket_exists,
            config,
        }
    }

    pub fn shutdown(&self) {
        self.restore.stop();
    }

    /// Merges the per-target list-objects pages gathered for one bucket
    /// listing request into a single sorted, deduplicated page.
    pub fn merge_object_listings(&self, pages: Vec<ListingPage>, no_dirs: bool, max_size: usize) -> ListingPage {
        merge_listings(pages, no_dirs, max_size)
    }

    /// Builds a [`RestoreRequest`] from the bucket's per-config policy, so
    /// callers only need to supply the object identity and the on-disk
    /// destination.
    #[allow(clippy::too_many_arguments)]
    pub fn build_restore_request(
        &self,
        bucket: BucketId,
        key: impl Into<String>,
        known_peers: Vec<PeerId>,
        desired_copies: usize,
        object_size: u64,
        object_path: impl Into<PathBuf>,
        metafile_path: impl Into<PathBuf>,
        reply: oneshot::Sender<cryostore_restore::Result<RestoreOutcome>>,
    ) -> RestoreRequest {
        RestoreRequest {
            ec_enabled: self.config.ec_enabled_for(&bucket),
            stage_to_disk: self.config.stages_to_disk(object_size),
            fsync_put: self.config.fsync_put,
            workdir: self.restore_workdir.clone(),
            object_path: object_path.into(),
            metafile_path: metafile_path.into(),
            bucket_exists: self.bucket_exists.clone(),
            key: key.into(),
            known_peers,
            desired_copies,
            bucket,
            reply,
        }
    }
}

#[cfg(test)]
mod tests {
    use cryostore_peer_exchange::testing::InMemoryTransport;

    use super::*;

    struct AlwaysExists;
    impl BucketExists for AlwaysExists {
        fn bucket_exists(&self, _bucket_name: &str) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn target_wires_up_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let transport: Arc<dyn PeerTransport> = Arc::new(InMemoryTransport::new());
        let target = Target::new(Config::default(), dir.path(), transport, Arc::new(AlwaysExists), 4);
        assert!(!target.config.ec_enabled_for(&cryostore_common::BucketId::new("ais", "", "bck")));
        target.shutdown();
    }

    #[tokio::test]
    async fn build_restore_request_reads_policy_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let transport: Arc<dyn PeerTransport> = Arc::new(InMemoryTransport::new());
        let mut config = Config::default();
        let bucket = BucketId::new("ais", "", "bck");
        config.ec_enabled.insert(bucket.clone(), true);
        let target = Target::new(config, dir.path(), transport, Arc::new(AlwaysExists), 4);

        let (tx, _rx) = oneshot::channel();
        let req = target.build_restore_request(
            bucket,
            "obj",
            vec!["peer-a".to_string()],
            1,
            0,
            dir.path().join("obj"),
            dir.path().join("obj.ecmeta"),
            tx,
        );
        assert!(req.ec_enabled);
        assert!(!req.stage_to_disk);
        target.shutdown();
    }
}

