use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use cryostore_common::{BucketId, PeerId};
use cryostore_erasure_coding::Codec;
use cryostore_filemeta::{BucketExists, LomPool, MetadataStore};
use cryostore_peer_exchange::{PeerTransport, WriterRegistry};
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::context::RestoreIoCtx;
use crate::discovery::discover_metas;
use crate::error::{Error, Result};
use crate::mode::{decide, drop_stale_generations, latest_generation, RestoreMode};
use crate::restore_ops::{restore_encoded, restore_replica};

/// Everything a single restore needs that isn't known ahead of time by the
/// orchestrator: the object identity, the peers worth asking, the bucket's
/// redundancy/gating policy, and where the restored bytes and metafile
/// ultimately land.
pub struct RestoreRequest {
    pub bucket: BucketId,
    pub key: String,
    pub known_peers: Vec<PeerId>,
    pub desired_copies: usize,
    /// `ec.enabled` per-bucket gate (spec.md §6): restoration is refused
    /// outright when this is `false`, regardless of the eventual mode.
    pub ec_enabled: bool,
    /// Whether to stage fetched bytes to a workfile instead of memory --
    /// the caller's `Config::stages_to_disk(object_size)` decision.
    pub stage_to_disk: bool,
    pub fsync_put: bool,
    /// Directory restore workfiles are staged under.
    pub workdir: PathBuf,
    /// Final path the restored object's bytes are atomically renamed into.
    pub object_path: PathBuf,
    /// Final path the restored EC metafile is atomically renamed into.
    pub metafile_path: PathBuf,
    pub bucket_exists: Arc<dyn BucketExists>,
    pub reply: oneshot::Sender<Result<RestoreOutcome>>,
}

pub struct RestoreOutcome {
    pub mode: RestoreMode,
    pub bytes: Bytes,
}

/// One restore worker per mountpath: requests queue on a channel and run
/// with bounded concurrency (`sys.MaxParallelism()` capped at 8 in the
/// original jogger), and a cancellation token lets the mountpath shut the
/// worker down without leaking pending requests.
pub struct RestoreOrchestrator {
    sender: mpsc::Sender<RestoreRequest>,
    cancel: CancellationToken,
}

impl RestoreOrchestrator {
    pub fn spawn(
        transport: Arc<dyn PeerTransport>,
        registry: Arc<WriterRegistry>,
        metadata_store: Arc<MetadataStore>,
        lom_pool: Arc<LomPool>,
        max_parallel: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(128);
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        tokio::spawn(worker_loop(
            receiver,
            transport,
            registry,
            metadata_store,
            lom_pool,
            max_parallel.min(8),
            worker_cancel,
        ));
        Self { sender, cancel }
    }

    pub async fn submit(&self, request: RestoreRequest) -> std::result::Result<(), RestoreRequest> {
        self.sender.send(request).await.map_err(|e| e.0)
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

#[allow(clippy::too_many_arguments)]
async fn worker_loop(
    mut receiver: mpsc::Receiver<RestoreRequest>,
    transport: Arc<dyn PeerTransport>,
    registry: Arc<WriterRegistry>,
    metadata_store: Arc<MetadataStore>,
    lom_pool: Arc<LomPool>,
    max_parallel: usize,
    cancel: CancellationToken,
) {
    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = receiver.recv() => {
                let Some(request) = next else { break };
                let permit = semaphore.clone().acquire_owned().await.expect("semaphore is never closed");
                let transport = transport.clone();
                let registry = registry.clone();
                let metadata_store = metadata_store.clone();
                let lom_pool = lom_pool.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    let outcome = handle_request(&request, transport, registry, metadata_store, lom_pool).await;
                    let _ = request.reply.send(outcome);
                });
            }
        }
    }
}

/// Dequeues to run-restoration to persist-reply, per spec.md §4.5's worker
/// loop. The `ec.enabled` gate is checked before any peer contact; the atime
/// stamp happens immediately after, before the discovery I/O begins.
#[instrument(skip(transport, registry, metadata_store, lom_pool), fields(bucket = %request.bucket, key = %request.key))]
async fn handle_request(
    request: &RestoreRequest,
    transport: Arc<dyn PeerTransport>,
    registry: Arc<WriterRegistry>,
    metadata_store: Arc<MetadataStore>,
    lom_pool: Arc<LomPool>,
) -> Result<RestoreOutcome> {
    if !request.ec_enabled {
        return Err(Error::EcDisabled);
    }

    let mut lom = lom_pool.acquire(request.bucket.clone(), request.key.clone());
    lom.stamp_atime_now();

    let result = run_restoration(request, transport, registry, &metadata_store).await;

    lom_pool.release(lom);
    result
}

async fn run_restoration(
    request: &RestoreRequest,
    transport: Arc<dyn PeerTransport>,
    registry: Arc<WriterRegistry>,
    metadata_store: &MetadataStore,
) -> Result<RestoreOutcome> {
    let mut nodes = discover_metas(transport.clone(), request.bucket.clone(), request.key.clone(), &request.known_peers, 8).await;

    if nodes.is_empty() {
        return Err(Error::NoMetafile);
    }

    let meta = latest_generation(&nodes).ok_or(Error::NoMetafile)?;
    drop_stale_generations(&mut nodes, meta.generation);

    let mode = decide(&meta, nodes.len())?;
    let io = RestoreIoCtx {
        metadata_store,
        object_path: &request.object_path,
        metafile_path: &request.metafile_path,
        bucket_name: &request.bucket.name,
        fsync: request.fsync_put,
        bucket_exists: request.bucket_exists.as_ref(),
        workdir: &request.workdir,
        stage_to_disk: request.stage_to_disk,
    };

    let bytes = match mode {
        RestoreMode::Replica => {
            restore_replica(
                transport.as_ref(),
                &registry,
                &request.bucket,
                &request.key,
                &meta,
                &nodes,
                &request.known_peers,
                request.desired_copies,
                &io,
            )
            .await?
        }
        RestoreMode::Encoded => {
            let codec = Codec::new(meta.data as usize, meta.parity as usize)?;
            restore_encoded(
                transport.as_ref(),
                &registry,
                &codec,
                &request.bucket,
                &request.key,
                &meta,
                &nodes,
                &request.known_peers,
                &io,
            )
            .await?
        }
    };

    Ok(RestoreOutcome { mode, bytes })
}
