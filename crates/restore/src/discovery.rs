use std::collections::HashMap;
use std::sync::Arc;

use cryostore_common::{BucketId, PeerId};
use cryostore_filemeta::EcMetadata;
use cryostore_peer_exchange::PeerTransport;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::instrument;

/// Broadcasts an EC-metadata request to `peers`, bounded to `max_parallel`
/// concurrent requests in flight — the Rust counterpart of `requestMeta`'s
/// `cos.NewLimitedWaitGroup(sys.MaxParallelism(), 8)` fan-out. A peer that
/// errors (unreachable, no metafile) is silently dropped from the result,
/// matching the original's best-effort broadcast.
#[instrument(skip(transport, peers))]
pub async fn discover_metas(
    transport: Arc<dyn PeerTransport>,
    bucket: BucketId,
    key: String,
    peers: &[PeerId],
    max_parallel: usize,
) -> HashMap<PeerId, EcMetadata> {
    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    let mut set = JoinSet::new();

    for peer in peers {
        let transport = transport.clone();
        let bucket = bucket.clone();
        let key = key.clone();
        let peer = peer.clone();
        let semaphore = semaphore.clone();
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
            let result = transport.request_ec_meta(&bucket, &key, &peer).await;
            (peer, result)
        });
    }

    let mut nodes = HashMap::with_capacity(peers.len());
    while let Some(joined) = set.join_next().await {
        let Ok((peer, result)) = joined else { continue };
        if let Ok(md) = result {
            if md.slice_id_in_range() || md.is_copy {
                nodes.insert(peer, md);
            } else {
                tracing::warn!(%peer, "ignoring metafile with out-of-range slice id");
            }
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryostore_peer_exchange::testing::InMemoryTransport;

    fn bucket() -> BucketId {
        BucketId::new("ais", "", "bck")
    }

    #[tokio::test]
    async fn unreachable_peers_are_dropped_not_errored() {
        let transport: Arc<dyn PeerTransport> = Arc::new(InMemoryTransport::new());
        let nodes = discover_metas(transport, bucket(), "obj".to_string(), &["p1".to_string(), "p2".to_string()], 8).await;
        assert!(nodes.is_empty());
    }

    #[tokio::test]
    async fn reachable_peers_with_valid_metadata_are_collected() {
        let in_memory = InMemoryTransport::new();
        in_memory.seed_meta(
            "p1",
            &bucket(),
            "obj",
            EcMetadata {
                generation: 1,
                data: 4,
                parity: 2,
                slice_id: 1,
                ..Default::default()
            },
        );
        let transport: Arc<dyn PeerTransport> = Arc::new(in_memory);
        let nodes = discover_metas(transport, bucket(), "obj".to_string(), &["p1".to_string(), "p2".to_string()], 8).await;
        assert_eq!(nodes.len(), 1);
        assert!(nodes.contains_key("p1"));
    }
}
