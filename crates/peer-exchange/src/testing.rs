//! An in-process [`PeerTransport`] double, standing in for real intra-cluster
//! RPC in tests: peers are just keys into in-memory maps, and "sending" a
//! slice writes its bytes directly into the registered writer.

use std::collections::HashMap;

use async_trait::async_trait;
use cryostore_common::{BucketId, PeerId};
use cryostore_filemeta::EcMetadata;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::registry::WriterRegistry;
use crate::transport::{ObjHeader, PeerTransport, RequestKind};

type ObjectKeyTuple = (String, String, String);

#[derive(Default)]
struct PeerState {
    metas: HashMap<ObjectKeyTuple, EcMetadata>,
    slices: HashMap<(ObjectKeyTuple, u16), bytes::Bytes>,
}

/// Test double holding, per peer, the EC metadata and shard bytes that peer
/// would serve if asked.
#[derive(Default)]
pub struct InMemoryTransport {
    peers: Mutex<HashMap<PeerId, PeerState>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn tuple(bucket: &BucketId, key: &str) -> ObjectKeyTuple {
        (bucket.provider.clone(), bucket.namespace.clone(), format!("{}/{key}", bucket.name))
    }

    pub fn seed_meta(&self, peer: &str, bucket: &BucketId, key: &str, md: EcMetadata) {
        let mut peers = self.peers.lock();
        peers.entry(peer.to_string()).or_default().metas.insert(Self::tuple(bucket, key), md);
    }

    pub fn seed_slice(&self, peer: &str, bucket: &BucketId, key: &str, slice_id: u16, bytes: bytes::Bytes) {
        let mut peers = self.peers.lock();
        peers
            .entry(peer.to_string())
            .or_default()
            .slices
            .insert((Self::tuple(bucket, key), slice_id), bytes);
    }
}

#[async_trait]
impl PeerTransport for InMemoryTransport {
    async fn request_ec_meta(&self, bucket: &BucketId, key: &str, peer: &PeerId) -> Result<EcMetadata> {
        let peers = self.peers.lock();
        peers
            .get(peer)
            .and_then(|p| p.metas.get(&Self::tuple(bucket, key)))
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn request_slices(&self, daemons: &[PeerId], header: &ObjHeader, registry: &WriterRegistry) -> Result<()> {
        assert_eq!(header.kind, RequestKind::Slice, "request_slices called with a non-slice header");
        for peer in daemons {
            let bytes = {
                let peers = self.peers.lock();
                peers
                    .get(peer)
                    .and_then(|p| p.slices.get(&(Self::tuple(&header.bucket, &header.key), header.slice_id)))
                    .cloned()
            };
            let Some(bytes) = bytes else {
                continue;
            };
            let Some(writer) = registry.get(peer, &header.bucket, &header.key) else {
                continue;
            };
            let mut w = writer.lock();
            w.write_all(&bytes).await.map_err(|e| Error::Io(e.to_string()))?;
            w.flush().await.map_err(|e| Error::Io(e.to_string()))?;
        }
        Ok(())
    }

    async fn send_to_daemons(&self, _daemons: &[PeerId], _header: &ObjHeader, _payload: bytes::Bytes) -> Result<()> {
        Ok(())
    }

    async fn push_ec_meta(&self, daemons: &[PeerId], bucket: &BucketId, key: &str, md: &EcMetadata) -> Result<()> {
        let mut peers = self.peers.lock();
        for peer in daemons {
            peers.entry(peer.clone()).or_default().metas.insert(Self::tuple(bucket, key), md.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use tokio::io::AsyncWrite;

    use super::*;

    fn bucket() -> BucketId {
        BucketId::new("ais", "", "bck")
    }

    /// Shares its backing buffer with the test so the written bytes can be
    /// inspected after the writer has been handed off to the registry.
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl AsyncWrite for SharedSink {
        fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
            self.0.lock().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn request_slices_writes_seeded_bytes_into_registered_writer() {
        let transport = InMemoryTransport::new();
        transport.seed_slice("peer-a", &bucket(), "obj", 1, bytes::Bytes::from_static(b"shard-bytes"));

        let registry = WriterRegistry::new();
        let backing = Arc::new(Mutex::new(Vec::new()));
        registry
            .register("peer-a".to_string(), bucket(), "obj".to_string(), Box::new(SharedSink(backing.clone())))
            .unwrap();

        let header = ObjHeader {
            bucket: bucket(),
            key: "obj".to_string(),
            kind: RequestKind::Slice,
            slice_id: 1,
        };
        transport
            .request_slices(&["peer-a".to_string()], &header, &registry)
            .await
            .unwrap();

        assert_eq!(&*backing.lock(), b"shard-bytes");
    }

    #[tokio::test]
    async fn push_ec_meta_is_visible_to_a_later_request_ec_meta() {
        let transport = InMemoryTransport::new();
        let md = EcMetadata {
            generation: 1,
            data: 2,
            parity: 1,
            slice_id: 3,
            ..Default::default()
        };

        transport
            .push_ec_meta(&["peer-c".to_string()], &bucket(), "obj", &md)
            .await
            .unwrap();

        let fetched = transport.request_ec_meta(&bucket(), "obj", &"peer-c".to_string()).await.unwrap();
        assert_eq!(fetched.slice_id, 3);
    }

    #[tokio::test]
    async fn missing_peer_metadata_is_not_found() {
        let transport = InMemoryTransport::new();
        let err = transport
            .request_ec_meta(&bucket(), "obj", &"peer-a".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }
}
