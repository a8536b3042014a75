use std::sync::Arc;

use cryostore_common::{BucketId, ObjectKey, PeerId};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::io::AsyncWrite;

use crate::error::{Error, Result};

/// Anything the peer exchange layer can stream reconstructed slice bytes
/// into: an in-memory segment list or an on-disk file, depending on how the
/// restore path decided to stage the shard.
pub type BoxedSliceWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Clone, Hash, PartialEq, Eq)]
struct WriterKey {
    peer: PeerId,
    bucket: BucketId,
    key: ObjectKey,
}

/// Tracks the writer a caller pre-registered for an inbound slice transfer,
/// keyed by `(peer, bucket, object key)`. A second registration under the
/// same key is rejected rather than silently replacing the first, mirroring
/// `getjogger.go`'s `regWriter`, which refuses a duplicate registration so a
/// slow or duplicate peer response cannot steal another request's writer.
#[derive(Default)]
pub struct WriterRegistry {
    writers: DashMap<WriterKey, Arc<Mutex<BoxedSliceWriter>>>,
}

impl WriterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, peer: PeerId, bucket: BucketId, key: ObjectKey, writer: BoxedSliceWriter) -> Result<()> {
        let k = WriterKey { peer, bucket, key };
        if self.writers.contains_key(&k) {
            return Err(Error::WriterAlreadyRegistered);
        }
        self.writers.insert(k, Arc::new(Mutex::new(writer)));
        Ok(())
    }

    pub fn get(&self, peer: &PeerId, bucket: &BucketId, key: &str) -> Option<Arc<Mutex<BoxedSliceWriter>>> {
        let k = WriterKey {
            peer: peer.clone(),
            bucket: bucket.clone(),
            key: key.to_string(),
        };
        self.writers.get(&k).map(|e| e.value().clone())
    }

    /// Drops the registration, discarding the writer if no data arrived
    /// before a timeout.
    pub fn unregister(&self, peer: &PeerId, bucket: &BucketId, key: &str) {
        let k = WriterKey {
            peer: peer.clone(),
            bucket: bucket.clone(),
            key: key.to_string(),
        };
        self.writers.remove(&k);
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}
