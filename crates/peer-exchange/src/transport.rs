use async_trait::async_trait;
use cryostore_common::{BucketId, PeerId};
use cryostore_filemeta::EcMetadata;

use crate::error::Result;
use crate::registry::WriterRegistry;

/// The kind of intra-cluster request carried in an [`ObjHeader`], mirroring
/// `getjogger.go`'s `GetOpcode`/`PutOpcode` disambiguation in `IntraBundle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    /// Fetch EC metadata for an object.
    Meta,
    /// Fetch one shard's bytes, streamed into a pre-registered writer.
    Slice,
}

/// The out-of-band header accompanying a slice or metadata request, carried
/// over whatever intra-cluster transport the target runs (HTTP, gRPC, or a
/// test double); this crate only defines the shape peer exchange needs.
#[derive(Clone, Debug)]
pub struct ObjHeader {
    pub bucket: BucketId,
    pub key: String,
    pub kind: RequestKind,
    pub slice_id: u16,
}

/// Abstracts the intra-cluster RPCs `getjogger.go` issues during restore:
/// `requestMeta` (pull a peer's EC metadata), and the registered-writer
/// streaming flow driving `requestSlices`/`sendByDaemonID`. A concrete
/// implementation wires this to the cluster's actual transport; tests use
/// [`crate::testing::InMemoryTransport`].
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Pulls a single peer's EC metafile for `(bucket, key)`.
    async fn request_ec_meta(&self, bucket: &BucketId, key: &str, peer: &PeerId) -> Result<EcMetadata>;

    /// Broadcasts a slice request to `daemons`. Each addressed peer, on
    /// receipt, streams its shard bytes into whatever writer the caller
    /// registered under `(peer, bucket, key)` in `registry` — the caller is
    /// expected to have called [`WriterRegistry::register`] for every peer
    /// in `daemons` before calling this.
    async fn request_slices(&self, daemons: &[PeerId], header: &ObjHeader, registry: &WriterRegistry) -> Result<()>;

    /// Fire-and-forget broadcast (e.g. redistributing a reconstructed
    /// shard); does not wait for a response body.
    async fn send_to_daemons(&self, daemons: &[PeerId], header: &ObjHeader, payload: bytes::Bytes) -> Result<()>;

    /// Pushes a cloned per-shard metafile to `daemons`, alongside (but
    /// separate from) the shard bytes sent via `send_to_daemons` during
    /// redistribution: that RPC carries only payload bytes, so a peer
    /// receiving a redistributed shard needs this one to learn its
    /// `EcMetadata` (generation, slice ID, checksum).
    async fn push_ec_meta(&self, daemons: &[PeerId], bucket: &BucketId, key: &str, md: &EcMetadata) -> Result<()>;
}
