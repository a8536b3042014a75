use std::collections::HashMap;

use bytes::Bytes;
use cryostore_common::{BucketId, CksumType, PeerId};
use cryostore_erasure_coding::Codec;
use cryostore_filemeta::EcMetadata;
use cryostore_peer_exchange::{rendezvous_hash, ObjHeader, PeerTransport, RequestKind, WriterRegistry};

use crate::context::RestoreIoCtx;
use crate::digest::{compute_digest_hex, slice_digest_ok};
use crate::error::{Error, Result};
use crate::persist::persist_restored_object;
use crate::sink::new_staging;

/// Pulls the main replica from a surviving copy-holder, trying peers in
/// turn until one returns a non-empty stream (spec.md §4.5.1: "the first
/// peer that returns a non-empty stream wins"), persists it locally, then
/// redistributes it to any additional peers rendezvous hashing would have
/// chosen but which don't currently hold a copy.
#[allow(clippy::too_many_arguments)]
pub async fn restore_replica(
    transport: &dyn PeerTransport,
    registry: &WriterRegistry,
    bucket: &BucketId,
    key: &str,
    meta: &EcMetadata,
    nodes: &HashMap<PeerId, EcMetadata>,
    all_known_peers: &[PeerId],
    desired_copies: usize,
    io: &RestoreIoCtx<'_>,
) -> Result<Bytes> {
    let header = ObjHeader {
        bucket: bucket.clone(),
        key: key.to_string(),
        kind: RequestKind::Slice,
        slice_id: 0,
    };

    let mut fetched = None;
    for peer in nodes.keys() {
        let staging = new_staging(io.stage_to_disk, io.workdir.join("ec-restore-repl"));
        registry.register(peer.clone(), bucket.clone(), key.to_string(), staging.writer().await?)?;
        transport.request_slices(std::slice::from_ref(peer), &header, registry).await?;
        registry.unregister(peer, bucket, key);

        let candidate = staging.into_bytes().await?;
        if !candidate.is_empty() {
            fetched = Some(candidate);
            break;
        }
    }
    let bytes = fetched.ok_or(Error::ReplicaUnavailable)?;

    persist_restored_object(
        io.metadata_store,
        io.object_path,
        io.metafile_path,
        io.bucket_name,
        &bytes,
        meta,
        io.fsync,
        io.bucket_exists,
    )
    .await?;

    let missing: Vec<PeerId> = rendezvous_hash(all_known_peers, key, desired_copies)
        .into_iter()
        .filter(|p| !nodes.contains_key(p))
        .collect();
    if !missing.is_empty() {
        transport.send_to_daemons(&missing, &header, bytes.clone()).await?;
    }

    Ok(bytes)
}

/// Fetches one shard per slice id from the peer that reports holding it,
/// verifying each against its declared digest and discarding mismatches as
/// though the shard were missing (spec.md §4.5.2 step 2), reconstructs the
/// remaining missing shards via erasure coding, persists the reassembled
/// object, and redistributes the reconstructed-but-undistributed shards to
/// the cluster's rendezvous-hashed target set.
#[allow(clippy::too_many_arguments)]
pub async fn restore_encoded(
    transport: &dyn PeerTransport,
    registry: &WriterRegistry,
    codec: &Codec,
    bucket: &BucketId,
    key: &str,
    meta: &EcMetadata,
    nodes: &HashMap<PeerId, EcMetadata>,
    all_known_peers: &[PeerId],
    io: &RestoreIoCtx<'_>,
) -> Result<Bytes> {
    let total = codec.total_shards();
    let shard_size = codec.shard_size(meta.size) as usize;
    let mut shards: Vec<Option<Vec<u8>>> = vec![None; total];

    let mut by_slice: HashMap<u16, &PeerId> = HashMap::new();
    for (peer, md) in nodes {
        if md.slice_id >= 1 {
            by_slice.entry(md.slice_id).or_insert(peer);
        }
    }

    for (slice_id, peer) in &by_slice {
        let staging = new_staging(io.stage_to_disk, io.workdir.join(format!("ec-restore-{slice_id}")));
        registry.register((*peer).clone(), bucket.clone(), key.to_string(), staging.writer().await?)?;
        let header = ObjHeader {
            bucket: bucket.clone(),
            key: key.to_string(),
            kind: RequestKind::Slice,
            slice_id: *slice_id,
        };
        transport.request_slices(std::slice::from_ref(*peer), &header, registry).await?;
        registry.unregister(peer, bucket, key);

        let bytes = staging.into_bytes().await?;
        if bytes.is_empty() {
            continue;
        }

        let owner = nodes.get(*peer).expect("by_slice only holds peers present in nodes");
        if slice_digest_ok(&bytes, owner.cksum_type, &owner.cksum_value) {
            shards[(*slice_id - 1) as usize] = Some(bytes.to_vec());
        } else {
            tracing::warn!(peer = %peer, slice_id, "slice digest mismatch, treating as missing");
        }
    }

    codec.reconstruct(&mut shards, shard_size)?;

    let mut assembled = Vec::with_capacity(codec.data_shards() * shard_size);
    for shard in shards.iter().take(codec.data_shards()) {
        let shard = shard.as_ref().ok_or(Error::TooFewSlices {
            have: by_slice.len(),
            need: codec.data_shards(),
        })?;
        assembled.extend_from_slice(shard);
    }
    assembled.truncate(meta.size as usize);
    let assembled = Bytes::from(assembled);

    let content_digest = compute_digest_hex(&assembled, meta.cksum_type).unwrap_or_default();
    let main_md = meta.clone_for_slice(0, meta.cksum_type, content_digest);
    persist_restored_object(
        io.metadata_store,
        io.object_path,
        io.metafile_path,
        io.bucket_name,
        &assembled,
        &main_md,
        io.fsync,
        io.bucket_exists,
    )
    .await?;

    // Redistribution target set: rendezvous_hash(N+M+1) over every known
    // peer, minus peers that already hold a slice, computed once. Pair
    // remaining targets with shards this restore reconstructed (rather than
    // fetched) in slice-index order.
    let target_set: Vec<PeerId> = rendezvous_hash(all_known_peers, key, total + 1)
        .into_iter()
        .filter(|p| !nodes.contains_key(p))
        .collect();

    let reconstructed: Vec<(u16, Vec<u8>)> = (0..total)
        .filter(|idx| !by_slice.contains_key(&(*idx as u16 + 1)))
        .filter_map(|idx| shards[idx].clone().map(|bytes| (idx as u16 + 1, bytes)))
        .collect();

    for (target, (slice_id, bytes)) in target_set.into_iter().zip(reconstructed) {
        let bytes = Bytes::from(bytes);
        let digest = compute_digest_hex(&bytes, meta.cksum_type).unwrap_or_default();
        let shard_md = meta.clone_for_slice(slice_id, meta.cksum_type, digest);
        let header = ObjHeader {
            bucket: bucket.clone(),
            key: key.to_string(),
            kind: RequestKind::Slice,
            slice_id,
        };
        transport.push_ec_meta(std::slice::from_ref(&target), bucket, key, &shard_md).await?;
        transport.send_to_daemons(std::slice::from_ref(&target), &header, bytes).await?;
    }

    Ok(assembled)
}
