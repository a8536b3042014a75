//! Digest computation and verification for fetched slices/replicas,
//! reusing the md5/sha2/hex-simd idiom already established for composite
//! ETags and metadata checksums elsewhere in the workspace.

use bytes::Bytes;
use cryostore_common::CksumType;
use md5::{Digest as _, Md5};
use sha2::Sha256;

/// Computes the hex digest of `bytes` under `cksum_type`. `None`/`Xxh3`
/// return `None`: there is nothing to compute for `None`, and xxhash falls
/// outside this workspace's dependency set (the same substitution
/// `rendezvous_hash` makes), so an `Xxh3`-typed value is treated as
/// unverifiable rather than mismatched.
pub fn compute_digest_hex(bytes: &[u8], cksum_type: CksumType) -> Option<String> {
    match cksum_type {
        CksumType::Md5 => {
            let mut hasher = Md5::new();
            hasher.update(bytes);
            Some(hex_simd::encode_to_string(hasher.finalize(), hex_simd::AsciiCase::Lower))
        }
        CksumType::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            Some(hex_simd::encode_to_string(hasher.finalize(), hex_simd::AsciiCase::Lower))
        }
        CksumType::None | CksumType::Xxh3 => None,
    }
}

/// Checks a received slice or replica against its owning peer's declared
/// metafile digest (spec.md §4.5.2 step 2: "treat digest-mismatched slices
/// as missing"). A blank declared digest, or a declared-but-unverifiable
/// checksum type, is trusted; anything else must match exactly.
pub fn slice_digest_ok(bytes: &Bytes, cksum_type: CksumType, cksum_value: &str) -> bool {
    if cksum_value.is_empty() {
        return true;
    }
    match compute_digest_hex(bytes, cksum_type) {
        Some(computed) => computed == cksum_value,
        None => true,
    }
}
