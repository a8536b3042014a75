use cryostore_common::{CksumType, PeerId};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One per erasure-coded object, per participating target (spec.md §3 "EC
/// Metadata (Metafile)").
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EcMetadata {
    /// Monotonic per-object version, bumped on every rewrite.
    pub generation: u64,
    /// Original object size in bytes.
    pub size: u64,
    /// Number of data shards (N).
    pub data: u16,
    /// Number of parity shards (M).
    pub parity: u16,
    /// `true` for a replica-only copy; `false` for an encoded shard.
    pub is_copy: bool,
    /// `0` for the main replica, `1..=N+M` for a shard.
    pub slice_id: u16,
    pub cksum_type: CksumType,
    pub cksum_value: String,
    /// Targets participating in this object's redundancy group.
    pub daemons: Vec<PeerId>,
}

impl EcMetadata {
    /// Checks the invariants from spec.md §3: a copy never carries a slice
    /// id or shard counts, and `data`/`parity` must be non-zero for an
    /// encoded object.
    pub fn validate(&self) -> Result<()> {
        if self.is_copy {
            if self.slice_id != 0 {
                return Err(Error::Invalid("copy metadata must have slice_id == 0".into()));
            }
            if self.data != 0 || self.parity != 0 {
                return Err(Error::Invalid("copy metadata must not carry data/parity counts".into()));
            }
        } else if self.data == 0 {
            return Err(Error::Invalid("encoded metadata must have data > 0".into()));
        }
        Ok(())
    }

    pub fn total_shards(&self) -> u16 {
        self.data + self.parity
    }

    /// A metafile whose `SliceID` falls outside `[1, N+M]` is not usable as
    /// a restore source; spec.md §4.5.2 says to warn and ignore such peers.
    pub fn slice_id_in_range(&self) -> bool {
        self.slice_id >= 1 && self.slice_id <= self.total_shards()
    }

    /// Returns a copy with `slice_id`/digest overwritten, used when cloning
    /// a metafile to redistribute a reconstructed shard (spec.md §4.5.2
    /// step 4).
    pub fn clone_for_slice(&self, slice_id: u16, cksum_type: CksumType, cksum_value: impl Into<String>) -> Self {
        let mut md = self.clone();
        md.slice_id = slice_id;
        md.cksum_type = cksum_type;
        md.cksum_value = cksum_value.into();
        md
    }
}
