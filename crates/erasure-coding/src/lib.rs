//! Streaming Reed-Solomon shard reconstruction over N data + M parity
//! shards (spec.md §4.1 "Slice Codec").
//!
//! Wraps `reed-solomon-simd`, the crate the teacher (`rustfs-ecstore`)
//! depends on for the same purpose. The codec itself works a chunk at a
//! time so callers can bound memory use by choosing a chunk size instead of
//! materializing whole shards; `cryostore-restore` is the caller that drives
//! the chunk loop against workfiles or segment lists.

mod error;

pub use error::{Error, Result};

use reed_solomon_simd::ReedSolomonDecoder;

/// A fixed `(data, parity)` Reed-Solomon configuration.
#[derive(Clone, Copy, Debug)]
pub struct Codec {
    data: usize,
    parity: usize,
}

impl Codec {
    pub fn new(data: usize, parity: usize) -> Result<Self> {
        if data == 0 {
            return Err(Error::InvalidConfig("data shard count must be >= 1".into()));
        }
        if data + parity > 65536 {
            return Err(Error::InvalidConfig("data + parity exceeds supported shard count".into()));
        }
        Ok(Self { data, parity })
    }

    pub fn data_shards(&self) -> usize {
        self.data
    }

    pub fn parity_shards(&self) -> usize {
        self.parity
    }

    pub fn total_shards(&self) -> usize {
        self.data + self.parity
    }

    /// `ceil(object_size / data)`: per-shard byte length, the same for every
    /// shard including the (zero-padded) last data shard.
    pub fn shard_size(&self, object_size: u64) -> u64 {
        object_size.div_ceil(self.data as u64)
    }

    /// Reconstruct the `None` entries of `shards` in place. Every present
    /// entry must be exactly `shard_size` bytes. Returns
    /// `Error::TooFewShards` if fewer than `data` entries are present.
    ///
    /// Operates on one chunk's worth of shard data at a time: callers with a
    /// large object drive this in a loop over successive byte ranges of
    /// their backing workfiles/segment lists rather than handing the whole
    /// shard to a single call, which is how the memory-bounding requirement
    /// in spec.md §4.1 is satisfied without the underlying codec crate
    /// exposing a push/pull streaming API of its own.
    pub fn reconstruct(&self, shards: &mut [Option<Vec<u8>>], shard_size: usize) -> Result<()> {
        if shards.len() != self.total_shards() {
            return Err(Error::InvalidConfig(format!(
                "expected {} shards, got {}",
                self.total_shards(),
                shards.len()
            )));
        }
        let present = shards.iter().filter(|s| s.is_some()).count();
        if present < self.data {
            return Err(Error::TooFewShards {
                have: present,
                need: self.data,
            });
        }
        if present == shards.len() {
            // Nothing missing.
            return Ok(());
        }

        let mut decoder = ReedSolomonDecoder::new(self.data, self.parity, shard_size)
            .map_err(|e| Error::Codec(e.to_string()))?;
        for (idx, shard) in shards.iter().enumerate() {
            if let Some(bytes) = shard {
                if bytes.len() != shard_size {
                    return Err(Error::InvalidConfig(format!(
                        "shard {idx} has length {}, expected {shard_size}",
                        bytes.len()
                    )));
                }
                if idx < self.data {
                    decoder
                        .add_original_shard(idx, bytes)
                        .map_err(|e| Error::Codec(e.to_string()))?;
                } else {
                    decoder
                        .add_recovery_shard(idx - self.data, bytes)
                        .map_err(|e| Error::Codec(e.to_string()))?;
                }
            }
        }

        let result = decoder.decode().map_err(|e| Error::Codec(e.to_string()))?;
        for (idx, restored) in result.restored_original_iter() {
            shards[idx] = Some(restored.to_vec());
        }
        for idx in 0..self.data {
            if shards[idx].is_none() {
                return Err(Error::Codec(format!("decoder did not restore shard {idx}")));
            }
        }
        // The decoder only restores originals. If a parity shard is also
        // missing, re-derive it by re-encoding from the now-complete data
        // shards (needed so redistribution has bytes for every lost slice,
        // data or parity, per spec.md §4.5.2 step 4).
        if shards[self.data..].iter().any(Option::is_none) {
            let mut encoder = reed_solomon_simd::ReedSolomonEncoder::new(self.data, self.parity, shard_size)
                .map_err(|e| Error::Codec(e.to_string()))?;
            for idx in 0..self.data {
                encoder
                    .add_original_shard(shards[idx].as_ref().expect("data shard restored above"))
                    .map_err(|e| Error::Codec(e.to_string()))?;
            }
            let encoded = encoder.encode().map_err(|e| Error::Codec(e.to_string()))?;
            for (idx, recovery) in encoded.recovery_iter().enumerate() {
                let slot = self.data + idx;
                if shards[slot].is_none() {
                    shards[slot] = Some(recovery.to_vec());
                }
            }
        }
        Ok(())
    }
}
