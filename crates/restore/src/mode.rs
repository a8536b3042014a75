use std::collections::HashMap;

use cryostore_common::PeerId;
use cryostore_filemeta::EcMetadata;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreMode {
    Replica,
    Encoded,
}

/// Picks the metadata with the highest `generation` among everything
/// discovered, the Rust counterpart of `ctx.requestMeta`'s "detect the
/// metadata with the latest generation on the fly".
pub fn latest_generation(nodes: &HashMap<PeerId, EcMetadata>) -> Option<EcMetadata> {
    nodes.values().max_by_key(|md| md.generation).cloned()
}

/// Drops every node whose reported generation doesn't match `generation` —
/// `requestMeta`'s "cleanup: delete all metadata with obsolete information".
pub fn drop_stale_generations(nodes: &mut HashMap<PeerId, EcMetadata>, generation: u64) {
    nodes.retain(|_, md| md.generation == generation);
}

/// Decides replica-vs-encoded restore and validates there are enough
/// surviving shards, mirroring `getJogger.restore`'s dispatch.
pub fn decide(meta: &EcMetadata, surviving_nodes: usize) -> Result<RestoreMode> {
    if meta.is_copy {
        return Ok(RestoreMode::Replica);
    }
    if surviving_nodes < meta.data as usize {
        return Err(Error::TooFewSlices {
            have: surviving_nodes,
            need: meta.data as usize,
        });
    }
    Ok(RestoreMode::Encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md(generation: u64, is_copy: bool) -> EcMetadata {
        EcMetadata {
            generation,
            is_copy,
            data: 4,
            parity: 2,
            ..Default::default()
        }
    }

    #[test]
    fn latest_generation_picks_the_highest() {
        let mut nodes = HashMap::new();
        nodes.insert("p1".to_string(), md(1, false));
        nodes.insert("p2".to_string(), md(3, false));
        nodes.insert("p3".to_string(), md(2, false));
        assert_eq!(latest_generation(&nodes).unwrap().generation, 3);
    }

    #[test]
    fn stale_generations_are_dropped() {
        let mut nodes = HashMap::new();
        nodes.insert("p1".to_string(), md(1, false));
        nodes.insert("p2".to_string(), md(3, false));
        drop_stale_generations(&mut nodes, 3);
        assert_eq!(nodes.len(), 1);
        assert!(nodes.contains_key("p2"));
    }

    #[test]
    fn copy_metadata_selects_replica_mode() {
        assert_eq!(decide(&md(1, true), 1).unwrap(), RestoreMode::Replica);
    }

    #[test]
    fn too_few_surviving_shards_is_rejected() {
        let err = decide(&md(1, false), 2).unwrap_err();
        assert!(matches!(err, Error::TooFewSlices { have: 2, need: 4 }));
    }

    #[test]
    fn enough_surviving_shards_selects_encoded_mode() {
        assert_eq!(decide(&md(1, false), 4).unwrap(), RestoreMode::Encoded);
    }
}
