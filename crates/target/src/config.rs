use std::collections::HashMap;
use std::time::Duration;

use cryostore_common::BucketId;
use serde::Deserialize;

/// The five operator-facing knobs spec.md §6 names. Loading this from a
/// config file or environment is the out-of-scope collaborator's job (the
/// teacher's `rustfs-config` / CLI layer); this crate only defines the
/// shape and a couple of convenience constructors for tests.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Objects at or above this size are staged to a temp file during
    /// restore/multipart completion instead of held in memory.
    pub to_disk_threshold: u64,
    #[serde(with = "duration_millis")]
    pub timeout_send_file: Duration,
    #[serde(with = "duration_millis")]
    pub timeout_meta: Duration,
    /// Whether metafile and part writes call `fsync` before renaming into
    /// place.
    pub fsync_put: bool,
    /// Per-bucket override for whether erasure coding is enabled; a bucket
    /// absent from the map is treated as EC-disabled.
    pub ec_enabled: HashMap<BucketId, bool>,
}

impl Config {
    pub fn ec_enabled_for(&self, bucket: &BucketId) -> bool {
        self.ec_enabled.get(bucket).copied().unwrap_or(false)
    }

    pub fn stages_to_disk(&self, object_size: u64) -> bool {
        object_size >= self.to_disk_threshold
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            to_disk_threshold: 128 * 1024 * 1024,
            timeout_send_file: Duration::from_secs(30),
            timeout_meta: Duration::from_secs(10),
            fsync_put: false,
            ec_enabled: HashMap::new(),
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_absent_from_map_is_ec_disabled() {
        let config = Config::default();
        assert!(!config.ec_enabled_for(&BucketId::new("ais", "", "bck")));
    }

    #[test]
    fn explicit_true_entry_enables_ec() {
        let mut config = Config::default();
        config.ec_enabled.insert(BucketId::new("ais", "", "bck"), true);
        assert!(config.ec_enabled_for(&BucketId::new("ais", "", "bck")));
    }

    #[test]
    fn stages_to_disk_compares_against_threshold() {
        let config = Config { to_disk_threshold: 1024, ..Config::default() };
        assert!(!config.stages_to_disk(1023));
        assert!(config.stages_to_disk(1024));
    }
}
