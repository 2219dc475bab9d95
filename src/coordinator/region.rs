//! Region metadata
//!
//! A region is a contiguous `[start_key, end_key)` slice of the keyspace,
//! replicated across a set of peers. An empty `end_key` means the region
//! is unbounded above.

use crate::common::format_key;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version stamp of a region.
///
/// `version` grows on every range change (split, merge), `conf_ver` on
/// every membership change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionEpoch {
    pub conf_ver: u64,
    pub version: u64,
}

impl RegionEpoch {
    pub fn new(version: u64, conf_ver: u64) -> Self {
        Self { conf_ver, version }
    }

    /// True when `self` lags `current` in either dimension.
    pub fn is_stale(&self, current: &RegionEpoch) -> bool {
        is_stale(self, current)
    }
}

impl fmt::Display for RegionEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conf_ver: {}, version: {}", self.conf_ver, self.version)
    }
}

/// Returns true iff `request` is behind `current` on either dimension.
pub fn is_stale(request: &RegionEpoch, current: &RegionEpoch) -> bool {
    request.version < current.version || request.conf_ver < current.conf_ver
}

/// A single replica of a region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    pub id: u64,
    pub store_id: u64,
}

impl Peer {
    pub fn new(id: u64, store_id: u64) -> Self {
        Self { id, store_id }
    }
}

/// Region descriptor as reported by storage nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: u64,
    #[serde(with = "hex_key", default)]
    pub start_key: Vec<u8>,
    #[serde(with = "hex_key", default)]
    pub end_key: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_epoch: Option<RegionEpoch>,
    #[serde(default)]
    pub peers: Vec<Peer>,
}

impl Region {
    pub fn new(
        id: u64,
        start_key: Vec<u8>,
        end_key: Vec<u8>,
        epoch: RegionEpoch,
        peers: Vec<Peer>,
    ) -> Self {
        Self {
            id,
            start_key,
            end_key,
            region_epoch: Some(epoch),
            peers,
        }
    }

    /// Epoch of the region; a missing epoch reads as `0/0`.
    pub fn epoch(&self) -> RegionEpoch {
        self.region_epoch.unwrap_or_default()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start_key.as_slice()
            && (self.end_key.is_empty() || key < self.end_key.as_slice())
    }

    /// Whether `[start, end)` of the two regions intersect.
    pub fn overlaps(&self, other: &Region) -> bool {
        let starts_before_other_ends =
            other.end_key.is_empty() || self.start_key < other.end_key;
        let other_starts_before_end =
            self.end_key.is_empty() || other.start_key < self.end_key;
        starts_before_other_ends && other_starts_before_end
    }

    /// Human-readable `[start, end)` range with hex keys.
    pub fn range_display(&self) -> String {
        let end = if self.end_key.is_empty() {
            "+inf".to_string()
        } else {
            format_key(&self.end_key)
        };
        format!("[{}, {})", format_key(&self.start_key), end)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "region {} {} epoch {{{}}} peers {}",
            self.id,
            self.range_display(),
            self.epoch(),
            self.peers.len()
        )
    }
}

/// Serializes keys as lowercase hex strings.
pub(crate) mod hex_key {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(key))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}
