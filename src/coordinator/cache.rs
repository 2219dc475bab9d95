//! In-memory region directory
//!
//! Regions are indexed by start key so the owner of any key is found with a
//! single range query. The cache is fed by heartbeats and read by the split
//! handshake.

use crate::common::{format_key, Error, Result};
use crate::coordinator::region::Region;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

/// Authoritative lookup of the region owning a key.
#[async_trait]
pub trait RegionDirectory: Send + Sync {
    async fn lookup(&self, key: &[u8]) -> Result<Region>;
}

#[derive(Debug, Default)]
struct Index {
    /// start_key -> region
    by_start: BTreeMap<Vec<u8>, Region>,
    /// region id -> start_key
    by_id: HashMap<u64, Vec<u8>>,
}

impl Index {
    fn remove(&mut self, start_key: &[u8]) -> Option<Region> {
        let region = self.by_start.remove(start_key)?;
        self.by_id.remove(&region.id);
        Some(region)
    }

    /// Start keys of cached regions intersecting `region`.
    ///
    /// Only the entry just before `region.start_key` and the entries
    /// starting inside `region` are visited.
    fn overlapping(&self, region: &Region) -> Vec<Vec<u8>> {
        let start = region.start_key.as_slice();
        let mut keys = Vec::new();

        if let Some((key, prev)) = self
            .by_start
            .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(start)))
            .next_back()
        {
            if prev.overlaps(region) {
                keys.push(key.clone());
            }
        }

        let end = region.end_key.as_slice();
        let upper = if end.is_empty() {
            Bound::Unbounded
        } else if end <= start {
            // Inverted or empty range, nothing can start inside it
            return keys;
        } else {
            Bound::Excluded(end)
        };
        keys.extend(
            self.by_start
                .range::<[u8], _>((Bound::Included(start), upper))
                .map(|(key, _)| key.clone()),
        );
        keys
    }
}

/// Ordered, gap-tolerant index of the regions known to this node.
#[derive(Debug, Default)]
pub struct RegionCache {
    inner: RwLock<Index>,
}

impl RegionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Region whose `[start, end)` contains `key`, if cached.
    pub fn search(&self, key: &[u8]) -> Option<Region> {
        let index = self.inner.read();
        index
            .by_start
            .range::<[u8], _>((Bound::Unbounded, Bound::Included(key)))
            .next_back()
            .map(|(_, region)| region)
            .filter(|region| region.contains(key))
            .cloned()
    }

    pub fn get(&self, region_id: u64) -> Option<Region> {
        let index = self.inner.read();
        index
            .by_id
            .get(&region_id)
            .and_then(|start| index.by_start.get(start))
            .cloned()
    }

    /// Insert or replace `region`.
    ///
    /// Cached regions overlapping the new range are dropped, as is an older
    /// copy of the same region id. Returns the dropped regions.
    pub fn put_region(&self, region: Region) -> Vec<Region> {
        let mut index = self.inner.write();
        let mut removed = Vec::new();

        if let Some(old_start) = index.by_id.get(&region.id).cloned() {
            if let Some(old) = index.remove(&old_start) {
                removed.push(old);
            }
        }

        for start in index.overlapping(&region) {
            if let Some(old) = index.remove(&start) {
                tracing::debug!("Region {} evicted by overlapping region {}", old.id, region.id);
                removed.push(old);
            }
        }

        index.by_id.insert(region.id, region.start_key.clone());
        index.by_start.insert(region.start_key.clone(), region);
        removed
    }

    pub fn remove_region(&self, region_id: u64) -> Option<Region> {
        let mut index = self.inner.write();
        let start = index.by_id.get(&region_id).cloned()?;
        index.remove(&start)
    }

    /// All cached regions in key order.
    pub fn regions(&self) -> Vec<Region> {
        self.inner.read().by_start.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RegionDirectory for RegionCache {
    async fn lookup(&self, key: &[u8]) -> Result<Region> {
        self.search(key)
            .ok_or_else(|| Error::RegionNotFound(format_key(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::region::{Peer, RegionEpoch};

    fn region(id: u64, start: &str, end: &str) -> Region {
        Region::new(
            id,
            start.as_bytes().to_vec(),
            end.as_bytes().to_vec(),
            RegionEpoch::new(1, 1),
            vec![Peer::new(id * 10, 1)],
        )
    }

    #[test]
    fn test_search() {
        let cache = RegionCache::new();
        cache.put_region(region(1, "", "g"));
        cache.put_region(region(2, "g", "p"));
        cache.put_region(region(3, "p", ""));

        assert_eq!(cache.search(b"").unwrap().id, 1);
        assert_eq!(cache.search(b"a").unwrap().id, 1);
        assert_eq!(cache.search(b"g").unwrap().id, 2);
        assert_eq!(cache.search(b"ozzz").unwrap().id, 2);
        assert_eq!(cache.search(b"p").unwrap().id, 3);
        assert_eq!(cache.search(b"\xff\xff").unwrap().id, 3);
    }

    #[test]
    fn test_search_hole() {
        let cache = RegionCache::new();
        cache.put_region(region(1, "a", "c"));
        cache.put_region(region(2, "x", ""));

        assert!(cache.search(b"0").is_none());
        assert!(cache.search(b"m").is_none());
        assert_eq!(cache.search(b"b").unwrap().id, 1);
    }

    #[test]
    fn test_put_split_halves_replace_origin() {
        let cache = RegionCache::new();
        cache.put_region(region(1, "a", ""));

        let mut left = region(1, "a", "m");
        left.region_epoch = Some(RegionEpoch::new(2, 1));
        let right = region(7, "m", "");

        let removed = cache.put_region(left);
        assert_eq!(removed.len(), 1);
        cache.put_region(right);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.search(b"b").unwrap().epoch().version, 2);
        assert_eq!(cache.search(b"z").unwrap().id, 7);
    }

    #[test]
    fn test_put_merged_region_evicts_overlaps() {
        let cache = RegionCache::new();
        cache.put_region(region(1, "a", "m"));
        cache.put_region(region(2, "m", "t"));
        cache.put_region(region(3, "t", ""));

        let removed = cache.put_region(region(4, "b", "u"));
        let mut ids: Vec<u64> = removed.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(2).is_none());
        assert_eq!(cache.get(4).unwrap().start_key, b"b".to_vec());
    }

    #[test]
    fn test_put_evicts_predecessor_reaching_into_range() {
        let cache = RegionCache::new();
        cache.put_region(region(1, "a", "f"));
        cache.put_region(region(2, "f", "k"));
        cache.put_region(region(3, "k", "p"));
        cache.put_region(region(4, "p", ""));

        let removed = cache.put_region(region(5, "d", "k"));
        let mut ids: Vec<u64> = removed.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(cache.search(b"k").unwrap().id, 3);
        assert_eq!(cache.search(b"e").unwrap().id, 5);
        assert!(cache.search(b"b").is_none());
    }

    #[test]
    fn test_put_adjacent_regions_keep_neighbours() {
        let cache = RegionCache::new();
        cache.put_region(region(1, "a", "f"));
        cache.put_region(region(3, "k", ""));

        assert!(cache.put_region(region(2, "f", "k")).is_empty());
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_put_inverted_range_does_not_panic() {
        let cache = RegionCache::new();
        cache.put_region(region(1, "a", "f"));
        cache.put_region(region(2, "m", "p"));

        let removed = cache.put_region(region(3, "n", "c"));
        assert!(removed.is_empty());
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_remove_region() {
        let cache = RegionCache::new();
        cache.put_region(region(1, "a", "m"));
        assert_eq!(cache.remove_region(1).unwrap().id, 1);
        assert!(cache.remove_region(1).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let cache = RegionCache::new();
        let err = cache.lookup(b"k").await.unwrap_err();
        assert!(matches!(err, Error::RegionNotFound(_)));
    }
}
