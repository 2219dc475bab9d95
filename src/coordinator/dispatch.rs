//! Scheduling dispatch for region heartbeats
//!
//! The scheduling policy itself lives outside this crate. The dispatcher
//! seam lets the heartbeat path hand a validated region to whatever
//! scheduler is plugged in and relay its instructions back to the store.

use crate::common::Result;
use crate::coordinator::cache::RegionCache;
use crate::coordinator::region::Region;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Instruction for the leader of a region
///
/// Produced by scheduler implementations of [`Dispatcher`]; the built-in
/// [`CacheDispatcher`] never issues any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleCommand {
    AddPeer { store_id: u64 },
    RemovePeer { peer_id: u64 },
    TransferLeader { peer_id: u64 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    #[serde(default)]
    pub commands: Vec<ScheduleCommand>,
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, region: &Region) -> Result<HeartbeatResponse>;
}

/// Keeps the region cache in sync with heartbeats and issues no commands.
pub struct CacheDispatcher {
    cache: Arc<RegionCache>,
}

impl CacheDispatcher {
    pub fn new(cache: Arc<RegionCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Dispatcher for CacheDispatcher {
    async fn dispatch(&self, region: &Region) -> Result<HeartbeatResponse> {
        let cached = self.cache.get(region.id);
        let stale = cached
            .as_ref()
            .map(|cached| region.epoch().is_stale(&cached.epoch()))
            .unwrap_or(false);

        if stale {
            tracing::debug!("Ignoring heartbeat with stale epoch: {}", region);
        } else if cached.as_ref() != Some(region) {
            let evicted = self.cache.put_region(region.clone());
            tracing::debug!("Region cache updated: {} ({} evicted)", region, evicted.len());
        }

        Ok(HeartbeatResponse::default())
    }
}
