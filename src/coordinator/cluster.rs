//! Region heartbeat and split coordination
//!
//! [`Cluster`] is the entry point storage nodes talk to:
//! - `handle_region_heartbeat` gatekeeps a region report and hands it to
//!   the scheduling dispatcher
//! - `handle_ask_split` reserves ids for a split the store is about to run
//! - `handle_report_split` validates a finished split and records it
//!
//! Everything stateful sits behind an injected capability, so the cluster
//! itself holds no region state and needs no locking.

use crate::common::{format_key, Error, Result, METRICS};
use crate::coordinator::alloc::IdAllocator;
use crate::coordinator::cache::RegionDirectory;
use crate::coordinator::dispatch::{Dispatcher, HeartbeatResponse};
use crate::coordinator::event::{EventNotifier, OperatorEventKind};
use crate::coordinator::history::OperatorHistory;
use crate::coordinator::region::Region;
use crate::coordinator::split::{origin_region, validate_split, SplitOperator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_ALLOC_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskSplitRequest {
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskSplitResponse {
    pub new_region_id: u64,
    /// One id per peer of the requested region, in peer order
    pub new_peer_ids: Vec<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSplitRequest {
    #[serde(default)]
    pub left: Option<Region>,
    #[serde(default)]
    pub right: Option<Region>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSplitResponse {}

pub struct Cluster {
    id_alloc: Arc<dyn IdAllocator>,
    regions: Arc<dyn RegionDirectory>,
    histories: Arc<dyn OperatorHistory>,
    notifier: Arc<dyn EventNotifier>,
    dispatcher: Arc<dyn Dispatcher>,
    lookup_timeout: Duration,
    alloc_timeout: Duration,
}

impl Cluster {
    pub fn new(
        id_alloc: Arc<dyn IdAllocator>,
        regions: Arc<dyn RegionDirectory>,
        histories: Arc<dyn OperatorHistory>,
        notifier: Arc<dyn EventNotifier>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            id_alloc,
            regions,
            histories,
            notifier,
            dispatcher,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            alloc_timeout: DEFAULT_ALLOC_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, lookup_timeout: Duration, alloc_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self.alloc_timeout = alloc_timeout;
        self
    }

    pub fn histories(&self) -> &Arc<dyn OperatorHistory> {
        &self.histories
    }

    /// Reject malformed region reports, forward the rest to the scheduler.
    pub async fn handle_region_heartbeat(&self, region: &Region) -> Result<HeartbeatResponse> {
        METRICS.heartbeats_total.inc();

        if region.peers.is_empty() {
            METRICS.heartbeats_rejected.inc();
            tracing::warn!("invalid region, zero region peer count - {}", region);
            return Err(Error::InvalidRegion {
                region_id: region.id,
                reason: "zero region peer count".to_string(),
            });
        }

        self.dispatcher.dispatch(region).await
    }

    /// Reserve a region id and one peer id per replica for an upcoming split.
    ///
    /// Nothing is persisted here; ids of a split that is never reported are
    /// simply abandoned.
    pub async fn handle_ask_split(&self, request: &AskSplitRequest) -> Result<AskSplitResponse> {
        METRICS.ask_split_total.inc();

        let req_region = &request.region;
        let current = self.lookup_region(&req_region.start_key).await?;

        let req_epoch = req_region.epoch();
        let epoch = current.epoch();
        if req_epoch.is_stale(&epoch) {
            METRICS.ask_split_stale.inc();
            tracing::warn!(
                "ask split with stale epoch for region {}, request: {{{}}}, current: {{{}}}",
                current.id,
                req_epoch,
                epoch
            );
            return Err(Error::StaleEpoch {
                request: req_epoch,
                current: epoch,
            });
        }

        let new_region_id = self.alloc_id().await?;
        let mut new_peer_ids = Vec::with_capacity(req_region.peers.len());
        for _ in &req_region.peers {
            new_peer_ids.push(self.alloc_id().await?);
        }

        METRICS.ids_allocated.add(1 + new_peer_ids.len() as u64);
        tracing::debug!(
            "ask split region {}: new region {}, new peers {:?}",
            current.id,
            new_region_id,
            new_peer_ids
        );

        Ok(AskSplitResponse {
            new_region_id,
            new_peer_ids,
        })
    }

    /// Validate a split the store already executed and record it.
    pub async fn handle_report_split(
        &self,
        request: &ReportSplitRequest,
    ) -> Result<ReportSplitResponse> {
        METRICS.report_split_total.inc();

        let (left, right) = match validate_split(request.left.as_ref(), request.right.as_ref()) {
            Ok(halves) => halves,
            Err(e) => {
                METRICS.report_split_invalid.inc();
                tracing::warn!(
                    "report split region is invalid - left: {:?}, right: {:?}: {}",
                    request.left,
                    request.right,
                    e
                );
                return Err(e);
            }
        };

        let origin = origin_region(left, right);
        let op = Arc::new(SplitOperator::new(origin, left.clone(), right.clone()));
        tracing::info!("{}", op);

        self.histories.add(op.region_id(), op.clone());
        self.notifier.post(op, OperatorEventKind::End);

        Ok(ReportSplitResponse {})
    }

    async fn lookup_region(&self, key: &[u8]) -> Result<Region> {
        tokio::time::timeout(self.lookup_timeout, self.regions.lookup(key))
            .await
            .map_err(|_| Error::LookupTimeout {
                key: format_key(key),
                timeout: self.lookup_timeout,
            })?
    }

    async fn alloc_id(&self) -> Result<u64> {
        match tokio::time::timeout(self.alloc_timeout, self.id_alloc.alloc()).await {
            Ok(Ok(id)) => Ok(id),
            Ok(Err(e @ Error::AllocationFailed(_))) => Err(e),
            Ok(Err(e)) => Err(Error::AllocationFailed(e.to_string())),
            Err(_) => Err(Error::AllocationFailed(format!(
                "timed out after {:?}",
                self.alloc_timeout
            ))),
        }
    }
}
