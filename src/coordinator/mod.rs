//! Placement driver core
//!
//! The coordinator is responsible for:
//! - Region heartbeat ingestion (structural checks, scheduling dispatch)
//! - The split handshake (AskSplit id reservation, ReportSplit validation)
//! - Split operator history and lifecycle events
//! - The HTTP API storage nodes and operators talk to

pub mod alloc;
pub mod cache;
pub mod cluster;
pub mod dispatch;
pub mod event;
pub mod history;
pub mod http;
pub mod region;
pub mod server;
pub mod split;

pub use cluster::{AskSplitRequest, AskSplitResponse, Cluster, ReportSplitRequest, ReportSplitResponse};
pub use region::{Peer, Region, RegionEpoch};
pub use server::Coordinator;
