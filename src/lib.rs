//! # minipd
//!
//! Placement driver core for a range-sharded, replicated key-value store:
//! - Regions: contiguous `[start, end)` key ranges with a version/conf-version epoch
//! - Heartbeat ingestion with structural validation and pluggable scheduling dispatch
//! - Region split handshake: id reservation (AskSplit) and validated commit (ReportSplit)
//! - Per-region split history and operator lifecycle events
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────┐ heartbeat / ask split / report split
//!   │ store node   │──────────────────────────┐
//!   └──────────────┘                          │ HTTP
//!                                 ┌───────────▼───────────┐
//!                                 │       Cluster         │
//!                                 │ epoch + split checks  │
//!                                 └─┬────┬────┬────┬────┬─┘
//!                       id alloc ◄──┘    │    │    │    └──► dispatcher
//!                     region cache ◄─────┘    │    └──► event bus
//!                                  history ◄──┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! minipd-server serve --name pd-1 --bind 0.0.0.0:2379 --data-dir ./pd-data
//!
//! minipd-ctl --pd http://127.0.0.1:2379 config show
//! minipd-ctl config show all
//! minipd-ctl config set leader-schedule-limit 32
//! minipd-ctl config set replicate location-labels zone,rack
//! ```

pub mod common;
pub mod coordinator;
pub mod ops;

// Re-export commonly used types
pub use common::{Config, Error, Result};
pub use coordinator::{Cluster, Coordinator};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
