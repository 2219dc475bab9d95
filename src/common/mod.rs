//! Common utilities and types shared across minipd

pub mod config;
pub mod error;
pub mod metrics;
pub mod utils;

pub use config::{Config, ReplicationConfig, ScheduleConfig, ServerConfig};
pub use error::{Error, Result};
pub use metrics::METRICS;
pub use utils::{format_key, parse_duration};
