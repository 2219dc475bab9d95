//! Configuration for the placement driver
//!
//! Values come from (lowest to highest priority) built-in defaults, an
//! optional TOML file and `MINIPD_*` environment variables, e.g.
//! `MINIPD_SERVER__BIND_ADDR=0.0.0.0:2379` sets `server.bind-addr`. File keys
//! are kebab-case in every section; list values from the environment are
//! comma separated. The server binary applies its CLI flags on top.

use crate::common::{parse_duration, Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "minipd.toml";

const ENV_PREFIX: &str = "MINIPD";

/// Global configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub schedule: ScheduleConfig,
    pub replication: ReplicationConfig,
}

/// Listener, storage and deadline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Name of this placement driver instance
    pub name: String,

    /// Bind address for the HTTP API
    pub bind_addr: SocketAddr,

    /// Directory holding the id allocator watermark
    pub data_dir: PathBuf,

    /// Deadline for a region directory lookup
    pub lookup_timeout_ms: u64,

    /// Deadline for a single id allocation
    pub alloc_timeout_ms: u64,

    /// Split operators retained per region
    pub history_capacity: usize,

    /// Ids reserved per watermark write
    pub id_batch_size: u64,

    /// Logging level
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "pd".to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 2379)),
            data_dir: PathBuf::from("./pd-data"),
            lookup_timeout_ms: 3000,
            alloc_timeout_ms: 3000,
            history_capacity: 64,
            id_batch_size: 1000,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn alloc_timeout(&self) -> Duration {
        Duration::from_millis(self.alloc_timeout_ms)
    }
}

/// Scheduling knobs, exposed at `/pd/api/v1/config/schedule`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Max pending snapshots per store before it stops receiving new peers
    pub max_snapshot_count: u64,

    /// A store is considered down after this long without a heartbeat
    pub max_store_down_time: String,

    pub leader_schedule_limit: u64,
    pub region_schedule_limit: u64,
    pub replica_schedule_limit: u64,

    /// Min time between a split and a merge of the same region
    pub split_merge_interval: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            max_snapshot_count: 3,
            max_store_down_time: "1h".to_string(),
            leader_schedule_limit: 64,
            region_schedule_limit: 16,
            replica_schedule_limit: 24,
            split_merge_interval: "1h".to_string(),
        }
    }
}

/// Replication knobs, exposed at `/pd/api/v1/config/replicate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ReplicationConfig {
    pub max_replicas: u64,
    pub location_labels: Vec<String>,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            max_replicas: 3,
            location_labels: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from `path` (if it exists) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, env_source())
    }

    fn load_with_env(path: Option<&Path>, env: ::config::Environment) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(env)
            .build()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.schedule.validate()?;
        self.replication.validate()
    }
}

/// `MINIPD_<SECTION>__<FIELD>` variables, mapped onto kebab-case keys.
fn env_source() -> ::config::Environment {
    ::config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .convert_case(::config::Case::Kebab)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("replication.location-labels")
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lookup_timeout_ms == 0 || self.alloc_timeout_ms == 0 {
            return Err(Error::InvalidConfig("timeouts must be non-zero".into()));
        }
        if self.id_batch_size == 0 {
            return Err(Error::InvalidConfig("id-batch-size must be non-zero".into()));
        }
        if self.history_capacity == 0 {
            return Err(Error::InvalidConfig(
                "history-capacity must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<()> {
        parse_duration(&self.max_store_down_time)?;
        parse_duration(&self.split_merge_interval)?;
        Ok(())
    }
}

impl ReplicationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_replicas == 0 {
            return Err(Error::InvalidConfig("max-replicas must be non-zero".into()));
        }
        Ok(())
    }
}

/// Overlay the fields of `patch` onto `current`.
///
/// Fields absent from `patch` keep their current value; unknown fields or
/// values of the wrong type are rejected.
pub fn merge_section<T>(current: &T, patch: serde_json::Map<String, serde_json::Value>) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut value =
        serde_json::to_value(current).map_err(|e| Error::Internal(e.to_string()))?;
    let fields = value
        .as_object_mut()
        .ok_or_else(|| Error::Internal("config section is not an object".into()))?;

    for (key, v) in patch {
        fields.insert(key, v);
    }

    serde_json::from_value(value).map_err(|e| Error::InvalidConfig(e.to_string()))
}
