//! Admin commands for cluster configuration

pub mod config;

pub use config::{set_config, set_replicate_config, show_all_config, show_config};
