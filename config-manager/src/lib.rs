//! Configuration for the ONVIF device emulator
//!
//! A single TOML file, by default `~/.config/onvif-emulator/emulator.toml`.

mod config;
mod error;
mod paths;

pub use config::{DispatchConfig, EmulatorConfig, ServerConfig};
pub use error::ConfigError;
pub use paths::{config_dir, emulator_config_path, ensure_config_dir};
