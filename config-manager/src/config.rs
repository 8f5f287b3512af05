use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use onvif_server::{
    AdvertisedAddress, ClockMode, DeviceIdentity, DeviceProfileStore, DispatchPolicy,
    MediaProfile,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths;

/// Listening socket and the addresses advertised to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Host placed in XAddr and stream URIs
    pub advertised_host: String,
    /// RTSP port advertised by GetStreamUri (default: port + 1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtsp_port: Option<u16>,
    pub stream_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            advertised_host: "localhost".to_string(),
            rtsp_port: None,
            stream_path: "stream1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub policy: DispatchPolicy,
    pub clock: ClockMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmulatorConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub device: DeviceIdentity,
    #[serde(default = "default_profiles")]
    pub profiles: Vec<MediaProfile>,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

fn default_profiles() -> Vec<MediaProfile> {
    vec![MediaProfile::main_stream(), MediaProfile::sub_stream()]
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            device: DeviceIdentity::default(),
            profiles: default_profiles(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl EmulatorConfig {
    /// Get default config path
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        paths::emulator_config_path()
    }

    /// Check if config exists at default location
    pub fn exists() -> bool {
        paths::emulator_config_path()
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    /// Load config from default XDG location
    pub fn load() -> Result<Self, ConfigError> {
        let path = paths::emulator_config_path()?;
        Self::load_from(&path)
    }

    /// Load config from specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config or return defaults if not found
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Save config to default XDG location
    pub fn save(&self) -> Result<(), ConfigError> {
        paths::ensure_config_dir()?;
        let path = paths::emulator_config_path()?;
        self.save_to(&path)
    }

    /// Save config to specific path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check port and profile invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".to_string()));
        }
        if self.server.port == u16::MAX && self.server.rtsp_port.is_none() {
            return Err(ConfigError::Invalid(
                "server.port 65535 leaves no port for RTSP; set server.rtsp_port".to_string(),
            ));
        }
        if self.server.rtsp_port == Some(self.server.port) {
            return Err(ConfigError::Invalid(
                "server.rtsp_port must differ from server.port".to_string(),
            ));
        }
        if self.server.advertised_host.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "server.advertised_host must not be empty".to_string(),
            ));
        }
        self.device_store().map(|_| ())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind, self.server.port)
    }

    pub fn advertised_address(&self) -> AdvertisedAddress {
        AdvertisedAddress {
            rtsp_port: self.server.rtsp_port,
            stream_path: self.server.stream_path.clone(),
            ..AdvertisedAddress::new(self.server.advertised_host.clone(), self.server.port)
        }
    }

    /// Build the read-only device store from the configured identity and profiles
    pub fn device_store(&self) -> Result<DeviceProfileStore, ConfigError> {
        Ok(DeviceProfileStore::new(
            self.device.clone(),
            self.profiles.clone(),
        )?)
    }
}
