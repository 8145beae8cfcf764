//! Daemon configuration: load from file or create defaults.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use motorsim_shm::ChannelConfig;

const CONFIG_ENV: &str = "MOTORSIMD_CONFIG";
const CONFIG_FILE: &str = "motorsimd.json";

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Tick period in milliseconds
    pub tick_ms: u64,
    /// Trigger a sensor acquisition every N ticks
    pub sensor_trigger_interval: u64,
    /// Log a status line every N ticks
    pub status_log_interval: u64,
    /// Shared memory channel configuration
    pub channel: ChannelConfig,
    /// Demo motor start speed in RPM
    pub demo_start_speed: u32,
    /// Demo motor direction (true = clockwise)
    pub demo_clockwise: bool,
    /// Simulated raw values seeded into the four sensors
    pub simulated_sensor_values: [i32; 4],
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            sensor_trigger_interval: 10,
            status_log_interval: 50,
            channel: ChannelConfig::default(),
            demo_start_speed: 5000,
            demo_clockwise: true,
            simulated_sensor_values: [100, 5000, 45, 2500],
        }
    }
}

impl DaemonConfig {
    /// Load configuration from file or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {config_path:?}"))?;

            let mut config: DaemonConfig =
                serde_json::from_str(&content).context("Failed to parse config file")?;
            config.normalize();

            debug!("Loaded config from {:?}", config_path);
            Ok(config)
        } else {
            let config = Self::default();
            config.save(&config_path)?;
            info!("Created default config at {:?}", config_path);
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &PathBuf) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {path:?}"))
    }

    /// Clamp intervals into safe bounds.
    pub fn normalize(&mut self) {
        self.tick_ms = self.tick_ms.max(1);
        self.sensor_trigger_interval = self.sensor_trigger_interval.max(1);
        self.status_log_interval = self.status_log_interval.max(1);
    }

    fn config_path() -> PathBuf {
        env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }
}
