//! Server configuration
//!
//! Read from a TOML file, with CLI overrides for the bind address. All
//! durations are plain integers in the file; accessors convert.

use std::io;
use std::path::Path;
use std::time::Duration;

use glosa_core::advisory::SpeedRange;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Emission cadence per active session, milliseconds.
    pub tick_interval_ms: u64,
    /// Upper bound on a single prediction-feed fetch, milliseconds.
    pub prediction_timeout_ms: u64,
    /// Connections (and unclaimed session tokens) silent for longer than
    /// this are considered abandoned, seconds.
    pub idle_timeout_s: u64,
    /// Advisory speed clamp in m/s.
    pub min_advisory_speed: f64,
    pub max_advisory_speed: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            tick_interval_ms: 1_000,
            prediction_timeout_ms: 500,
            idle_timeout_s: 300,
            min_advisory_speed: 1.5,
            max_advisory_speed: 13.9,
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid config '{}': {e}", path.display()),
            )
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn prediction_timeout(&self) -> Duration {
        Duration::from_millis(self.prediction_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_s)
    }

    pub fn speed_range(&self) -> SpeedRange {
        SpeedRange {
            min: self.min_advisory_speed,
            max: self.max_advisory_speed,
        }
    }
}
