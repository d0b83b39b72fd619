use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub channel: ChannelConfig,
    pub simulator: SimulatorConfig,
    pub logger: LoggerConfig,
    pub store: StoreConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Port the simulator writes to.
    pub simulator_port: String,
    /// Port the logger reads from.
    pub logger_port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            simulator_port: "vtty0".into(),
            logger_port: "vtty1".into(),
            baud_rate: 9600,
            read_timeout_ms: 100,
        }
    }
}

impl ChannelConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub enabled: bool,
    pub min: f64,
    pub max: f64,
    pub interval_ms: u64,
    /// Exponential smoothing coefficient in (0, 1); `None` for raw draws.
    pub smoothing: Option<f64>,
    /// Stop after this many seconds; `None` runs until shutdown.
    pub run_for_secs: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min: 10.0,
            max: 40.0,
            interval_ms: 1000,
            smoothing: None,
            run_for_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub poll_interval_ms: u64,
    pub raw_log: PathBuf,
    pub hourly_log: PathBuf,
    pub daily_log: PathBuf,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            raw_log: "TemperatureLog.txt".into(),
            hourly_log: "HourAvg.txt".into(),
            daily_log: "DayAvg.txt".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "temperature.sqlite3".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub listen_addr: String,
    /// How long in-flight connections may run after shutdown is requested.
    pub poll_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".into(),
            poll_timeout_ms: 1000,
        }
    }
}

impl Config {
    /// Reads a JSON config file. A missing file yields the defaults; a
    /// malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }
}
