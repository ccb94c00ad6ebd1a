//! Configuration for the Marauder location client.
//!
//! Every section has sensible defaults, so a config file only needs the
//! values that differ:
//!
//! ```toml
//! [service]
//! base_url = "http://marauder.example.edu"
//! timeout_secs = 6
//!
//! [polling]
//! interval = "10s"
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{LocatorError, Result};

/// Refresh timer period
///
/// Accepts seconds (`10`, `10s`) or milliseconds (`500ms`).
///
/// # Example
/// ```
/// use marauder::config::PollInterval;
///
/// let interval: PollInterval = "2500ms".parse().unwrap();
/// assert_eq!(interval.as_duration().as_millis(), 2500);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollInterval(Duration);

impl PollInterval {
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl Default for PollInterval {
    fn default() -> Self {
        Self::from_secs(10)
    }
}

impl fmt::Display for PollInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0.as_millis())
    }
}

impl FromStr for PollInterval {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();

        let millis = if let Some(num) = s.strip_suffix("ms") {
            num.trim()
                .parse::<u64>()
                .map_err(|_| format!("invalid interval: {}", s))?
        } else {
            let num = s.strip_suffix('s').unwrap_or(s);
            let secs: f64 = num
                .trim()
                .parse()
                .map_err(|_| format!("invalid interval: {}", s))?;
            if !secs.is_finite() || secs < 0.0 {
                return Err(format!("invalid interval: {}", s));
            }
            (secs * 1000.0).round() as u64
        };

        if millis == 0 {
            return Err("interval must be positive".to_string());
        }
        Ok(Self(Duration::from_millis(millis)))
    }
}

impl<'de> Deserialize<'de> for PollInterval {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Secs(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Secs(0) => Err(serde::de::Error::custom("interval must be positive")),
            Raw::Secs(secs) => Ok(Self::from_secs(secs)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Which scanner feeds the averaging sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SamplerBackend {
    /// NetworkManager's `nmcli` scan listing
    #[default]
    Nmcli,
    /// Recorded fingerprints read from `SamplerConfig::replay_file`
    Replay,
}

/// System-wide client configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Remote location service
    pub service: ServiceConfig,
    /// Refresh timer
    pub polling: PollingConfig,
    /// Signal sampling
    pub sampler: SamplerConfig,
    /// Identity reported to the service
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base address the `*.php` endpoints hang off
    pub base_url: String,
    /// Page that shows everyone on the map
    pub map_url: String,
    /// Per-request deadline; expiry is reported as a transport failure
    pub timeout_secs: u64,
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://marauder.olin.edu".to_string(),
            map_url: "http://marauder.olin.edu/map".to_string(),
            timeout_secs: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval: PollInterval,
    /// Refresh once as soon as the worker starts instead of waiting a tick
    pub refresh_on_start: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: PollInterval::default(),
            refresh_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub backend: SamplerBackend,
    /// Scans averaged into one fingerprint
    pub probes: usize,
    /// Pause between scans in milliseconds
    pub probe_interval_ms: u64,
    /// Source file for the replay backend
    pub replay_file: Option<String>,
}

impl SamplerConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            backend: SamplerBackend::Nmcli,
            probes: 3,
            probe_interval_ms: 150,
            replay_file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Overrides the login name taken from the environment
    pub username: Option<String>,
}

impl LocatorConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| LocatorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LocatorError::Config(format!("{}: {}", path.display(), e)))?;
        log::debug!("Loaded configuration from {}", path.display());
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.base_url.trim().is_empty() {
            return Err(LocatorError::Config("service.base_url must not be empty".into()));
        }
        if self.service.timeout_secs == 0 {
            return Err(LocatorError::Config("service.timeout_secs must be positive".into()));
        }
        if self.sampler.probes == 0 {
            return Err(LocatorError::Config("sampler.probes must be at least 1".into()));
        }
        if self.sampler.backend == SamplerBackend::Replay && self.sampler.replay_file.is_none() {
            return Err(LocatorError::Config(
                "sampler.replay_file is required for the replay backend".into(),
            ));
        }
        Ok(())
    }
}
