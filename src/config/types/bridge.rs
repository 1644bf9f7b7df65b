//! Execution bridge configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Execution bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Timeout for one execution request
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
    /// Readiness polling after a start
    #[serde(default)]
    pub readiness: ReadinessConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            request_timeout: default_request_timeout(),
            readiness: ReadinessConfig::default(),
        }
    }
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

/// How long and how often to poll a freshly started sandbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Give up after this long
    #[serde(with = "humantime_serde", default = "default_readiness_timeout")]
    pub timeout: Duration,
    /// First delay between probes
    #[serde(with = "humantime_serde", default = "default_initial_interval")]
    pub initial_interval: Duration,
    /// Delay cap between probes
    #[serde(with = "humantime_serde", default = "default_max_interval")]
    pub max_interval: Duration,
    /// Timeout for one HTTP probe
    #[serde(with = "humantime_serde", default = "default_probe_timeout")]
    pub probe_timeout: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        ReadinessConfig {
            timeout: default_readiness_timeout(),
            initial_interval: default_initial_interval(),
            max_interval: default_max_interval(),
            probe_timeout: default_probe_timeout(),
        }
    }
}

fn default_readiness_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_initial_interval() -> Duration {
    Duration::from_millis(250)
}

fn default_max_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(2)
}
