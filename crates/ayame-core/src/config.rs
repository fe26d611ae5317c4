//! Host-facing engine configuration.

use crate::frame::DEFAULT_FRAME_RATE;
use crate::gate::DEFAULT_GATE_TIMEOUT_MS;
use crate::remap::DEFAULT_MAX_CHAIN_LENGTH;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("frameRate must be between 1 and 1000 Hz, got {0}")]
    FrameRate(u32),
    #[error("gateTimeout must be non-zero")]
    GateTimeout,
    #[error("pollInterval must be non-zero")]
    PollInterval,
    #[error("maxRemapChainLength must be at least 1")]
    ChainLength,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorConfig {
    /// Source key name -> ordered target key names.
    pub remaps: HashMap<String, Vec<String>>,
    pub max_remap_chain_length: usize,
    /// Reporting rate in Hz.
    pub frame_rate: u32,
    /// Quiet period after which the reporting window closes.
    pub gate_timeout_ms: u64,
    /// Cadence of the polling producer. Captured at `start()`.
    pub poll_interval_ms: u64,
    pub enable_remapper: bool,
    /// Report raw lock keys upward even while they are remapped.
    pub report_lock_keys: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            remaps: HashMap::new(),
            max_remap_chain_length: DEFAULT_MAX_CHAIN_LENGTH,
            frame_rate: DEFAULT_FRAME_RATE,
            gate_timeout_ms: DEFAULT_GATE_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            enable_remapper: false,
            report_lock_keys: false,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate == 0 || self.frame_rate > 1000 {
            return Err(ConfigError::FrameRate(self.frame_rate));
        }
        if self.gate_timeout_ms == 0 {
            return Err(ConfigError::GateTimeout);
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::PollInterval);
        }
        if self.max_remap_chain_length == 0 {
            return Err(ConfigError::ChainLength);
        }
        Ok(())
    }

    pub fn gate_timeout(&self) -> Duration {
        Duration::from_millis(self.gate_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frame_rate, 60);
        assert_eq!(config.max_remap_chain_length, 5);
        assert!(!config.enable_remapper);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut config = MonitorConfig {
            frame_rate: 0,
            ..MonitorConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::FrameRate(0)));

        config.frame_rate = 2000;
        assert_eq!(config.validate(), Err(ConfigError::FrameRate(2000)));

        config.frame_rate = 60;
        config.gate_timeout_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::GateTimeout));

        config.gate_timeout_ms = 500;
        config.max_remap_chain_length = 0;
        assert_eq!(config.validate(), Err(ConfigError::ChainLength));
    }

    #[test]
    fn deserializes_host_json_with_defaults_for_missing_fields() {
        let json = r#"{
            "remaps": { "CapsLock": ["LControl"] },
            "enableRemapper": true,
            "frameRate": 120
        }"#;
        let config: MonitorConfig = serde_json::from_str(json).unwrap();

        assert!(config.enable_remapper);
        assert_eq!(config.frame_rate, 120);
        assert_eq!(config.gate_timeout_ms, DEFAULT_GATE_TIMEOUT_MS);
        assert_eq!(config.remaps["CapsLock"], vec!["LControl".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn round_trips_through_json() {
        let mut config = MonitorConfig::default();
        config
            .remaps
            .insert("A".to_string(), vec!["LShift".to_string(), "B".to_string()]);
        config.enable_remapper = true;

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("maxRemapChainLength"));

        let back: MonitorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.remaps, config.remaps);
        assert_eq!(back.frame_rate, config.frame_rate);
    }
}
