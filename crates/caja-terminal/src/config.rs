//! # Station Configuration
//!
//! TOML configuration for one checkout terminal.
//!
//! ## Configuration File Format
//! ```toml
//! # station.toml
//! [backend]
//! base_url = "https://pos.example.com"
//! token = "..."
//!
//! [branch]
//! id = "branch-7"
//! tax_rate_bps = 2100   # 21.00%
//!
//! [scanner]
//! burst_gap_ms = 100
//! commit_delay_ms = 100
//! min_len = 3
//! max_len = 50
//!
//! [sync]
//! endpoint = "wss://pos.example.com"
//! ping_interval_secs = 30
//! reconnect_interval_secs = 3
//! max_reconnect_attempts = 5
//! connect_timeout_secs = 10
//! ```
//!
//! A missing file yields the defaults; a malformed file is an error the
//! operator has to fix rather than something to silently paper over.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use caja_core::money::Rate;
use caja_core::scanner::ScannerConfig;
use caja_core::DEFAULT_TAX_RATE_BPS;
use caja_sync::ChannelConfig;

use crate::error::{TerminalError, TerminalResult};

// =============================================================================
// Sections
// =============================================================================

/// Backend HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackendSettings {
    /// Base URL of the backend API.
    #[serde(default)]
    pub base_url: String,

    /// Bearer token for API and channel authentication.
    #[serde(default)]
    pub token: String,
}

/// Branch identity and fiscal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchSettings {
    /// Branch this terminal belongs to.
    #[serde(default)]
    pub id: String,

    /// Sales tax rate in basis points.
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,
}

fn default_tax_rate_bps() -> u32 {
    DEFAULT_TAX_RATE_BPS
}

impl Default for BranchSettings {
    fn default() -> Self {
        BranchSettings {
            id: String::new(),
            tax_rate_bps: DEFAULT_TAX_RATE_BPS,
        }
    }
}

/// Scanner classifier tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerSettings {
    #[serde(default = "default_burst_gap_ms")]
    pub burst_gap_ms: u64,

    #[serde(default = "default_commit_delay_ms")]
    pub commit_delay_ms: u64,

    #[serde(default = "default_min_len")]
    pub min_len: usize,

    #[serde(default = "default_max_len")]
    pub max_len: usize,
}

fn default_burst_gap_ms() -> u64 {
    100
}

fn default_commit_delay_ms() -> u64 {
    100
}

fn default_min_len() -> usize {
    3
}

fn default_max_len() -> usize {
    50
}

impl Default for ScannerSettings {
    fn default() -> Self {
        ScannerSettings {
            burst_gap_ms: default_burst_gap_ms(),
            commit_delay_ms: default_commit_delay_ms(),
            min_len: default_min_len(),
            max_len: default_max_len(),
        }
    }
}

/// Inventory channel tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// WebSocket endpoint (e.g. `wss://pos.example.com`).
    #[serde(default)]
    pub endpoint: String,

    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    #[serde(default = "default_reconnect_interval_secs")]
    pub reconnect_interval_secs: u64,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_ping_interval_secs() -> u64 {
    30
}

fn default_reconnect_interval_secs() -> u64 {
    3
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            endpoint: String::new(),
            ping_interval_secs: default_ping_interval_secs(),
            reconnect_interval_secs: default_reconnect_interval_secs(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

// =============================================================================
// Station Config
// =============================================================================

/// Full configuration for one terminal.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StationConfig {
    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub branch: BranchSettings,

    #[serde(default)]
    pub scanner: ScannerSettings,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl StationConfig {
    /// Loads the configuration from a TOML file.
    ///
    /// A missing file returns the defaults; a malformed file is an error.
    pub fn load(path: &Path) -> TerminalResult<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No station config file, using defaults");
            return Ok(StationConfig::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| TerminalError::config(format!("Failed to read config: {}", e)))?;
        let config: StationConfig = toml::from_str(&raw)
            .map_err(|e| TerminalError::config(format!("Failed to parse config: {}", e)))?;

        debug!(path = %path.display(), "Station config loaded");
        Ok(config)
    }

    /// Writes the configuration to a TOML file.
    pub fn save(&self, path: &Path) -> TerminalResult<()> {
        let raw = toml::to_string_pretty(self)
            .map_err(|e| TerminalError::config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TerminalError::config(format!("Failed to create config dir: {}", e)))?;
        }
        std::fs::write(path, raw)
            .map_err(|e| TerminalError::config(format!("Failed to write config: {}", e)))?;

        debug!(path = %path.display(), "Station config saved");
        Ok(())
    }

    /// Default config file location for this platform.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "caja", "caja-pos")
            .map(|dirs| dirs.config_dir().join("station.toml"))
    }

    /// The tax rate as a [`Rate`].
    pub fn tax_rate(&self) -> Rate {
        Rate::from_bps(self.branch.tax_rate_bps)
    }

    /// Builds the scanner classifier configuration.
    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            burst_gap: Duration::from_millis(self.scanner.burst_gap_ms),
            commit_delay: Duration::from_millis(self.scanner.commit_delay_ms),
            min_len: self.scanner.min_len,
            max_len: self.scanner.max_len,
        }
    }

    /// Builds the inventory channel configuration.
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            endpoint: self.sync.endpoint.clone(),
            branch_id: self.branch.id.clone(),
            token: self.backend.token.clone(),
            connect_timeout: Duration::from_secs(self.sync.connect_timeout_secs),
            reconnect_interval: Duration::from_secs(self.sync.reconnect_interval_secs),
            max_reconnect_attempts: self.sync.max_reconnect_attempts,
            ping_interval: Duration::from_secs(self.sync.ping_interval_secs),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StationConfig::default();
        assert_eq!(config.branch.tax_rate_bps, 2100);
        assert_eq!(config.scanner.burst_gap_ms, 100);
        assert_eq!(config.scanner.min_len, 3);
        assert_eq!(config.sync.max_reconnect_attempts, 5);
    }

    #[test]
    fn test_parse_partial_file_fills_defaults() {
        let config: StationConfig = toml::from_str(
            r#"
            [backend]
            base_url = "https://pos.example.com"
            token = "secret"

            [branch]
            id = "branch-7"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.base_url, "https://pos.example.com");
        assert_eq!(config.branch.id, "branch-7");
        assert_eq!(config.branch.tax_rate_bps, 2100); // Defaulted
        assert_eq!(config.scanner.commit_delay_ms, 100); // Defaulted
    }

    #[test]
    fn test_channel_config_mapping() {
        let config: StationConfig = toml::from_str(
            r#"
            [backend]
            token = "secret"

            [branch]
            id = "branch-7"

            [sync]
            endpoint = "wss://pos.example.com"
            reconnect_interval_secs = 2
            max_reconnect_attempts = 4
            "#,
        )
        .unwrap();

        let channel = config.channel_config();
        assert_eq!(channel.endpoint, "wss://pos.example.com");
        assert_eq!(channel.branch_id, "branch-7");
        assert_eq!(channel.token, "secret");
        assert_eq!(channel.reconnect_interval, Duration::from_secs(2));
        assert_eq!(channel.max_reconnect_attempts, 4);
    }

    #[test]
    fn test_scanner_config_mapping() {
        let config = StationConfig::default();
        let scanner = config.scanner_config();
        assert_eq!(scanner.burst_gap, Duration::from_millis(100));
        assert_eq!(scanner.min_len, 3);
        assert_eq!(scanner.max_len, 50);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = StationConfig::load(Path::new("/definitely/not/here/station.toml")).unwrap();
        assert_eq!(config.branch.tax_rate_bps, 2100);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = StationConfig::default();
        config.branch.id = "branch-9".to_string();
        config.sync.endpoint = "wss://x.example.com".to_string();

        let raw = toml::to_string_pretty(&config).unwrap();
        let parsed: StationConfig = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.branch.id, "branch-9");
        assert_eq!(parsed.sync.endpoint, "wss://x.example.com");
    }
}
