use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaypostConfig {
    pub gateway: GatewayConfig,
    pub channel: ChannelConfig,
    pub probe: ProbeConfig,
}

/// HTTP listener settings for the probe endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8091,
        }
    }
}

/// Broadcast channel settings: owner, onboarding code, roster location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Telegram bot token. `WAYPOST_BOT_TOKEN` overrides.
    pub bot_token: Option<String>,

    /// The single admin principal. `WAYPOST_OWNER_ID` overrides.
    pub owner_id: Option<i64>,

    /// Shared onboarding secret. `WAYPOST_ACCESS_CODE` overrides.
    pub access_code: Option<String>,

    /// Roster file location. Defaults to `<data dir>/users.db`.
    pub roster_path: Option<PathBuf>,
}

impl ChannelConfig {
    /// Apply environment overrides for the secrets usually kept out of the
    /// config file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("WAYPOST_BOT_TOKEN") {
            self.bot_token = Some(token);
        }
        if let Ok(raw) = std::env::var("WAYPOST_OWNER_ID") {
            match raw.parse() {
                Ok(id) => self.owner_id = Some(id),
                Err(_) => tracing::warn!("WAYPOST_OWNER_ID is not numeric, ignoring"),
            }
        }
        if let Ok(code) = std::env::var("WAYPOST_ACCESS_CODE") {
            self.access_code = Some(code);
        }
    }

    /// Roster file path, falling back to the default under the data dir.
    pub fn roster_path(&self) -> PathBuf {
        self.roster_path
            .clone()
            .unwrap_or_else(|| crate::loader::data_dir().join("users.db"))
    }
}

/// Probe cache windows and query limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// TTL for the composite system report, seconds.
    pub info_ttl_secs: u64,

    /// TTL for the traffic summary, seconds.
    pub stat_ttl_secs: u64,

    /// Largest `limit` accepted by the raw traffic query.
    pub raw_limit_ceiling: u32,

    /// Timeout for a single external probe command, seconds.
    pub command_timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            info_ttl_secs: 4,
            stat_ttl_secs: 12,
            raw_limit_ceiling: 90,
            command_timeout_secs: 30,
        }
    }
}
