//! Engine configuration types for Courier.
//!
//! `EngineConfig` represents the top-level `config.toml` that controls the
//! message window, pacing delays, and session timers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the Courier bot.
///
/// Loaded from `~/.courier/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum tracked messages per chat before eviction kicks in.
    ///
    /// 100 is the safety cap the bot ships with; a small value such as 4
    /// turns the window into an aggressive live-chat cleaner. Eviction
    /// behaves identically at any size.
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Delay between consecutive deletes within one eviction pass, in ms.
    #[serde(default = "default_delete_pacing_ms")]
    pub delete_pacing_ms: u64,

    /// Delay between consecutive broadcast sends, in ms.
    #[serde(default = "default_broadcast_pacing_ms")]
    pub broadcast_pacing_ms: u64,

    /// Seconds between reconnect attempts after a connection loss.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Seconds between periodic maintenance sweeps while connected.
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,

    /// Long-poll timeout for fetching updates, in seconds.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Bot token. The `COURIER_BOT_TOKEN` env var takes precedence; having
    /// neither is a fatal startup condition.
    #[serde(default)]
    pub bot_token: Option<String>,
}

fn default_window_capacity() -> usize {
    100
}

fn default_delete_pacing_ms() -> u64 {
    100
}

fn default_broadcast_pacing_ms() -> u64 {
    50
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_maintenance_interval_secs() -> u64 {
    30
}

fn default_poll_timeout_secs() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            delete_pacing_ms: default_delete_pacing_ms(),
            broadcast_pacing_ms: default_broadcast_pacing_ms(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            maintenance_interval_secs: default_maintenance_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
            bot_token: None,
        }
    }
}

impl EngineConfig {
    pub fn delete_pacing(&self) -> Duration {
        Duration::from_millis(self.delete_pacing_ms)
    }

    pub fn broadcast_pacing(&self) -> Duration {
        Duration::from_millis(self.broadcast_pacing_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_secs)
    }
}
