//! Realtime connection configuration types.

use serde::{Deserialize, Serialize};

/// Connection settings for the hosted realtime service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub enabled: bool,
    /// Supabase project reference (the `<ref>` in `<ref>.supabase.co`).
    pub project_ref: String,
    /// Publishable anon key. Prefer `PARLEY_API_KEY` over writing it here.
    pub api_key: String,
    /// Full `ws://`/`wss://` URL, for self-hosted deployments. Overrides `project_ref`.
    pub endpoint: String,
    /// Heartbeat interval in seconds (valid range: 5-120).
    pub heartbeat_interval: u32,
    /// Base reconnect delay in seconds (valid range: 1-60).
    pub reconnect_delay: u32,
    /// Reconnect delay cap in seconds (valid range: 1-600).
    pub max_reconnect_delay: u32,
    /// Connect timeout in seconds (valid range: 1-120).
    pub connect_timeout: u32,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            project_ref: String::new(),
            api_key: String::new(),
            endpoint: String::new(),
            heartbeat_interval: 25,
            reconnect_delay: 1,
            max_reconnect_delay: 30,
            connect_timeout: 15,
        }
    }
}

impl RealtimeConfig {
    /// Whether enough is configured to open a connection.
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty() || !self.project_ref.is_empty()
    }
}
