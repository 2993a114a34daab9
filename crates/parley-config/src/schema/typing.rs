//! Typing indicator configuration types.

use serde::{Deserialize, Serialize};

/// Typing presence behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    /// Quiet period after the last keystroke before typing auto-stops (500-30000 ms).
    pub quiet_window_ms: u32,
    /// How long to wait for a channel to become ready (1000-60000 ms).
    pub join_timeout_ms: u32,
    /// Prepended to the conversation id to form the channel name.
    pub channel_prefix: String,
    /// Shown for remote participants that announce an empty username.
    pub fallback_username: String,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            quiet_window_ms: 3000,
            join_timeout_ms: 10_000,
            channel_prefix: "typing-".into(),
            fallback_username: "User".into(),
        }
    }
}
