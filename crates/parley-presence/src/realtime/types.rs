//! Configuration, protocol types, and event/command enums for the realtime client.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for connecting to Supabase Realtime.
#[derive(Clone)]
pub struct RealtimeConfig {
    /// Supabase project reference (e.g., "ojmqzagktzkualzgpcbq").
    pub project_ref: String,
    /// Supabase anon key (publishable).
    pub api_key: String,
    /// Full WebSocket URL; when set, `project_ref` is ignored.
    pub endpoint: Option<String>,
    /// Optional access token (JWT) sent with every channel join.
    pub access_token: Option<String>,
    /// Heartbeat interval in seconds (default: 25).
    pub heartbeat_interval_secs: u64,
    /// Reconnect base delay in seconds.
    pub reconnect_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    pub max_reconnect_delay_secs: u64,
    /// Connect attempt timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl std::fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("project_ref", &self.project_ref)
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("heartbeat_interval_secs", &self.heartbeat_interval_secs)
            .field("reconnect_delay_secs", &self.reconnect_delay_secs)
            .field("max_reconnect_delay_secs", &self.max_reconnect_delay_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            project_ref: String::new(),
            api_key: String::new(),
            endpoint: None,
            access_token: None,
            heartbeat_interval_secs: 25,
            reconnect_delay_secs: 1,
            max_reconnect_delay_secs: 30,
            connect_timeout_secs: 15,
        }
    }
}

impl RealtimeConfig {
    /// Build the WebSocket URL for Supabase Realtime.
    pub(crate) fn ws_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => {
                let sep = if endpoint.contains('?') { '&' } else { '?' };
                format!("{endpoint}{sep}apikey={}&vsn=1.0.0", self.api_key)
            }
            None => format!(
                "wss://{}.supabase.co/realtime/v1/websocket?apikey={}&vsn=1.0.0",
                self.project_ref, self.api_key
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Phoenix Protocol Types
// ---------------------------------------------------------------------------

/// A Phoenix protocol message envelope (v1 JSON format).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    pub payload: serde_json::Value,
    #[serde(rename = "ref")]
    pub msg_ref: Option<String>,
}

impl PhoenixMessage {
    /// A message addressed to the `realtime:` topic of a channel.
    pub(crate) fn channel(topic: &str, event: &str, payload: serde_json::Value, msg_ref: String) -> Self {
        Self {
            topic: format!("realtime:{topic}"),
            event: event.to_string(),
            payload,
            msg_ref: Some(msg_ref),
        }
    }
}

// ---------------------------------------------------------------------------
// Channel Configuration
// ---------------------------------------------------------------------------

/// Configuration for a Supabase Realtime channel.
#[derive(Clone)]
pub struct ChannelConfig {
    pub broadcast: BroadcastConfig,
    pub presence: PresenceConfig,
    /// JWT forwarded in the join payload for RLS-protected channels.
    pub access_token: Option<String>,
}

impl std::fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("broadcast", &self.broadcast)
            .field("presence", &self.presence)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Broadcast configuration for a channel.
#[derive(Debug, Clone, Default)]
pub struct BroadcastConfig {
    /// Whether to receive your own broadcasts (Supabase "self" key).
    pub self_send: bool,
    /// Whether broadcasts are acknowledged by the server.
    pub ack: bool,
}

/// Presence configuration for a channel.
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// The key used to identify this client in presence state.
    pub key: String,
}

impl ChannelConfig {
    /// Presence-only channel keyed by `key`.
    pub fn presence(key: &str, access_token: Option<String>) -> Self {
        Self {
            broadcast: BroadcastConfig::default(),
            presence: PresenceConfig {
                key: key.to_string(),
            },
            access_token,
        }
    }

    /// Serialize to the JSON payload expected by Supabase phx_join.
    pub(crate) fn to_join_payload(&self) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "config": {
                "broadcast": {
                    "self": self.broadcast.self_send,
                    "ack": self.broadcast.ack
                },
                "presence": {
                    "key": self.presence.key
                }
            }
        });
        if let Some(token) = &self.access_token {
            payload["access_token"] = serde_json::Value::String(token.clone());
        }
        payload
    }
}

// ---------------------------------------------------------------------------
// Events & Commands
// ---------------------------------------------------------------------------

/// Events emitted by the realtime client.
#[derive(Debug, Clone)]
pub enum RealtimeEvent {
    /// WebSocket connection established.
    Connected,
    /// WebSocket connection lost.
    Disconnected,
    /// The server accepted a channel join.
    ChannelJoined { topic: String },
    /// Join rejected, or the channel errored or closed.
    ChannelError { topic: String, message: String },
    /// Full presence state snapshot (received after joining).
    PresenceState {
        topic: String,
        state: HashMap<String, Vec<serde_json::Value>>,
    },
    /// Incremental presence changes.
    PresenceDiff {
        topic: String,
        joins: HashMap<String, Vec<serde_json::Value>>,
        leaves: HashMap<String, Vec<serde_json::Value>>,
    },
    /// Connection-level error.
    Error(String),
}

/// Commands sent to the realtime client from the application layer.
#[derive(Debug)]
pub(crate) enum RealtimeCommand {
    JoinChannel {
        topic: String,
        config: ChannelConfig,
    },
    LeaveChannel {
        topic: String,
    },
    PresenceTrack {
        topic: String,
        payload: serde_json::Value,
    },
    PresenceUntrack {
        topic: String,
    },
    Disconnect,
}

/// Errors returned by [`RealtimeClient`](super::RealtimeClient) handles.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RealtimeError {
    #[error("realtime connection task has stopped")]
    ConnectionClosed,
}

impl From<RealtimeError> for parley_common::ParleyError {
    fn from(err: RealtimeError) -> Self {
        parley_common::ParleyError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_from_project_ref() {
        let config = RealtimeConfig {
            project_ref: "abc123".into(),
            api_key: "anon".into(),
            ..Default::default()
        };
        assert_eq!(
            config.ws_url(),
            "wss://abc123.supabase.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );
    }

    #[test]
    fn ws_url_from_endpoint_override() {
        let config = RealtimeConfig {
            project_ref: "ignored".into(),
            api_key: "anon".into(),
            endpoint: Some("ws://localhost:4000/realtime/v1/websocket".into()),
            ..Default::default()
        };
        assert_eq!(
            config.ws_url(),
            "ws://localhost:4000/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = RealtimeConfig {
            api_key: "secret-anon".into(),
            access_token: Some("secret-jwt".into()),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-anon"));
        assert!(!debug.contains("secret-jwt"));

        let channel = ChannelConfig::presence("u1", Some("secret-jwt".into()));
        assert!(!format!("{channel:?}").contains("secret-jwt"));
    }

    #[test]
    fn join_payload_carries_presence_key_and_token() {
        let payload = ChannelConfig::presence("user-1", Some("jwt".into())).to_join_payload();
        assert_eq!(payload["config"]["presence"]["key"], "user-1");
        assert_eq!(payload["config"]["broadcast"]["self"], false);
        assert_eq!(payload["access_token"], "jwt");

        let anonymous = ChannelConfig::presence("user-1", None).to_join_payload();
        assert!(anonymous.get("access_token").is_none());
    }

    #[test]
    fn realtime_error_is_a_network_error() {
        let err: parley_common::ParleyError = RealtimeError::ConnectionClosed.into();
        assert_eq!(err.to_string(), "network error: realtime connection task has stopped");
    }

    #[test]
    fn phoenix_message_serializes_ref_field() {
        let msg = PhoenixMessage::channel("typing-c1", "phx_leave", serde_json::json!({}), "7".into());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["topic"], "realtime:typing-c1");
        assert_eq!(json["ref"], "7");
    }
}
