//! Incoming Phoenix message handler and presence parsing.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::connection::PendingChannel;
use super::types::{PhoenixMessage, RealtimeEvent};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Extract the short topic name from a Phoenix topic (strip "realtime:" prefix).
fn strip_topic_prefix(topic: &str) -> &str {
    topic.strip_prefix("realtime:").unwrap_or(topic)
}

/// Parse a Phoenix presence map into `HashMap<key, Vec<meta>>`.
///
/// Supabase sends presence as `{ "key": { "metas": [{ ... }] } }`.
pub(crate) fn parse_presence_map(
    value: &serde_json::Value,
) -> HashMap<String, Vec<serde_json::Value>> {
    let mut result = HashMap::new();
    if let Some(obj) = value.as_object() {
        for (key, val) in obj {
            if let Some(metas) = val.get("metas").and_then(|m| m.as_array()) {
                result.insert(key.clone(), metas.clone());
            }
        }
    }
    result
}

fn reply_reason(payload: &serde_json::Value) -> String {
    payload
        .get("response")
        .and_then(|r| r.get("reason"))
        .and_then(|r| r.as_str())
        .unwrap_or("unknown error")
        .to_string()
}

// ---------------------------------------------------------------------------
// Message Handler
// ---------------------------------------------------------------------------

/// Translate a single incoming Phoenix message into at most one event.
///
/// Replies are matched against each channel's pending join ref; replies to
/// heartbeats, pushes and stale joins produce nothing.
pub(crate) fn handle_phoenix_message(
    msg: &PhoenixMessage,
    channels: &HashMap<String, PendingChannel>,
) -> Option<RealtimeEvent> {
    if msg.topic == "phoenix" {
        return None;
    }
    let topic = strip_topic_prefix(&msg.topic);

    match msg.event.as_str() {
        "phx_reply" => {
            let status = msg.payload.get("status").and_then(|s| s.as_str())?;
            let is_join_reply = channels
                .get(topic)
                .and_then(|ch| ch.join_ref.as_deref())
                .is_some_and(|join_ref| msg.msg_ref.as_deref() == Some(join_ref));

            match (is_join_reply, status == "ok") {
                (true, true) => {
                    debug!(topic = %topic, "Channel joined");
                    Some(RealtimeEvent::ChannelJoined {
                        topic: topic.to_string(),
                    })
                }
                (true, false) => {
                    let message = reply_reason(&msg.payload);
                    warn!(topic = %topic, status = %status, reason = %message, "Channel join rejected");
                    Some(RealtimeEvent::ChannelError {
                        topic: topic.to_string(),
                        message,
                    })
                }
                (false, false) => {
                    warn!(
                        topic = %topic,
                        status = %status,
                        reason = %reply_reason(&msg.payload),
                        "Push rejected"
                    );
                    None
                }
                (false, true) => None,
            }
        }
        "phx_error" if channels.contains_key(topic) => {
            warn!(topic = %topic, "Channel error");
            Some(RealtimeEvent::ChannelError {
                topic: topic.to_string(),
                message: "channel error".to_string(),
            })
        }
        "phx_close" if channels.contains_key(topic) => {
            info!(topic = %topic, "Channel closed");
            Some(RealtimeEvent::ChannelError {
                topic: topic.to_string(),
                message: "channel closed".to_string(),
            })
        }
        "presence_state" => {
            let state = parse_presence_map(&msg.payload);
            debug!(topic = %topic, users = state.len(), "Presence state received");
            Some(RealtimeEvent::PresenceState {
                topic: topic.to_string(),
                state,
            })
        }
        "presence_diff" => {
            let joins = msg
                .payload
                .get("joins")
                .map(parse_presence_map)
                .unwrap_or_default();
            let leaves = msg
                .payload
                .get("leaves")
                .map(parse_presence_map)
                .unwrap_or_default();
            debug!(
                topic = %topic,
                joins = joins.len(),
                leaves = leaves.len(),
                "Presence diff received"
            );
            Some(RealtimeEvent::PresenceDiff {
                topic: topic.to_string(),
                joins,
                leaves,
            })
        }
        _ => {
            debug!(
                topic = %topic,
                event = %msg.event,
                "Unhandled Phoenix event"
            );
            None
        }
    }
}
