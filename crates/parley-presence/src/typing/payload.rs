//! Wire form of a participant's typing state.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The label a participant types under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypingProfile {
    pub username: String,
    pub display_name: Option<String>,
}

impl From<&str> for TypingProfile {
    fn from(username: &str) -> Self {
        Self {
            username: username.to_string(),
            display_name: None,
        }
    }
}

impl From<String> for TypingProfile {
    fn from(username: String) -> Self {
        Self {
            username,
            display_name: None,
        }
    }
}

/// `{ "isTyping": bool, "username": string, "display_name": string }`.
///
/// Idle payloads carry empty names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingPayload {
    #[serde(rename = "isTyping", default)]
    pub is_typing: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub display_name: String,
}

impl TypingPayload {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn typing(profile: &TypingProfile) -> Self {
        Self {
            is_typing: true,
            username: profile.username.clone(),
            display_name: profile.display_name.clone().unwrap_or_default(),
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "isTyping": self.is_typing,
            "username": self.username,
            "display_name": self.display_name,
        })
    }

    /// Decode a presence meta. Missing or mistyped fields read as `false`/empty,
    /// and transport fields such as `phx_ref` are ignored.
    pub fn from_meta(meta: &Value) -> Self {
        let text = |field: &str| {
            meta.get(field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            is_typing: meta.get("isTyping").and_then(Value::as_bool).unwrap_or(false),
            username: text("username"),
            display_name: text("display_name"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_payload_wire_shape() {
        let profile = TypingProfile {
            username: "alice".into(),
            display_name: Some("Alice".into()),
        };
        assert_eq!(
            TypingPayload::typing(&profile).to_value(),
            json!({"isTyping": true, "username": "alice", "display_name": "Alice"})
        );
        assert_eq!(
            TypingPayload::idle().to_value(),
            json!({"isTyping": false, "username": "", "display_name": ""})
        );
    }

    #[test]
    fn from_meta_ignores_transport_fields() {
        let meta = json!({"phx_ref": "F1", "isTyping": true, "username": "bob", "display_name": ""});
        let payload = TypingPayload::from_meta(&meta);
        assert!(payload.is_typing);
        assert_eq!(payload.username, "bob");
    }

    #[test]
    fn from_meta_defaults_missing_and_null_fields() {
        let payload = TypingPayload::from_meta(&json!({"username": null}));
        assert_eq!(payload, TypingPayload::idle());

        let payload = TypingPayload::from_meta(&json!({"isTyping": "yes"}));
        assert!(!payload.is_typing);
    }

    #[test]
    fn serde_uses_camel_case_flag() {
        let payload: TypingPayload = serde_json::from_str(r#"{"isTyping": true}"#).unwrap();
        assert!(payload.is_typing);
        assert!(payload.username.is_empty());
    }
}
