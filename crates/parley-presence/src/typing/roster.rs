//! Projection of a presence table onto "who is typing".

use std::collections::BTreeMap;

use super::payload::TypingPayload;
use crate::presence::PresenceTable;

/// A remote participant who is currently typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingEntry {
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    label: String,
}

impl TypingEntry {
    /// Display name, else username, else the configured fallback.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Everyone typing in one conversation, excluding the local participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingRoster {
    conversation_id: String,
    entries: BTreeMap<String, TypingEntry>,
}

impl TypingRoster {
    pub fn empty(conversation_id: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            entries: BTreeMap::new(),
        }
    }

    /// Build the roster from a full presence snapshot.
    ///
    /// `local_key` is skipped, each key is read from its first meta, and
    /// only metas with `isTyping: true` are kept.
    pub fn from_table(
        conversation_id: &str,
        table: &PresenceTable,
        local_key: &str,
        fallback_username: &str,
    ) -> Self {
        let entries = table
            .keys()
            .filter(|key| *key != local_key)
            .filter_map(|key| {
                let payload = TypingPayload::from_meta(table.first_meta(key)?);
                if !payload.is_typing {
                    return None;
                }
                let label = if !payload.display_name.is_empty() {
                    payload.display_name.clone()
                } else if !payload.username.is_empty() {
                    payload.username.clone()
                } else {
                    fallback_username.to_string()
                };
                let entry = TypingEntry {
                    user_id: key.to_string(),
                    username: payload.username,
                    display_name: (!payload.display_name.is_empty()).then_some(payload.display_name),
                    label,
                };
                Some((key.to_string(), entry))
            })
            .collect();

        Self {
            conversation_id: conversation_id.to_string(),
            entries,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn entries(&self) -> impl Iterator<Item = &TypingEntry> {
        self.entries.values()
    }

    pub fn get(&self, user_id: &str) -> Option<&TypingEntry> {
        self.entries.get(user_id)
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.entries.contains_key(user_id)
    }

    /// Labels ordered by user id.
    pub fn labels(&self) -> Vec<&str> {
        self.entries.values().map(TypingEntry::label).collect()
    }

    pub fn user_ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
