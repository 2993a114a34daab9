//! Full presence state of one channel.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

/// Presence key -> metas, one meta per connection of that key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresenceTable {
    entries: BTreeMap<String, Vec<Value>>,
}

fn phx_ref(meta: &Value) -> Option<&str> {
    meta.get("phx_ref").and_then(Value::as_str)
}

impl PresenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a `presence_state` snapshot. Keys without metas are dropped.
    pub fn from_state(state: HashMap<String, Vec<Value>>) -> Self {
        Self {
            entries: state
                .into_iter()
                .filter(|(_, metas)| !metas.is_empty())
                .collect(),
        }
    }

    /// Fold a `presence_diff` into the table.
    ///
    /// Joined metas go after the key's current metas, replacing any with the
    /// same `phx_ref`. Left metas are removed by `phx_ref`, and keys left
    /// without metas disappear.
    pub fn apply_diff(
        &mut self,
        joins: HashMap<String, Vec<Value>>,
        leaves: HashMap<String, Vec<Value>>,
    ) {
        for (key, joined) in joins {
            let metas = self.entries.entry(key).or_default();
            metas.retain(|current| {
                !joined
                    .iter()
                    .any(|j| phx_ref(j).is_some() && phx_ref(j) == phx_ref(current))
            });
            metas.extend(joined);
        }

        for (key, left) in leaves {
            let Some(metas) = self.entries.get_mut(&key) else {
                continue;
            };
            let left_refs: Vec<&str> = left.iter().filter_map(phx_ref).collect();
            metas.retain(|m| !phx_ref(m).is_some_and(|r| left_refs.contains(&r)));
            if metas.is_empty() {
                self.entries.remove(&key);
            }
        }
    }

    /// Replace every meta of `key`. An empty list removes the key.
    pub fn set(&mut self, key: &str, metas: Vec<Value>) {
        if metas.is_empty() {
            self.entries.remove(key);
        } else {
            self.entries.insert(key.to_string(), metas);
        }
    }

    /// The first meta of `key`, which is what rosters read.
    pub fn first_meta(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).and_then(|metas| metas.first())
    }

    pub fn metas(&self, key: &str) -> &[Value] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(entries: Vec<(&str, Vec<Value>)>) -> HashMap<String, Vec<Value>> {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn from_state_drops_empty_keys() {
        let table = PresenceTable::from_state(map(vec![
            ("alice", vec![json!({"phx_ref": "a1"})]),
            ("ghost", vec![]),
        ]));
        assert_eq!(table.len(), 1);
        assert!(table.contains_key("alice"));
        assert!(!table.contains_key("ghost"));
    }

    #[test]
    fn retrack_replaces_first_meta() {
        let mut table = PresenceTable::from_state(map(vec![(
            "alice",
            vec![json!({"phx_ref": "a1", "isTyping": false})],
        )]));

        table.apply_diff(
            map(vec![("alice", vec![json!({"phx_ref": "a2", "isTyping": true})])]),
            map(vec![("alice", vec![json!({"phx_ref": "a1"})])]),
        );

        assert_eq!(table.metas("alice").len(), 1);
        assert_eq!(table.first_meta("alice").unwrap()["isTyping"], true);
    }

    #[test]
    fn joins_append_after_existing_metas() {
        let mut table = PresenceTable::from_state(map(vec![(
            "alice",
            vec![json!({"phx_ref": "a1", "device": "laptop"})],
        )]));
        table.apply_diff(
            map(vec![("alice", vec![json!({"phx_ref": "a2", "device": "phone"})])]),
            HashMap::new(),
        );
        assert_eq!(table.metas("alice").len(), 2);
        assert_eq!(table.first_meta("alice").unwrap()["device"], "laptop");
    }

    #[test]
    fn rejoin_with_same_ref_is_not_duplicated() {
        let mut table = PresenceTable::new();
        let joins = map(vec![("bob", vec![json!({"phx_ref": "b1"})])]);
        table.apply_diff(joins.clone(), HashMap::new());
        table.apply_diff(joins, HashMap::new());
        assert_eq!(table.metas("bob").len(), 1);
    }

    #[test]
    fn leaving_last_meta_removes_key() {
        let mut table = PresenceTable::from_state(map(vec![
            ("alice", vec![json!({"phx_ref": "a1"})]),
            ("bob", vec![json!({"phx_ref": "b1"})]),
        ]));
        table.apply_diff(
            HashMap::new(),
            map(vec![("bob", vec![json!({"phx_ref": "b1"})])]),
        );
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["alice"]);
    }

    #[test]
    fn leave_for_unknown_key_is_ignored() {
        let mut table = PresenceTable::new();
        table.apply_diff(
            HashMap::new(),
            map(vec![("nobody", vec![json!({"phx_ref": "x"})])]),
        );
        assert!(table.is_empty());
    }

    #[test]
    fn set_with_no_metas_removes_key() {
        let mut table = PresenceTable::new();
        table.set("alice", vec![json!({})]);
        assert!(table.contains_key("alice"));
        table.set("alice", vec![]);
        assert!(table.is_empty());
        assert!(table.metas("alice").is_empty());
    }
}
