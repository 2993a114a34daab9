//! In-process presence hub.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::channel::{ChannelError, ChannelSignal, ChannelStatus, PresenceChannel, PresenceProvider};
use super::table::PresenceTable;

const SIGNAL_BUFFER: usize = 256;

struct Member {
    conn_id: String,
    key: String,
    meta: Option<Value>,
    /// Newest table not yet forwarded. Older pending tables are overwritten.
    latest: watch::Sender<PresenceTable>,
}

type Topics = HashMap<String, Vec<Member>>;

/// Presence channels shared between sessions of one process, with no network.
///
/// Each subscribed channel is one connection: it contributes one meta under
/// its presence key once it tracks. Every subscriber of a topic receives a
/// `Sync` after each track or removal. A subscriber that falls behind skips
/// intermediate tables but always receives the newest one.
#[derive(Clone, Default)]
pub struct LocalPresenceHub {
    topics: Arc<Mutex<Topics>>,
}

impl LocalPresenceHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Topics> {
        self.topics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current presence table of `topic`.
    pub fn snapshot(&self, topic: &str) -> PresenceTable {
        self.lock()
            .get(topic)
            .map(|members| table_of(members))
            .unwrap_or_default()
    }

    /// Number of subscribed channels on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.lock().get(topic).map_or(0, Vec::len)
    }

    fn join(&self, topic: &str, key: &str) -> (String, mpsc::Receiver<ChannelSignal>) {
        let conn_id = parley_common::new_id();
        let (tx, rx) = mpsc::channel(SIGNAL_BUFFER);

        let mut topics = self.lock();
        let members = topics.entry(topic.to_string()).or_default();
        let current = table_of(members);
        let _ = tx.try_send(ChannelSignal::Status(ChannelStatus::Subscribed));
        let _ = tx.try_send(ChannelSignal::Sync(current.clone()));
        let (latest, pending) = watch::channel(current);
        tokio::spawn(forward_syncs(pending, tx));
        members.push(Member {
            conn_id: conn_id.clone(),
            key: key.to_string(),
            meta: None,
            latest,
        });
        debug!(topic = %topic, key = %key, "Local presence subscribed");

        (conn_id, rx)
    }

    fn update(&self, topic: &str, conn_id: &str, mut payload: Value) -> bool {
        let mut topics = self.lock();
        let Some(members) = topics.get_mut(topic) else {
            return false;
        };
        let Some(member) = members.iter_mut().find(|m| m.conn_id == conn_id) else {
            return false;
        };
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("phx_ref".into(), Value::String(conn_id.to_string()));
        }
        member.meta = Some(payload);
        broadcast(topic, members);
        true
    }

    fn leave(&self, topic: &str, conn_id: &str) {
        let mut topics = self.lock();
        let Some(members) = topics.get_mut(topic) else {
            return;
        };
        members.retain(|m| m.conn_id != conn_id);
        if members.is_empty() {
            topics.remove(topic);
        } else {
            broadcast(topic, members);
        }
        debug!(topic = %topic, "Local presence removed");
    }
}

fn table_of(members: &[Member]) -> PresenceTable {
    let mut state: HashMap<String, Vec<Value>> = HashMap::new();
    for member in members {
        if let Some(meta) = &member.meta {
            state.entry(member.key.clone()).or_default().push(meta.clone());
        }
    }
    PresenceTable::from_state(state)
}

fn broadcast(topic: &str, members: &[Member]) {
    let table = table_of(members);
    for member in members {
        member.latest.send_replace(table.clone());
    }
    debug!(topic = %topic, subscribers = members.len(), "Local presence sync");
}

/// Deliver the newest pending table to one subscriber until it leaves.
async fn forward_syncs(mut pending: watch::Receiver<PresenceTable>, signals: mpsc::Sender<ChannelSignal>) {
    while pending.changed().await.is_ok() {
        let table = pending.borrow_and_update().clone();
        if signals.send(ChannelSignal::Sync(table)).await.is_err() {
            break;
        }
    }
}

impl PresenceProvider for LocalPresenceHub {
    fn channel(&self, topic: &str, presence_key: &str) -> Box<dyn PresenceChannel> {
        Box::new(LocalChannel {
            hub: self.clone(),
            topic: topic.to_string(),
            presence_key: presence_key.to_string(),
            conn_id: None,
        })
    }
}

struct LocalChannel {
    hub: LocalPresenceHub,
    topic: String,
    presence_key: String,
    conn_id: Option<String>,
}

#[async_trait]
impl PresenceChannel for LocalChannel {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn subscribe(&mut self) -> Result<mpsc::Receiver<ChannelSignal>, ChannelError> {
        if self.conn_id.is_some() {
            return Err(ChannelError::AlreadySubscribed(self.topic.clone()));
        }
        let (conn_id, rx) = self.hub.join(&self.topic, &self.presence_key);
        self.conn_id = Some(conn_id);
        Ok(rx)
    }

    async fn track(&mut self, payload: Value) -> Result<(), ChannelError> {
        let conn_id = self
            .conn_id
            .as_deref()
            .ok_or_else(|| ChannelError::NotSubscribed(self.topic.clone()))?;
        if self.hub.update(&self.topic, conn_id, payload) {
            Ok(())
        } else {
            Err(ChannelError::NotSubscribed(self.topic.clone()))
        }
    }

    async fn remove(&mut self) -> Result<(), ChannelError> {
        if let Some(conn_id) = self.conn_id.take() {
            self.hub.leave(&self.topic, &conn_id);
        }
        Ok(())
    }
}

impl Drop for LocalChannel {
    fn drop(&mut self) {
        if let Some(conn_id) = self.conn_id.take() {
            self.hub.leave(&self.topic, &conn_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn next_sync(rx: &mut mpsc::Receiver<ChannelSignal>) -> PresenceTable {
        loop {
            match rx.recv().await.expect("signal stream ended") {
                ChannelSignal::Sync(table) => return table,
                ChannelSignal::Status(_) => continue,
            }
        }
    }

    #[tokio::test]
    async fn new_subscriber_gets_status_and_current_table() {
        let hub = LocalPresenceHub::new();
        let mut alice = hub.channel("typing-c1", "alice");
        let _alice_rx = alice.subscribe().await.unwrap();
        alice.track(json!({"isTyping": true})).await.unwrap();

        let mut bob = hub.channel("typing-c1", "bob");
        let mut bob_rx = bob.subscribe().await.unwrap();
        assert_eq!(
            bob_rx.recv().await.unwrap(),
            ChannelSignal::Status(ChannelStatus::Subscribed)
        );
        let table = next_sync(&mut bob_rx).await;
        assert_eq!(table.first_meta("alice").unwrap()["isTyping"], true);
        assert!(!table.contains_key("bob"));
    }

    #[tokio::test]
    async fn track_syncs_every_subscriber() {
        let hub = LocalPresenceHub::new();
        let mut alice = hub.channel("typing-c1", "alice");
        let mut bob = hub.channel("typing-c1", "bob");
        let mut alice_rx = alice.subscribe().await.unwrap();
        let mut bob_rx = bob.subscribe().await.unwrap();
        next_sync(&mut alice_rx).await;
        next_sync(&mut bob_rx).await;

        bob.track(json!({"isTyping": false, "username": ""})).await.unwrap();
        assert!(next_sync(&mut alice_rx).await.contains_key("bob"));
        assert!(next_sync(&mut bob_rx).await.contains_key("bob"));
    }

    #[tokio::test]
    async fn retrack_overwrites_own_meta() {
        let hub = LocalPresenceHub::new();
        let mut alice = hub.channel("typing-c1", "alice");
        let _rx = alice.subscribe().await.unwrap();
        alice.track(json!({"isTyping": true})).await.unwrap();
        alice.track(json!({"isTyping": false})).await.unwrap();

        let table = hub.snapshot("typing-c1");
        assert_eq!(table.metas("alice").len(), 1);
        assert_eq!(table.first_meta("alice").unwrap()["isTyping"], false);
    }

    #[tokio::test]
    async fn remove_drops_member_and_notifies_others() {
        let hub = LocalPresenceHub::new();
        let mut alice = hub.channel("typing-c1", "alice");
        let mut bob = hub.channel("typing-c1", "bob");
        let _alice_rx = alice.subscribe().await.unwrap();
        let mut bob_rx = bob.subscribe().await.unwrap();
        alice.track(json!({"isTyping": true})).await.unwrap();
        next_sync(&mut bob_rx).await;
        next_sync(&mut bob_rx).await;

        alice.remove().await.unwrap();
        assert!(next_sync(&mut bob_rx).await.is_empty());
        assert_eq!(hub.subscriber_count("typing-c1"), 1);

        // Idempotent.
        alice.remove().await.unwrap();
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let hub = LocalPresenceHub::new();
        let mut one = hub.channel("typing-c1", "alice");
        let mut two = hub.channel("typing-c2", "alice");
        let _rx1 = one.subscribe().await.unwrap();
        let _rx2 = two.subscribe().await.unwrap();
        one.track(json!({"isTyping": true})).await.unwrap();

        assert!(hub.snapshot("typing-c1").contains_key("alice"));
        assert!(hub.snapshot("typing-c2").is_empty());
    }

    #[tokio::test]
    async fn subscribe_twice_and_track_before_subscribe_fail() {
        let hub = LocalPresenceHub::new();
        let mut channel = hub.channel("typing-c1", "alice");
        assert_eq!(
            channel.track(json!({})).await.unwrap_err(),
            ChannelError::NotSubscribed("typing-c1".into())
        );
        let _rx = channel.subscribe().await.unwrap();
        assert_eq!(
            channel.subscribe().await.unwrap_err(),
            ChannelError::AlreadySubscribed("typing-c1".into())
        );
    }

    #[tokio::test]
    async fn dropping_channel_leaves_topic() {
        let hub = LocalPresenceHub::new();
        let mut channel = hub.channel("typing-c1", "alice");
        let _rx = channel.subscribe().await.unwrap();
        assert_eq!(hub.subscriber_count("typing-c1"), 1);
        drop(channel);
        assert_eq!(hub.subscriber_count("typing-c1"), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_still_gets_latest_table() {
        let hub = LocalPresenceHub::new();
        let mut alice = hub.channel("typing-c1", "alice");
        let mut bob = hub.channel("typing-c1", "bob");
        let _alice_rx = alice.subscribe().await.unwrap();
        let mut bob_rx = bob.subscribe().await.unwrap();

        // Far more updates than the signal buffer holds, none read yet.
        let last = SIGNAL_BUFFER * 2;
        for n in 0..=last {
            alice
                .track(json!({"isTyping": n != last, "n": n}))
                .await
                .unwrap();
            tokio::task::yield_now().await;
        }

        let newest = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                let table = next_sync(&mut bob_rx).await;
                if table.first_meta("alice").map(|m| m["n"].clone()) == Some(json!(last)) {
                    return table;
                }
            }
        })
        .await
        .expect("newest table was delivered");
        assert_eq!(newest.first_meta("alice").unwrap()["isTyping"], false);
    }

    #[tokio::test]
    async fn same_key_on_two_connections_has_two_metas() {
        let hub = LocalPresenceHub::new();
        let mut laptop = hub.channel("typing-c1", "alice");
        let mut phone = hub.channel("typing-c1", "alice");
        let _rx1 = laptop.subscribe().await.unwrap();
        let _rx2 = phone.subscribe().await.unwrap();
        laptop.track(json!({"device": "laptop"})).await.unwrap();
        phone.track(json!({"device": "phone"})).await.unwrap();

        let table = hub.snapshot("typing-c1");
        assert_eq!(table.metas("alice").len(), 2);
        assert_eq!(table.first_meta("alice").unwrap()["device"], "laptop");
    }
}
