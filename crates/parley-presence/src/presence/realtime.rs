//! [`PresenceProvider`] over a Supabase Realtime connection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::channel::{ChannelError, ChannelSignal, ChannelStatus, PresenceChannel, PresenceProvider};
use super::table::PresenceTable;
use crate::realtime::{ChannelConfig, RealtimeClient, RealtimeConfig, RealtimeError, RealtimeEvent};

const SIGNAL_BUFFER: usize = 256;

/// Per-topic signal route and the presence table folded from its events.
struct Route {
    signals: mpsc::Sender<ChannelSignal>,
    table: PresenceTable,
}

type Routes = Arc<Mutex<HashMap<String, Route>>>;

fn lock(routes: &Routes) -> MutexGuard<'_, HashMap<String, Route>> {
    routes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Presence channels multiplexed over one realtime connection.
///
/// At most one channel per topic may be subscribed at a time.
pub struct RealtimePresence {
    client: RealtimeClient,
    routes: Routes,
    access_token: Option<String>,
}

impl RealtimePresence {
    /// Open the realtime connection in the background and start routing its events.
    pub fn connect(config: RealtimeConfig) -> Self {
        let access_token = config.access_token.clone();
        let (client, events) = RealtimeClient::connect(config);
        Self::from_client(client, events, access_token)
    }

    /// Wrap an existing client. `events` must be the receiver returned with it.
    pub fn from_client(
        client: RealtimeClient,
        events: mpsc::Receiver<RealtimeEvent>,
        access_token: Option<String>,
    ) -> Self {
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        tokio::spawn(route_events(events, Arc::clone(&routes)));
        Self {
            client,
            routes,
            access_token,
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.client.is_connected().await
    }

    /// Leave every channel and stop the connection for good.
    pub async fn disconnect(&self) -> Result<(), RealtimeError> {
        self.client.disconnect().await
    }
}

impl PresenceProvider for RealtimePresence {
    fn channel(&self, topic: &str, presence_key: &str) -> Box<dyn PresenceChannel> {
        Box::new(RealtimeChannel {
            client: self.client.clone_sender(),
            routes: Arc::clone(&self.routes),
            topic: topic.to_string(),
            presence_key: presence_key.to_string(),
            access_token: self.access_token.clone(),
            subscribed: false,
        })
    }
}

// ---------------------------------------------------------------------------
// Event routing
// ---------------------------------------------------------------------------

async fn route_events(mut events: mpsc::Receiver<RealtimeEvent>, routes: Routes) {
    while let Some(event) = events.recv().await {
        for (signals, signal) in dispatch(&routes, event) {
            if signals.send(signal).await.is_err() {
                debug!("Presence signal receiver dropped");
            }
        }
    }

    info!("Realtime event stream ended");
    let closed: Vec<_> = lock(&routes)
        .values_mut()
        .map(|r| {
            r.table = PresenceTable::new();
            r.signals.clone()
        })
        .collect();
    for signals in closed {
        let _ = signals.send(ChannelSignal::Status(ChannelStatus::Closed)).await;
    }
}

/// Update the routing table for `event` and return the signals to deliver.
fn dispatch(routes: &Routes, event: RealtimeEvent) -> Vec<(mpsc::Sender<ChannelSignal>, ChannelSignal)> {
    let mut routes = lock(routes);

    match event {
        RealtimeEvent::ChannelJoined { topic } => routes
            .get(&topic)
            .map(|r| (r.signals.clone(), ChannelSignal::Status(ChannelStatus::Subscribed)))
            .into_iter()
            .collect(),
        RealtimeEvent::ChannelError { topic, message } => routes
            .get_mut(&topic)
            .map(|r| {
                r.table = PresenceTable::new();
                (r.signals.clone(), ChannelSignal::Status(ChannelStatus::Errored(message)))
            })
            .into_iter()
            .collect(),
        RealtimeEvent::PresenceState { topic, state } => routes
            .get_mut(&topic)
            .map(|r| {
                r.table = PresenceTable::from_state(state);
                (r.signals.clone(), ChannelSignal::Sync(r.table.clone()))
            })
            .into_iter()
            .collect(),
        RealtimeEvent::PresenceDiff {
            topic,
            joins,
            leaves,
        } => routes
            .get_mut(&topic)
            .map(|r| {
                r.table.apply_diff(joins, leaves);
                (r.signals.clone(), ChannelSignal::Sync(r.table.clone()))
            })
            .into_iter()
            .collect(),
        RealtimeEvent::Disconnected => routes
            .values_mut()
            .map(|r| {
                r.table = PresenceTable::new();
                (r.signals.clone(), ChannelSignal::Status(ChannelStatus::Disconnected))
            })
            .collect(),
        RealtimeEvent::Connected => {
            debug!("Realtime connected");
            Vec::new()
        }
        RealtimeEvent::Error(message) => {
            warn!(error = %message, "Realtime connection error");
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

struct RealtimeChannel {
    client: RealtimeClient,
    routes: Routes,
    topic: String,
    presence_key: String,
    access_token: Option<String>,
    subscribed: bool,
}

#[async_trait]
impl PresenceChannel for RealtimeChannel {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn subscribe(&mut self) -> Result<mpsc::Receiver<ChannelSignal>, ChannelError> {
        if self.subscribed {
            return Err(ChannelError::AlreadySubscribed(self.topic.clone()));
        }

        let (tx, rx) = mpsc::channel(SIGNAL_BUFFER);
        {
            let mut routes = lock(&self.routes);
            if routes.contains_key(&self.topic) {
                return Err(ChannelError::AlreadySubscribed(self.topic.clone()));
            }
            routes.insert(
                self.topic.clone(),
                Route {
                    signals: tx,
                    table: PresenceTable::new(),
                },
            );
        }

        let config = ChannelConfig::presence(&self.presence_key, self.access_token.clone());
        if self.client.join_channel(&self.topic, config).await.is_err() {
            lock(&self.routes).remove(&self.topic);
            return Err(ChannelError::TransportClosed);
        }

        self.subscribed = true;
        Ok(rx)
    }

    async fn track(&mut self, payload: serde_json::Value) -> Result<(), ChannelError> {
        if !self.subscribed {
            return Err(ChannelError::NotSubscribed(self.topic.clone()));
        }
        self.client
            .presence_track(&self.topic, payload)
            .await
            .map_err(|_| ChannelError::TransportClosed)
    }

    async fn remove(&mut self) -> Result<(), ChannelError> {
        if !self.subscribed {
            return Ok(());
        }
        self.subscribed = false;
        lock(&self.routes).remove(&self.topic);

        let _ = self.client.presence_untrack(&self.topic).await;
        self.client
            .leave_channel(&self.topic)
            .await
            .map_err(|_| ChannelError::TransportClosed)
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        if self.subscribed {
            lock(&self.routes).remove(&self.topic);
            if let Err(e) = self.client.try_leave_channel(&self.topic) {
                debug!(topic = %self.topic, error = %e, "Could not leave channel on drop");
            }
        }
    }
}
