//! Public handle for interacting with the Supabase Realtime connection.

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use super::connection::connection_loop;
use super::types::{ChannelConfig, RealtimeCommand, RealtimeConfig, RealtimeError, RealtimeEvent};

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle for interacting with the Supabase Realtime connection.
///
/// Methods only enqueue commands for the background connection task; they
/// never wait for the network. The task stops after [`disconnect`] or once
/// every handle has been dropped.
///
/// [`disconnect`]: RealtimeClient::disconnect
pub struct RealtimeClient {
    command_tx: mpsc::Sender<RealtimeCommand>,
    connected: Arc<RwLock<bool>>,
}

impl RealtimeClient {
    /// Create a new client and start the background connection.
    /// Returns `(client, event_receiver)`.
    pub fn connect(config: RealtimeConfig) -> (Self, mpsc::Receiver<RealtimeEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(64);
        let connected = Arc::new(RwLock::new(false));

        let client = Self {
            command_tx,
            connected: Arc::clone(&connected),
        };

        tokio::spawn(connection_loop(config, connected, event_tx, command_rx));

        (client, event_rx)
    }

    /// Clone the command sender to create a lightweight handle
    /// that can send commands to the same connection.
    pub fn clone_sender(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            connected: Arc::clone(&self.connected),
        }
    }

    async fn send(&self, command: RealtimeCommand) -> Result<(), RealtimeError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| RealtimeError::ConnectionClosed)
    }

    /// Join a Supabase Realtime channel. The join is replayed after every reconnect.
    pub async fn join_channel(&self, topic: &str, config: ChannelConfig) -> Result<(), RealtimeError> {
        self.send(RealtimeCommand::JoinChannel {
            topic: topic.to_string(),
            config,
        })
        .await
    }

    /// Leave a channel.
    pub async fn leave_channel(&self, topic: &str) -> Result<(), RealtimeError> {
        self.send(RealtimeCommand::LeaveChannel {
            topic: topic.to_string(),
        })
        .await
    }

    /// Non-async leave for use from `Drop`. Fails if the command queue is full.
    pub fn try_leave_channel(&self, topic: &str) -> Result<(), RealtimeError> {
        self.command_tx
            .try_send(RealtimeCommand::LeaveChannel {
                topic: topic.to_string(),
            })
            .map_err(|_| RealtimeError::ConnectionClosed)
    }

    /// Track presence on a channel.
    pub async fn presence_track(
        &self,
        topic: &str,
        payload: serde_json::Value,
    ) -> Result<(), RealtimeError> {
        self.send(RealtimeCommand::PresenceTrack {
            topic: topic.to_string(),
            payload,
        })
        .await
    }

    /// Untrack presence on a channel.
    pub async fn presence_untrack(&self, topic: &str) -> Result<(), RealtimeError> {
        self.send(RealtimeCommand::PresenceUntrack {
            topic: topic.to_string(),
        })
        .await
    }

    /// Check if connected.
    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    /// Leave every channel, close the socket, and stop reconnecting.
    pub async fn disconnect(&self) -> Result<(), RealtimeError> {
        self.send(RealtimeCommand::Disconnect).await
    }
}
