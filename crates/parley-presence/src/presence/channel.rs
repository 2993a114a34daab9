//! The channel seam between typing sessions and presence transports.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::table::PresenceTable;

/// Lifecycle status reported by a subscribed channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    /// The channel is ready; `track` will be seen by other members.
    Subscribed,
    /// The server rejected the join or reported a channel error.
    Errored(String),
    /// The underlying transport dropped; it may rejoin on its own.
    Disconnected,
    /// The channel was closed and will not come back.
    Closed,
}

/// Something a subscribed channel delivers, in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSignal {
    Status(ChannelStatus),
    /// The full presence table after a member change.
    Sync(PresenceTable),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel {0} is already subscribed")]
    AlreadySubscribed(String),
    #[error("channel {0} is not subscribed")]
    NotSubscribed(String),
    #[error("presence transport is closed")]
    TransportClosed,
    #[error("channel rejected: {0}")]
    Rejected(String),
}

/// Source of named presence channels.
pub trait PresenceProvider: Send + Sync {
    /// A handle to `topic`, announcing as `presence_key`. Nothing happens on
    /// the wire until [`PresenceChannel::subscribe`].
    fn channel(&self, topic: &str, presence_key: &str) -> Box<dyn PresenceChannel>;
}

/// One membership in a shared presence channel.
///
/// Every member writes only its own key; last write wins per key.
#[async_trait]
pub trait PresenceChannel: Send {
    fn topic(&self) -> &str;

    /// Activate the channel and return its signal stream.
    async fn subscribe(&mut self) -> Result<mpsc::Receiver<ChannelSignal>, ChannelError>;

    /// Announce or overwrite this member's payload.
    async fn track(&mut self, payload: serde_json::Value) -> Result<(), ChannelError>;

    /// Untrack, leave, and release the channel. Safe to call more than once.
    async fn remove(&mut self) -> Result<(), ChannelError>;
}
