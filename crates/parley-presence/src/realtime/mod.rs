//! Thin Supabase Realtime client over the Phoenix Channels v1 protocol.
//!
//! One background task owns the WebSocket. It sends heartbeats, joins and
//! leaves channels, forwards presence track/untrack, and reconnects with
//! exponential backoff, rejoining every open channel and re-tracking its
//! last presence payload.

mod client;
mod connection;
mod handler;
mod types;

pub use client::RealtimeClient;
pub use types::{
    BroadcastConfig, ChannelConfig, PhoenixMessage, PresenceConfig, RealtimeConfig, RealtimeError,
    RealtimeEvent,
};
