//! Presence channel abstraction and its providers.
//!
//! [`PresenceProvider`] hands out named [`PresenceChannel`]s. Two providers
//! ship here: [`RealtimePresence`] over Supabase Realtime and
//! [`LocalPresenceHub`] for presence shared inside one process.

mod channel;
mod local;
mod realtime;
mod table;

pub use channel::{ChannelError, ChannelSignal, ChannelStatus, PresenceChannel, PresenceProvider};
pub use local::LocalPresenceHub;
pub use realtime::RealtimePresence;
pub use table::PresenceTable;
