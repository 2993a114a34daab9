//! Typing presence for conversations.
//!
//! Each participant announces `isTyping` on a shared presence channel named
//! after the conversation. A [`TypingCoordinator`] joins those channels and
//! hands back a [`TypingSession`] that broadcasts local typing state, expires
//! it after a quiet window, and reports who else is typing.

pub mod identity;
pub mod presence;
pub mod realtime;
pub mod typing;

pub use identity::LocalIdentity;
pub use presence::{
    ChannelError, ChannelSignal, ChannelStatus, LocalPresenceHub, PresenceChannel,
    PresenceProvider, PresenceTable, RealtimePresence,
};
pub use realtime::{RealtimeClient, RealtimeConfig, RealtimeError};
pub use typing::{
    TypingCoordinator, TypingEntry, TypingError, TypingPayload, TypingProfile, TypingRoster,
    TypingSession, TypingSettings, TypingState,
};
