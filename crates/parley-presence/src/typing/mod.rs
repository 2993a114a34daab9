//! Typing presence: who is typing in a conversation.
//!
//! [`TypingCoordinator::join`] opens the conversation's presence channel and
//! returns a [`TypingSession`]. The session is an actor task that owns the
//! channel, the local typing state, and its expiry deadline; the handle only
//! enqueues commands.

mod coordinator;
mod error;
mod payload;
mod roster;
mod session;
mod state;
mod timer;


pub use coordinator::{TypingCoordinator, TypingSettings};
pub use error::TypingError;
pub use payload::{TypingPayload, TypingProfile};
pub use roster::{TypingEntry, TypingRoster};
pub use session::TypingSession;
pub use state::TypingState;
