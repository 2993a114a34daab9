//! Configuration schema types for Parley.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod identity;
mod realtime;
mod system;
mod typing;

pub use identity::*;
pub use realtime::*;
pub use system::*;
pub use typing::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Parley.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub realtime: RealtimeConfig,
    pub typing: TypingConfig,
    pub identity: IdentityConfig,
    pub logging: LoggingConfig,
}
