//! Local identity configuration.

use serde::{Deserialize, Serialize};

/// Who this client announces itself as. Empty fields are filled in at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub user_id: String,
    pub username: String,
    pub display_name: String,
}
