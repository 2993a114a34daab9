use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::typing::TypingProfile;

/// Who the local participant announces itself as.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct LocalIdentity {
    /// Presence key. Empty means the identity is not resolved yet.
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    /// Optional Supabase Auth JWT for authenticated channels.
    #[serde(skip)]
    pub access_token: Option<String>,
}

impl std::fmt::Debug for LocalIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIdentity")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("display_name", &self.display_name)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl LocalIdentity {
    /// A fresh anonymous identity with a random id.
    pub fn generate(username: &str) -> Self {
        Self {
            user_id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            display_name: None,
            access_token: None,
        }
    }

    /// Create an identity from a Supabase Auth session.
    pub fn from_supabase_auth(user_id: String, username: String, access_token: String) -> Self {
        Self {
            user_id,
            username,
            display_name: None,
            access_token: Some(access_token),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        self.display_name = (!display_name.is_empty()).then_some(display_name);
        self
    }

    pub fn is_resolved(&self) -> bool {
        !self.user_id.trim().is_empty()
    }

    /// The label this identity shows while typing.
    pub fn profile(&self) -> TypingProfile {
        TypingProfile {
            username: self.username.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_identity_is_resolved() {
        let identity = LocalIdentity::generate("alice");
        assert!(identity.is_resolved());
        assert_eq!(identity.username, "alice");
        assert!(identity.access_token.is_none());
    }

    #[test]
    fn default_identity_is_unresolved() {
        assert!(!LocalIdentity::default().is_resolved());
    }

    #[test]
    fn debug_redacts_token() {
        let identity = LocalIdentity::from_supabase_auth("u1".into(), "alice".into(), "jwt-secret".into());
        assert!(!format!("{identity:?}").contains("jwt-secret"));
    }

    #[test]
    fn empty_display_name_is_none() {
        let identity = LocalIdentity::generate("alice").with_display_name("");
        assert!(identity.display_name.is_none());
        let identity = identity.with_display_name("Alice A.");
        assert_eq!(identity.profile().display_name.as_deref(), Some("Alice A."));
    }
}
