//! Joins conversations' typing channels.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use super::error::TypingError;
use super::payload::TypingPayload;
use super::session::{SessionActor, SessionParts, TypingSession};
use crate::identity::LocalIdentity;
use crate::presence::{ChannelSignal, ChannelStatus, PresenceProvider, PresenceTable};

/// Tunables for typing presence.
#[derive(Debug, Clone)]
pub struct TypingSettings {
    /// Typing ends on its own this long after the last `start_typing`.
    pub quiet_window: Duration,
    /// Upper bound on waiting for the channel to report `Subscribed`.
    pub join_timeout: Duration,
    pub channel_prefix: String,
    /// Label for remote participants that announce no name.
    pub fallback_username: String,
}

impl Default for TypingSettings {
    fn default() -> Self {
        Self {
            quiet_window: Duration::from_secs(3),
            join_timeout: Duration::from_secs(10),
            channel_prefix: "typing-".into(),
            fallback_username: "User".into(),
        }
    }
}

type Registry = Arc<Mutex<HashSet<(String, String)>>>;

fn lock(registry: &Registry) -> MutexGuard<'_, HashSet<(String, String)>> {
    registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Claim on one (conversation, user) pair, released on drop.
pub(crate) struct Membership {
    registry: Registry,
    key: (String, String),
}

impl Membership {
    fn acquire(registry: &Registry, conversation_id: &str, user_id: &str) -> Option<Self> {
        let key = (conversation_id.to_string(), user_id.to_string());
        if !lock(registry).insert(key.clone()) {
            return None;
        }
        Some(Self {
            registry: Arc::clone(registry),
            key,
        })
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        lock(&self.registry).remove(&self.key);
    }
}

/// Entry point for typing presence over any [`PresenceProvider`].
///
/// Cloning shares the provider and the membership registry.
#[derive(Clone)]
pub struct TypingCoordinator {
    provider: Arc<dyn PresenceProvider>,
    settings: TypingSettings,
    memberships: Registry,
}

impl TypingCoordinator {
    pub fn new(provider: Arc<dyn PresenceProvider>) -> Self {
        Self::with_settings(provider, TypingSettings::default())
    }

    pub fn with_settings(provider: Arc<dyn PresenceProvider>, settings: TypingSettings) -> Self {
        Self {
            provider,
            settings,
            memberships: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn settings(&self) -> &TypingSettings {
        &self.settings
    }

    /// Channel name for a conversation.
    pub fn channel_name(&self, conversation_id: &str) -> String {
        format!("{}{}", self.settings.channel_prefix, conversation_id.trim())
    }

    /// Whether `user_id` currently holds a session for `conversation_id`.
    pub fn is_joined(&self, conversation_id: &str, user_id: &str) -> bool {
        lock(&self.memberships).contains(&(conversation_id.trim().to_string(), user_id.to_string()))
    }

    /// Join typing presence for a conversation.
    ///
    /// Waits for the channel to be ready, then announces `isTyping: false`.
    /// A failed initial announce is logged and does not fail the join.
    pub async fn join(
        &self,
        conversation_id: &str,
        identity: &LocalIdentity,
    ) -> Result<TypingSession, TypingError> {
        let conversation_id = conversation_id.trim();
        if conversation_id.is_empty() {
            return Err(TypingError::EmptyConversation);
        }
        if !identity.is_resolved() {
            return Err(TypingError::Unauthenticated);
        }
        let membership = Membership::acquire(&self.memberships, conversation_id, &identity.user_id)
            .ok_or_else(|| TypingError::AlreadyJoined {
                conversation_id: conversation_id.to_string(),
            })?;

        let topic = self.channel_name(conversation_id);
        let mut channel = self.provider.channel(&topic, &identity.user_id);

        let mut signals = channel
            .subscribe()
            .await
            .map_err(|e| TypingError::ChannelUnavailable {
                topic: topic.clone(),
                reason: e.to_string(),
            })?;

        let backlog = match wait_until_subscribed(&mut signals, self.settings.join_timeout).await {
            Ok(backlog) => backlog,
            Err(reason) => {
                if let Err(e) = channel.remove().await {
                    warn!(topic = %topic, error = %e, "Failed to remove unavailable channel");
                }
                let err = TypingError::ChannelUnavailable { topic, reason };
                warn!(error = %err, "Typing indicators unavailable");
                return Err(err);
            }
        };

        let mut actor = SessionActor::new(SessionParts {
            conversation_id: conversation_id.to_string(),
            local_key: identity.user_id.clone(),
            fallback_username: self.settings.fallback_username.clone(),
            quiet_window: self.settings.quiet_window,
            channel,
            signals,
            membership,
        });
        actor.announce(TypingPayload::idle()).await;
        if let Some(table) = backlog {
            actor.apply_table(&table);
        }

        info!(topic = %topic, user_id = %identity.user_id, "Joined typing channel");
        Ok(TypingSession::spawn(actor))
    }
}

/// Wait for `Subscribed`, keeping the latest snapshot that arrived first.
async fn wait_until_subscribed(
    signals: &mut mpsc::Receiver<ChannelSignal>,
    timeout: Duration,
) -> Result<Option<PresenceTable>, String> {
    let wait = async {
        let mut latest = None;
        loop {
            match signals.recv().await {
                Some(ChannelSignal::Status(ChannelStatus::Subscribed)) => return Ok(latest),
                // The transport reconnects and rejoins on its own.
                Some(ChannelSignal::Status(ChannelStatus::Disconnected)) => continue,
                Some(ChannelSignal::Status(ChannelStatus::Errored(reason))) => return Err(reason),
                Some(ChannelSignal::Status(ChannelStatus::Closed)) => {
                    return Err("channel closed".to_string())
                }
                Some(ChannelSignal::Sync(table)) => latest = Some(table),
                None => return Err("presence transport closed".to_string()),
            }
        }
    };

    tokio::time::timeout(timeout, wait)
        .await
        .unwrap_or_else(|_| Err(format!("not subscribed within {}ms", timeout.as_millis())))
}
