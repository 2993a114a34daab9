//! Session handle and the actor task that owns one typing membership.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

use super::coordinator::Membership;
use super::error::TypingError;
use super::payload::{TypingPayload, TypingProfile};
use super::roster::TypingRoster;
use super::state::{LocalTypingState, TypingState};
use crate::presence::{ChannelSignal, ChannelStatus, PresenceChannel, PresenceTable};

type RosterListener = Box<dyn Fn(&TypingRoster) + Send + 'static>;

enum SessionCommand {
    StartTyping(TypingProfile),
    StopTyping,
    Listen(RosterListener),
    Roster(oneshot::Sender<TypingRoster>),
    State(oneshot::Sender<TypingState>),
    Leave(Option<oneshot::Sender<()>>),
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// An active typing membership in one conversation.
///
/// Methods enqueue work for the session task and return immediately.
/// Dropping the handle leaves the channel in the background; call
/// [`leave`](Self::leave) to wait for teardown.
pub struct TypingSession {
    conversation_id: String,
    topic: String,
    user_id: String,
    commands: Option<mpsc::UnboundedSender<SessionCommand>>,
    task: Option<JoinHandle<()>>,
}

impl TypingSession {
    pub(crate) fn spawn(actor: SessionActor) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let conversation_id = actor.conversation_id.clone();
        let topic = actor.topic.clone();
        let user_id = actor.local_key.clone();
        let span = info_span!(
            "typing_session",
            topic = %topic,
            session = %parley_common::new_correlation_id()
        );
        let task = tokio::spawn(actor.run(rx).instrument(span));
        Self {
            conversation_id,
            topic,
            user_id,
            commands: Some(tx),
            task: Some(task),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Presence channel name (`prefix + conversation id`).
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Whether the session task is still running.
    pub fn is_active(&self) -> bool {
        self.commands.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    fn send(&self, command: SessionCommand) -> bool {
        match &self.commands {
            Some(tx) => tx.send(command).is_ok(),
            None => false,
        }
    }

    /// Announce that we are typing as `profile` and restart the quiet window.
    pub fn start_typing(&self, profile: impl Into<TypingProfile>) {
        if !self.send(SessionCommand::StartTyping(profile.into())) {
            debug!(topic = %self.topic, "start_typing on a closed session");
        }
    }

    /// Announce that we stopped typing. No-op when already idle.
    pub fn stop_typing(&self) {
        if !self.send(SessionCommand::StopTyping) {
            debug!(topic = %self.topic, "stop_typing on a closed session");
        }
    }

    /// Call `listener` with the current roster, then with the full roster
    /// after every presence sync.
    pub fn on_roster_change<F>(&self, listener: F)
    where
        F: Fn(&TypingRoster) + Send + 'static,
    {
        self.send(SessionCommand::Listen(Box::new(listener)));
    }

    /// The latest roster. Empty once the session has ended.
    pub async fn roster(&self) -> TypingRoster {
        let (tx, rx) = oneshot::channel();
        if !self.send(SessionCommand::Roster(tx)) {
            return TypingRoster::empty(&self.conversation_id);
        }
        rx.await
            .unwrap_or_else(|_| TypingRoster::empty(&self.conversation_id))
    }

    /// The local typing state. `Idle` once the session has ended.
    pub async fn state(&self) -> TypingState {
        let (tx, rx) = oneshot::channel();
        if !self.send(SessionCommand::State(tx)) {
            return TypingState::Idle;
        }
        rx.await.unwrap_or_default()
    }

    /// Cancel any pending expiry, untrack, and close the channel.
    ///
    /// Returns once teardown is complete. Calling it again does nothing.
    pub async fn leave(&mut self) {
        let Some(commands) = self.commands.take() else {
            return;
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        if commands.send(SessionCommand::Leave(Some(ack_tx))).is_ok() {
            let _ = ack_rx.await;
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(topic = %self.topic, error = %e, "Typing session task failed");
            }
        }
    }
}

impl Drop for TypingSession {
    fn drop(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(SessionCommand::Leave(None));
        }
    }
}

impl std::fmt::Debug for TypingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingSession")
            .field("conversation_id", &self.conversation_id)
            .field("topic", &self.topic)
            .field("user_id", &self.user_id)
            .field("active", &self.is_active())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

pub(crate) struct SessionActor {
    conversation_id: String,
    topic: String,
    local_key: String,
    fallback_username: String,
    channel: Box<dyn PresenceChannel>,
    signals: mpsc::Receiver<ChannelSignal>,
    local: LocalTypingState,
    /// Last payload the channel accepted. `None` forces the next announce.
    announced: Option<TypingPayload>,
    roster: TypingRoster,
    listeners: Vec<RosterListener>,
    _membership: Membership,
}

pub(crate) struct SessionParts {
    pub(crate) conversation_id: String,
    pub(crate) local_key: String,
    pub(crate) fallback_username: String,
    pub(crate) quiet_window: Duration,
    pub(crate) channel: Box<dyn PresenceChannel>,
    pub(crate) signals: mpsc::Receiver<ChannelSignal>,
    pub(crate) membership: Membership,
}

impl SessionActor {
    pub(crate) fn new(parts: SessionParts) -> Self {
        Self {
            topic: parts.channel.topic().to_string(),
            roster: TypingRoster::empty(&parts.conversation_id),
            conversation_id: parts.conversation_id,
            local_key: parts.local_key,
            fallback_username: parts.fallback_username,
            channel: parts.channel,
            signals: parts.signals,
            local: LocalTypingState::new(parts.quiet_window),
            announced: None,
            listeners: Vec::new(),
            _membership: parts.membership,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        let mut signals_open = true;

        loop {
            let deadline = self.local.deadline();

            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(SessionCommand::Leave(ack)) => {
                        self.teardown().await;
                        if let Some(ack) = ack {
                            let _ = ack.send(());
                        }
                        return;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.teardown().await;
                        return;
                    }
                },
                signal = self.signals.recv(), if signals_open => match signal {
                    Some(signal) => self.handle_signal(signal),
                    None => {
                        warn!(topic = %self.topic, "Presence signal stream ended");
                        signals_open = false;
                        self.clear_roster();
                    }
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.expire().await;
                }
            }
        }
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::StartTyping(profile) => {
                self.local.start(Instant::now());
                self.announce(TypingPayload::typing(&profile)).await;
            }
            SessionCommand::StopTyping => {
                self.local.stop();
                self.announce(TypingPayload::idle()).await;
            }
            SessionCommand::Listen(listener) => {
                listener(&self.roster);
                self.listeners.push(listener);
            }
            SessionCommand::Roster(reply) => {
                let _ = reply.send(self.roster.clone());
            }
            SessionCommand::State(reply) => {
                let _ = reply.send(self.local.state());
            }
            SessionCommand::Leave(_) => {}
        }
    }

    fn handle_signal(&mut self, signal: ChannelSignal) {
        match signal {
            ChannelSignal::Sync(table) => {
                self.apply_table(&table);
                self.emit();
            }
            ChannelSignal::Status(ChannelStatus::Subscribed) => {
                debug!(topic = %self.topic, "Typing channel resubscribed");
            }
            ChannelSignal::Status(ChannelStatus::Disconnected) => {
                warn!(topic = %self.topic, "Typing channel disconnected");
                self.clear_roster();
            }
            ChannelSignal::Status(ChannelStatus::Errored(reason)) => {
                warn!(topic = %self.topic, reason = %reason, "Typing channel error");
                self.clear_roster();
            }
            ChannelSignal::Status(ChannelStatus::Closed) => {
                warn!(topic = %self.topic, "Typing channel closed");
                self.clear_roster();
            }
        }
    }

    /// Forget remote typists once the channel can no longer sync them.
    fn clear_roster(&mut self) {
        if !self.roster.is_empty() {
            self.roster = TypingRoster::empty(&self.conversation_id);
            self.emit();
        }
    }

    /// Replace the roster with the projection of `table`. Does not notify.
    pub(crate) fn apply_table(&mut self, table: &PresenceTable) {
        self.roster = TypingRoster::from_table(
            &self.conversation_id,
            table,
            &self.local_key,
            &self.fallback_username,
        );
    }

    fn emit(&self) {
        for listener in &self.listeners {
            listener(&self.roster);
        }
    }

    async fn expire(&mut self) {
        if !self.local.expire(Instant::now()) {
            debug!(topic = %self.topic, "Ignoring stale typing expiry");
            return;
        }
        debug!(topic = %self.topic, "Typing expired");
        self.announce(TypingPayload::idle()).await;
    }

    /// Track `payload` unless it is what the channel already holds.
    pub(crate) async fn announce(&mut self, payload: TypingPayload) {
        if self.announced.as_ref() == Some(&payload) {
            return;
        }
        match self.channel.track(payload.to_value()).await {
            Ok(()) => self.announced = Some(payload),
            Err(e) => {
                self.announced = None;
                let err = TypingError::BroadcastFailed {
                    topic: self.topic.clone(),
                    reason: e.to_string(),
                };
                warn!(error = %err, "Typing broadcast failed");
            }
        }
    }

    async fn teardown(&mut self) {
        self.local.stop();
        self.listeners.clear();
        if let Err(e) = self.channel.remove().await {
            warn!(topic = %self.topic, error = %e, "Failed to remove typing channel");
        }
        info!(topic = %self.topic, "Left typing channel");
    }
}
