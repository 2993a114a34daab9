//! Background WebSocket connection loop with auto-reconnect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::handler::handle_phoenix_message;
use super::types::{
    ChannelConfig, PhoenixMessage, RealtimeCommand, RealtimeConfig, RealtimeEvent,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;

// ---------------------------------------------------------------------------
// Ref Counter
// ---------------------------------------------------------------------------

/// Monotonically increasing ref counter for Phoenix messages.
static REF_COUNTER: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_ref() -> String {
    REF_COUNTER.fetch_add(1, Ordering::Relaxed).to_string()
}

/// A channel that should be (re)joined on every connect.
#[derive(Debug, Clone)]
pub(crate) struct PendingChannel {
    pub(crate) config: ChannelConfig,
    /// Last tracked payload, re-sent once a rejoin is acknowledged.
    pub(crate) presence_payload: Option<serde_json::Value>,
    /// Ref of the most recent `phx_join`; only its reply marks the channel joined.
    pub(crate) join_ref: Option<String>,
}

impl PendingChannel {
    fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            presence_payload: None,
            join_ref: None,
        }
    }
}

/// Whether the outer loop should reconnect or stop for good.
enum Flow {
    Reconnect,
    Shutdown,
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Background task managing the WebSocket connection with auto-reconnect.
pub(crate) async fn connection_loop(
    config: RealtimeConfig,
    connected: Arc<RwLock<bool>>,
    event_tx: mpsc::Sender<RealtimeEvent>,
    mut command_rx: mpsc::Receiver<RealtimeCommand>,
) {
    let mut channels: HashMap<String, PendingChannel> = HashMap::new();
    let mut reconnect_delay = config.reconnect_delay_secs;
    let connect_timeout = Duration::from_secs(config.connect_timeout_secs);

    loop {
        let url = config.ws_url();
        info!(url = %url.split('?').next().unwrap_or(""), "Connecting to Supabase Realtime");

        match tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(&url)).await {
            Ok(Ok((ws_stream, _))) => {
                reconnect_delay = config.reconnect_delay_secs;
                *connected.write().await = true;
                let _ = event_tx.send(RealtimeEvent::Connected).await;

                let flow =
                    run_connection(ws_stream, &config, &mut channels, &event_tx, &mut command_rx)
                        .await;

                *connected.write().await = false;
                let _ = event_tx.send(RealtimeEvent::Disconnected).await;
                if let Flow::Shutdown = flow {
                    info!("Realtime connection closed");
                    return;
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "Failed to connect to Supabase Realtime");
                let _ = event_tx
                    .send(RealtimeEvent::Error(format!("Connection failed: {e}")))
                    .await;
            }
            Err(_elapsed) => {
                error!(
                    timeout_secs = config.connect_timeout_secs,
                    "WebSocket connection timed out"
                );
                let _ = event_tx
                    .send(RealtimeEvent::Error(format!(
                        "Connection timed out after {}s",
                        config.connect_timeout_secs
                    )))
                    .await;
            }
        }

        // Exponential backoff reconnect.
        info!(
            delay = reconnect_delay,
            "Reconnecting in {} seconds", reconnect_delay
        );
        let delay = Duration::from_secs(reconnect_delay);
        if let Flow::Shutdown = wait_offline(delay, &mut channels, &mut command_rx).await {
            info!("Realtime client stopped while offline");
            return;
        }
        reconnect_delay = (reconnect_delay * 2).min(config.max_reconnect_delay_secs);
    }
}

/// Sleep out the backoff delay while still recording channel commands.
async fn wait_offline(
    delay: Duration,
    channels: &mut HashMap<String, PendingChannel>,
    command_rx: &mut mpsc::Receiver<RealtimeCommand>,
) -> Flow {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return Flow::Reconnect,
            cmd = command_rx.recv() => match cmd {
                None | Some(RealtimeCommand::Disconnect) => return Flow::Shutdown,
                Some(cmd) => record_command(&cmd, channels),
            },
        }
    }
}

/// Apply a command to the channel registry without touching the socket.
fn record_command(cmd: &RealtimeCommand, channels: &mut HashMap<String, PendingChannel>) {
    match cmd {
        RealtimeCommand::JoinChannel { topic, config } => {
            channels.insert(topic.clone(), PendingChannel::new(config.clone()));
        }
        RealtimeCommand::LeaveChannel { topic } => {
            channels.remove(topic);
        }
        RealtimeCommand::PresenceTrack { topic, payload } => {
            if let Some(ch) = channels.get_mut(topic) {
                ch.presence_payload = Some(payload.clone());
            }
        }
        RealtimeCommand::PresenceUntrack { topic } => {
            if let Some(ch) = channels.get_mut(topic) {
                ch.presence_payload = None;
            }
        }
        RealtimeCommand::Disconnect => {}
    }
}

/// Drive one live connection until it drops or the client shuts down.
async fn run_connection(
    ws_stream: WsStream,
    config: &RealtimeConfig,
    channels: &mut HashMap<String, PendingChannel>,
    event_tx: &mpsc::Sender<RealtimeEvent>,
    command_rx: &mut mpsc::Receiver<RealtimeCommand>,
) -> Flow {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    // Rejoin previously-joined channels.
    for (topic, pending) in channels.iter_mut() {
        let join_ref = next_ref();
        pending.join_ref = Some(join_ref.clone());
        let msg = PhoenixMessage::channel(topic, "phx_join", pending.config.to_join_payload(), join_ref);
        if let Err(e) = send_frame(&mut ws_write, &msg).await {
            warn!(topic = %topic, error = %e, "Failed to rejoin channel");
            return Flow::Reconnect;
        }
    }

    let period = Duration::from_secs(config.heartbeat_interval_secs);
    let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            frame = ws_read.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    let Ok(phoenix_msg) = serde_json::from_str::<PhoenixMessage>(&text) else {
                        debug!(text = %text, "Unrecognized message from Supabase");
                        continue;
                    };
                    let Some(event) = handle_phoenix_message(&phoenix_msg, channels) else {
                        continue;
                    };
                    if let RealtimeEvent::ChannelJoined { topic } = &event {
                        if let Some(payload) = channels.get(topic).and_then(|c| c.presence_payload.clone()) {
                            debug!(topic = %topic, "Re-tracking presence after join");
                            let msg = track_message(topic, payload);
                            if let Err(e) = send_frame(&mut ws_write, &msg).await {
                                warn!(error = %e, "WebSocket write failed");
                                return Flow::Reconnect;
                            }
                        }
                    }
                    let _ = event_tx.send(event).await;
                }
                Some(Ok(WsMessage::Close(_))) => {
                    info!("Supabase Realtime closed connection");
                    return Flow::Reconnect;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    return Flow::Reconnect;
                }
                None => return Flow::Reconnect,
                Some(Ok(_)) => {}
            },
            cmd = command_rx.recv() => match cmd {
                None => {
                    debug!("All realtime handles dropped");
                    shutdown(&mut ws_write, channels).await;
                    return Flow::Shutdown;
                }
                Some(RealtimeCommand::Disconnect) => {
                    shutdown(&mut ws_write, channels).await;
                    return Flow::Shutdown;
                }
                Some(cmd) => {
                    if let Err(e) = forward_command(cmd, &mut ws_write, channels).await {
                        warn!(error = %e, "WebSocket write failed");
                        return Flow::Reconnect;
                    }
                }
            },
            _ = heartbeat.tick() => {
                let msg = PhoenixMessage {
                    topic: "phoenix".to_string(),
                    event: "heartbeat".to_string(),
                    payload: serde_json::json!({}),
                    msg_ref: Some(next_ref()),
                };
                if let Err(e) = send_frame(&mut ws_write, &msg).await {
                    warn!(error = %e, "Heartbeat failed");
                    return Flow::Reconnect;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound frames
// ---------------------------------------------------------------------------

async fn send_frame<S>(ws_write: &mut S, msg: &PhoenixMessage) -> Result<(), S::Error>
where
    S: Sink<WsMessage> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => ws_write.send(WsMessage::Text(json.into())).await,
        Err(e) => {
            error!(error = %e, event = %msg.event, "Failed to encode Phoenix message");
            Ok(())
        }
    }
}

fn track_message(topic: &str, payload: serde_json::Value) -> PhoenixMessage {
    PhoenixMessage::channel(
        topic,
        "presence",
        serde_json::json!({
            "type": "presence",
            "event": "track",
            "payload": payload
        }),
        next_ref(),
    )
}

/// Record the command, then write its frame.
async fn forward_command(
    cmd: RealtimeCommand,
    ws_write: &mut WsWriter,
    channels: &mut HashMap<String, PendingChannel>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    record_command(&cmd, channels);

    let msg = match cmd {
        RealtimeCommand::JoinChannel { topic, config } => {
            let join_ref = next_ref();
            if let Some(ch) = channels.get_mut(&topic) {
                ch.join_ref = Some(join_ref.clone());
            }
            PhoenixMessage::channel(&topic, "phx_join", config.to_join_payload(), join_ref)
        }
        RealtimeCommand::LeaveChannel { topic } => {
            PhoenixMessage::channel(&topic, "phx_leave", serde_json::json!({}), next_ref())
        }
        RealtimeCommand::PresenceTrack { topic, payload } => track_message(&topic, payload),
        RealtimeCommand::PresenceUntrack { topic } => PhoenixMessage::channel(
            &topic,
            "presence",
            serde_json::json!({
                "type": "presence",
                "event": "untrack"
            }),
            next_ref(),
        ),
        RealtimeCommand::Disconnect => return Ok(()),
    };

    send_frame(ws_write, &msg).await
}

/// Send `phx_leave` for all channels, then close the socket.
async fn shutdown(ws_write: &mut WsWriter, channels: &mut HashMap<String, PendingChannel>) {
    for topic in channels.keys() {
        let msg = PhoenixMessage::channel(topic, "phx_leave", serde_json::json!({}), next_ref());
        if send_frame(ws_write, &msg).await.is_err() {
            break;
        }
    }
    channels.clear();
    let _ = ws_write.send(WsMessage::Close(None)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(topic: &str) -> RealtimeCommand {
        RealtimeCommand::JoinChannel {
            topic: topic.into(),
            config: ChannelConfig::presence("u1", None),
        }
    }

    #[test]
    fn refs_are_unique_and_increasing() {
        let a: u64 = next_ref().parse().unwrap();
        let b: u64 = next_ref().parse().unwrap();
        assert!(b > a);
    }

    #[test]
    fn offline_commands_update_registry() {
        let mut channels = HashMap::new();
        record_command(&join("typing-c1"), &mut channels);
        record_command(
            &RealtimeCommand::PresenceTrack {
                topic: "typing-c1".into(),
                payload: serde_json::json!({"isTyping": true}),
            },
            &mut channels,
        );
        assert_eq!(
            channels["typing-c1"].presence_payload,
            Some(serde_json::json!({"isTyping": true}))
        );

        record_command(
            &RealtimeCommand::PresenceUntrack {
                topic: "typing-c1".into(),
            },
            &mut channels,
        );
        assert!(channels["typing-c1"].presence_payload.is_none());

        record_command(
            &RealtimeCommand::LeaveChannel {
                topic: "typing-c1".into(),
            },
            &mut channels,
        );
        assert!(channels.is_empty());
    }

    #[test]
    fn track_for_unknown_channel_is_ignored() {
        let mut channels = HashMap::new();
        record_command(
            &RealtimeCommand::PresenceTrack {
                topic: "typing-none".into(),
                payload: serde_json::json!({}),
            },
            &mut channels,
        );
        assert!(channels.is_empty());
    }

    #[test]
    fn rejoin_resets_tracked_payload() {
        let mut channels = HashMap::new();
        record_command(&join("typing-c1"), &mut channels);
        channels.get_mut("typing-c1").unwrap().presence_payload = Some(serde_json::json!({}));
        record_command(&join("typing-c1"), &mut channels);
        assert!(channels["typing-c1"].presence_payload.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_while_offline_stops_loop() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut channels = HashMap::new();
        tx.send(join("typing-c1")).await.unwrap();
        tx.send(RealtimeCommand::Disconnect).await.unwrap();

        let flow = wait_offline(Duration::from_secs(30), &mut channels, &mut rx).await;
        assert!(matches!(flow, Flow::Shutdown));
        assert!(channels.contains_key("typing-c1"));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_elapses_into_reconnect() {
        let (_tx, mut rx) = mpsc::channel::<RealtimeCommand>(4);
        let mut channels = HashMap::new();
        let flow = wait_offline(Duration::from_secs(2), &mut channels, &mut rx).await;
        assert!(matches!(flow, Flow::Reconnect));
    }

    #[tokio::test]
    async fn dropped_handles_stop_loop_while_offline() {
        let (tx, mut rx) = mpsc::channel::<RealtimeCommand>(4);
        drop(tx);
        let mut channels = HashMap::new();
        let flow = wait_offline(Duration::from_secs(60), &mut channels, &mut rx).await;
        assert!(matches!(flow, Flow::Shutdown));
    }
}
