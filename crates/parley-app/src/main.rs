mod boot;
mod cli;
mod console;

use std::path::Path;
use std::sync::Arc;

use parley_config::ParleyConfig;
use parley_presence::{RealtimePresence, TypingCoordinator};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Load environment variables from a .env file (KEY=VALUE lines).
fn load_dotenv() {
    let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let candidates = [
        // Workspace root, two levels up from crates/parley-app/
        manifest_dir.join("..").join("..").join(".env"),
        // Current directory
        std::path::PathBuf::from(".env"),
    ];

    for path in &candidates {
        if let Ok(contents) = std::fs::read_to_string(path) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim().trim_matches('"').trim_matches('\'');
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
            return;
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    load_dotenv();

    let args = cli::parse();

    // Config is read before logging so its level can apply.
    let loaded = match args.config.as_deref() {
        Some(path) => parley_config::load_config_from(Path::new(path)),
        None => parley_config::load_config(),
    };
    let config_level = loaded
        .as_ref()
        .map(|c| c.logging.level.directive())
        .unwrap_or("parley=info");

    let log_directive = args.log_level.as_deref().unwrap_or(config_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                log_directive
                    .parse()
                    .unwrap_or_else(|_| LevelFilter::INFO.into()),
            ),
        )
        .init();

    tracing::info!("Parley v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Some(ref path) = args.config {
        tracing::info!("Using config override: {path}");
    }
    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        let mut config = ParleyConfig::default();
        parley_config::apply_env_overrides(&mut config);
        config
    });

    let access_token = std::env::var("PARLEY_ACCESS_TOKEN").ok();
    let os_user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok();
    let identity = boot::resolve_identity(&args, &config, os_user, access_token.clone());
    tracing::info!(user_id = %identity.user_id, username = %identity.username, "Identity resolved");

    if !config.realtime.enabled || !config.realtime.is_configured() {
        tracing::warn!("Realtime is not configured; typing indicators disabled");
        console::run(None, &identity).await;
        return;
    }

    let presence = Arc::new(RealtimePresence::connect(boot::realtime_config(
        &config,
        access_token,
    )));
    let coordinator =
        TypingCoordinator::with_settings(presence.clone(), boot::typing_settings(&config.typing));

    let mut session = match coordinator.join(&args.conversation, &identity).await {
        Ok(session) => {
            console::print_roster_changes(&session);
            println!("joined {}; type to announce typing, /stop, /quit", session.topic());
            Some(session)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Typing indicators unavailable for this session");
            None
        }
    };

    console::run(session.as_ref(), &identity).await;

    if let Some(session) = session.as_mut() {
        session.leave().await;
    }
    if let Err(e) = presence.disconnect().await {
        tracing::debug!(error = %e, "Realtime already stopped");
    }
    tracing::info!("Shutdown complete");
}
