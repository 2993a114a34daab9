//! Startup wiring: config sections into presence types.

use std::time::Duration;

use parley_config::schema::{ParleyConfig, TypingConfig};
use parley_presence::{LocalIdentity, RealtimeConfig, TypingSettings};

use crate::cli::Args;

pub fn typing_settings(typing: &TypingConfig) -> TypingSettings {
    TypingSettings {
        quiet_window: Duration::from_millis(u64::from(typing.quiet_window_ms)),
        join_timeout: Duration::from_millis(u64::from(typing.join_timeout_ms)),
        channel_prefix: typing.channel_prefix.clone(),
        fallback_username: typing.fallback_username.clone(),
    }
}

pub fn realtime_config(config: &ParleyConfig, access_token: Option<String>) -> RealtimeConfig {
    let rt = &config.realtime;
    RealtimeConfig {
        project_ref: rt.project_ref.clone(),
        api_key: rt.api_key.clone(),
        endpoint: (!rt.endpoint.is_empty()).then(|| rt.endpoint.clone()),
        access_token,
        heartbeat_interval_secs: u64::from(rt.heartbeat_interval),
        reconnect_delay_secs: u64::from(rt.reconnect_delay),
        max_reconnect_delay_secs: u64::from(rt.max_reconnect_delay),
        connect_timeout_secs: u64::from(rt.connect_timeout),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// CLI flags, then the `[identity]` section, then a generated id and the OS user.
///
/// `os_user` and `access_token` are passed in so callers decide where they come from.
pub fn resolve_identity(
    args: &Args,
    config: &ParleyConfig,
    os_user: Option<String>,
    access_token: Option<String>,
) -> LocalIdentity {
    let id = &config.identity;
    let username = non_empty(args.username.as_deref())
        .or_else(|| non_empty(Some(&id.username)))
        .or_else(|| non_empty(os_user.as_deref()))
        .unwrap_or_default();

    let mut identity = match non_empty(args.user_id.as_deref()).or_else(|| non_empty(Some(&id.user_id))) {
        Some(user_id) => LocalIdentity {
            user_id,
            username,
            ..Default::default()
        },
        None => LocalIdentity::generate(&username),
    };

    let display_name = non_empty(args.display_name.as_deref())
        .or_else(|| non_empty(Some(&id.display_name)))
        .unwrap_or_default();
    identity = identity.with_display_name(display_name);
    identity.access_token = access_token.filter(|t| !t.is_empty());
    identity
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["parley", "--conversation", "c1"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn cli_flags_win_over_config() {
        let mut config = ParleyConfig::default();
        config.identity.user_id = "from-config".into();
        config.identity.username = "config-name".into();

        let identity = resolve_identity(
            &args(&["--user-id", "from-cli", "--username", "cli-name"]),
            &config,
            Some("osuser".into()),
            None,
        );
        assert_eq!(identity.user_id, "from-cli");
        assert_eq!(identity.username, "cli-name");
    }

    #[test]
    fn config_identity_used_when_flags_absent() {
        let mut config = ParleyConfig::default();
        config.identity.user_id = "u-7".into();
        config.identity.display_name = "Seven".into();

        let identity = resolve_identity(&args(&[]), &config, Some("osuser".into()), Some("jwt".into()));
        assert_eq!(identity.user_id, "u-7");
        assert_eq!(identity.username, "osuser");
        assert_eq!(identity.display_name.as_deref(), Some("Seven"));
        assert_eq!(identity.access_token.as_deref(), Some("jwt"));
    }

    #[test]
    fn generates_id_when_nothing_configured() {
        let identity = resolve_identity(&args(&[]), &ParleyConfig::default(), None, Some(String::new()));
        assert!(identity.is_resolved());
        assert!(identity.username.is_empty());
        assert!(identity.access_token.is_none());
    }

    #[test]
    fn maps_config_sections() {
        let mut config = ParleyConfig::default();
        config.realtime.endpoint = "ws://localhost:4000/socket".into();
        config.typing.quiet_window_ms = 1500;

        let rt = realtime_config(&config, None);
        assert_eq!(rt.endpoint.as_deref(), Some("ws://localhost:4000/socket"));
        assert_eq!(rt.heartbeat_interval_secs, 25);
        assert_eq!(rt.connect_timeout_secs, 15);

        let settings = typing_settings(&config.typing);
        assert_eq!(settings.quiet_window, Duration::from_millis(1500));
        assert_eq!(settings.join_timeout, Duration::from_secs(10));
        assert_eq!(settings.channel_prefix, "typing-");
    }

    #[test]
    fn empty_endpoint_maps_to_none() {
        let rt = realtime_config(&ParleyConfig::default(), None);
        assert!(rt.endpoint.is_none());
    }
}
