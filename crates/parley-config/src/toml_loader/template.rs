//! Default config file contents.

/// The documented TOML written on first run. Every value matches the serde default.
pub fn default_config_toml() -> &'static str {
    r#"# Parley configuration
# Every key is optional; missing keys use the values shown here.

[realtime]
enabled = true
# Supabase project ref (the <ref> in <ref>.supabase.co). Env: PARLEY_PROJECT_REF
project_ref = ""
# Anon key. Prefer the PARLEY_API_KEY environment variable.
api_key = ""
# Full ws:// or wss:// URL for self-hosted deployments. Env: PARLEY_REALTIME_URL
endpoint = ""
# Seconds between heartbeats (5-120)
heartbeat_interval = 25
# Reconnect backoff in seconds: starts at reconnect_delay, doubles up to max_reconnect_delay
reconnect_delay = 1
max_reconnect_delay = 30
# Seconds before a connect attempt is abandoned (1-120)
connect_timeout = 15

[typing]
# Typing stops on its own this long after the last keystroke (500-30000)
quiet_window_ms = 3000
# How long to wait for the presence channel to be ready (1000-60000)
join_timeout_ms = 10000
channel_prefix = "typing-"
# Label for participants that announce no name
fallback_username = "User"

[identity]
# Left empty, a random id and $USER are used. Env: PARLEY_USER_ID, PARLEY_USERNAME
user_id = ""
username = ""
display_name = ""

[logging]
# DEBUG, INFO, WARNING or ERROR
level = "INFO"
"#
}
