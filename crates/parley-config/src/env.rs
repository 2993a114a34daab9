//! Environment variable overrides, applied on top of the file.

use tracing::debug;

use crate::schema::ParleyConfig;

/// Apply `PARLEY_*` overrides from the process environment.
pub fn apply_env_overrides(config: &mut ParleyConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides using `lookup` to resolve variable names.
///
/// Empty values are ignored.
pub fn apply_overrides_from(config: &mut ParleyConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("PARLEY_PROJECT_REF") {
        debug!("realtime.project_ref overridden by PARLEY_PROJECT_REF");
        config.realtime.project_ref = v;
    }
    if let Some(v) = get("PARLEY_API_KEY") {
        debug!("realtime.api_key overridden by PARLEY_API_KEY");
        config.realtime.api_key = v;
    }
    if let Some(v) = get("PARLEY_REALTIME_URL") {
        debug!("realtime.endpoint overridden by PARLEY_REALTIME_URL");
        config.realtime.endpoint = v;
    }
    if let Some(v) = get("PARLEY_USER_ID") {
        config.identity.user_id = v;
    }
    if let Some(v) = get("PARLEY_USERNAME") {
        config.identity.username = v;
    }
}
