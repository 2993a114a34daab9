//! Typing presence validation.

use std::sync::LazyLock;

use regex::Regex;

use super::helpers::{validate_pattern, validate_range};
use crate::schema::ParleyConfig;

static CHANNEL_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.:-]*$").expect("static regex pattern must compile"));

pub(super) fn validate_typing(errors: &mut Vec<String>, config: &ParleyConfig) {
    let t = &config.typing;

    validate_range(errors, "typing.quiet_window_ms", t.quiet_window_ms, 500, 30_000);
    validate_range(errors, "typing.join_timeout_ms", t.join_timeout_ms, 1000, 60_000);
    validate_pattern(errors, "typing.channel_prefix", &t.channel_prefix, &CHANNEL_PREFIX_RE);

    if t.fallback_username.trim().is_empty() {
        errors.push("typing.fallback_username must not be empty".into());
    }
}
