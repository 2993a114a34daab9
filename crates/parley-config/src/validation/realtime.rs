//! Realtime connection validation.

use std::sync::LazyLock;

use regex::Regex;

use super::helpers::{validate_pattern, validate_range};
use crate::schema::ParleyConfig;

static PROJECT_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+$").expect("static regex pattern must compile"));

pub(super) fn validate_realtime(errors: &mut Vec<String>, config: &ParleyConfig) {
    let rt = &config.realtime;

    if !rt.project_ref.is_empty() {
        validate_pattern(errors, "realtime.project_ref", &rt.project_ref, &PROJECT_REF_RE);
    }
    if !rt.endpoint.is_empty()
        && !(rt.endpoint.starts_with("ws://") || rt.endpoint.starts_with("wss://"))
    {
        errors.push(format!(
            "realtime.endpoint = {:?} must start with ws:// or wss://",
            rt.endpoint
        ));
    }

    validate_range(errors, "realtime.heartbeat_interval", rt.heartbeat_interval, 5, 120);
    validate_range(errors, "realtime.reconnect_delay", rt.reconnect_delay, 1, 60);
    validate_range(errors, "realtime.max_reconnect_delay", rt.max_reconnect_delay, 1, 600);
    validate_range(errors, "realtime.connect_timeout", rt.connect_timeout, 1, 120);

    if rt.max_reconnect_delay < rt.reconnect_delay {
        errors.push(format!(
            "realtime.max_reconnect_delay = {} must be >= realtime.reconnect_delay = {}",
            rt.max_reconnect_delay, rt.reconnect_delay
        ));
    }
}
