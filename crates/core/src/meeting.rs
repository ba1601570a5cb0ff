//! Room-name and meeting-URL generation for the built-in conferencing
//! platform.
//!
//! A room name is derived deterministically from an event reference and a
//! timestamp: `event-<slug>-<unix seconds>`. Events that are not persisted
//! yet use a `temp-` placeholder reference.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::types::Timestamp;

/// Default conferencing host.
pub const DEFAULT_MEETING_BASE_URL: &str = "https://8x8.vc";

/// Prefix of references for events that have no id yet.
pub const PLACEHOLDER_PREFIX: &str = "temp-";

/// Longest slug kept in a room name.
const MAX_SLUG_LEN: usize = 48;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingConfig {
    /// Conferencing host, e.g. `https://8x8.vc`.
    pub base_url: String,
    /// Tenant/application id inserted between host and room; may be empty.
    pub app_id: String,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MEETING_BASE_URL.to_string(),
            app_id: String::new(),
        }
    }
}

static NON_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Lowercase, replace runs of non-alphanumerics with `-`, trim dashes and
/// cap the length.
pub fn normalize_slug(input: &str) -> String {
    let lower = input.to_lowercase();
    let dashed = NON_SLUG_RE.replace_all(&lower, "-");
    let trimmed = dashed.trim_matches('-');
    let capped: String = trimmed.chars().take(MAX_SLUG_LEN).collect();
    capped.trim_end_matches('-').to_string()
}

/// Placeholder reference for an event that has not been created yet.
pub fn placeholder_ref(id: Uuid) -> String {
    format!("{PLACEHOLDER_PREFIX}{}", id.simple())
}

/// Deterministic room name for `event_ref` at `at`.
pub fn room_name(event_ref: &str, at: Timestamp) -> String {
    let slug = normalize_slug(event_ref);
    let slug = if slug.is_empty() { "room" } else { slug.as_str() };
    format!("event-{slug}-{}", at.timestamp())
}

/// Full meeting URL for `room` under `config`.
pub fn meeting_url(config: &MeetingConfig, room: &str) -> String {
    let base = config.base_url.trim_end_matches('/');
    let app_id = config.app_id.trim_matches('/');
    if app_id.is_empty() {
        format!("{base}/{room}")
    } else {
        format!("{base}/{app_id}/{room}")
    }
}
