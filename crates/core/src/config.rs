use std::str::FromStr;
use std::time::Duration;

use crate::meeting::{MeetingConfig, DEFAULT_MEETING_BASE_URL};
use crate::retry::RetryConfig;

/// Wizard tuning loaded from environment variables.
///
/// All fields have defaults suitable for interactive use.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Quiet period before a draft snapshot is written (default: 2 s).
    pub draft_debounce: Duration,
    /// Quiet period before live single-field validation runs (default: 500 ms).
    pub field_debounce: Duration,
    /// Asset upload retry policy.
    pub upload_retry: RetryConfig,
    /// Built-in conferencing settings.
    pub meeting: MeetingConfig,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            draft_debounce: Duration::from_millis(2000),
            field_debounce: Duration::from_millis(500),
            upload_retry: RetryConfig::default(),
            meeting: MeetingConfig::default(),
        }
    }
}

impl WizardConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default          |
    /// |--------------------------------|------------------|
    /// | `DRAFT_SAVE_DEBOUNCE_MS`       | `2000`           |
    /// | `FIELD_VALIDATION_DEBOUNCE_MS` | `500`            |
    /// | `UPLOAD_MAX_ATTEMPTS`          | `3`              |
    /// | `UPLOAD_RETRY_INITIAL_MS`      | `500`            |
    /// | `UPLOAD_RETRY_MAX_MS`          | `8000`           |
    /// | `MEETING_BASE_URL`             | `https://8x8.vc` |
    /// | `MEETING_APP_ID`               | (empty)          |
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        let defaults = RetryConfig::default();
        let upload_retry = RetryConfig {
            max_attempts: env_or("UPLOAD_MAX_ATTEMPTS", defaults.max_attempts),
            initial_delay: Duration::from_millis(env_or("UPLOAD_RETRY_INITIAL_MS", 500)),
            max_delay: Duration::from_millis(env_or("UPLOAD_RETRY_MAX_MS", 8000)),
            multiplier: defaults.multiplier,
        };

        let meeting = MeetingConfig {
            base_url: std::env::var("MEETING_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_MEETING_BASE_URL.into()),
            app_id: std::env::var("MEETING_APP_ID").unwrap_or_default(),
        };

        Self {
            draft_debounce: Duration::from_millis(env_or("DRAFT_SAVE_DEBOUNCE_MS", 2000)),
            field_debounce: Duration::from_millis(env_or("FIELD_VALIDATION_DEBOUNCE_MS", 500)),
            upload_retry,
            meeting,
        }
    }
}

/// Parse `key` from the environment, or return `default`.
pub fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, %default, "Invalid value, using default");
                default
            }
        },
        Err(_) => default,
    }
}
