use std::path::PathBuf;
use std::time::Duration;

use evently_core::config::{env_or, WizardConfig};

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the events API (default: `http://localhost:3000`).
    pub api_base_url: String,
    /// Bearer token sent with every request, if any.
    pub api_token: Option<String>,
    /// Directory holding draft snapshots (default: `.evently/drafts`).
    pub draft_dir: PathBuf,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Wizard tuning shared with the core engine.
    pub wizard: WizardConfig,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `API_BASE_URL`         | `http://localhost:3000` |
    /// | `API_TOKEN`            | (none)                  |
    /// | `DRAFT_DIR`            | `.evently/drafts`       |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                    |
    ///
    /// Wizard settings are read by [`WizardConfig::from_env`].
    pub fn from_env() -> Self {
        let api_base_url = std::env::var("API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim()
            .trim_end_matches('/')
            .to_string();

        let api_token = std::env::var("API_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let draft_dir = std::env::var("DRAFT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".evently/drafts"));

        Self {
            api_base_url,
            api_token,
            draft_dir,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            wizard: WizardConfig::from_env(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
