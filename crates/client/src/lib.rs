//! HTTP and file-system adapters for the `evently-core` wizard engine.

pub mod config;
pub mod envelope;
pub mod error;
pub mod file_store;
pub mod http;
pub mod report;

use std::sync::Arc;

use evently_core::WizardServices;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::file_store::FileDraftStore;
use crate::http::{ApiClient, HttpAssetUploader, HttpEventService, HttpSubscriptionGate};

/// Wire the wizard's collaborators to the API and the draft directory.
pub fn build_services(config: &ClientConfig) -> Result<WizardServices, ClientError> {
    let api = ApiClient::new(config)?;
    let store = FileDraftStore::open(&config.draft_dir)?;
    Ok(WizardServices {
        events: Arc::new(HttpEventService::new(api.clone())),
        uploader: Arc::new(HttpAssetUploader::new(api.clone())),
        store: Arc::new(store),
        gate: Arc::new(HttpSubscriptionGate::new(api)),
    })
}
