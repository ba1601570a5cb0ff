//! HTTP implementations of the wizard's service traits.
//!
//! All three adapters share one [`ApiClient`], which owns the pooled
//! [`reqwest::Client`], the base URL and the bearer token.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use evently_core::draft::PendingFile;
use evently_core::schema::is_absolute_url;
use evently_core::services::{
    AssetCategory, AssetUploader, CreatedEvent, EventService, GateError, ServiceError,
    SubscriptionGate, UploadError, UploadedAsset,
};
use evently_core::submission::SubmissionPayload;

use crate::config::ClientConfig;
use crate::envelope::DataResponse;
use crate::error::ClientError;

const EVENTS_PATH: &str = "/api/v1/events";
const ASSETS_PATH: &str = "/api/v1/assets";
const LIMITS_PATH: &str = "/api/v1/subscriptions/me/limits";

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// HTTP client for the events API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Self::with_client(client, &config.api_base_url, config.api_token.clone())
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        token: Option<String>,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.trim().trim_end_matches('/');
        let http = base_url.starts_with("http://") || base_url.starts_with("https://");
        if !http || !is_absolute_url(base_url) {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            token,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.authorize(self.client.get(self.url(path))).send().await?;
        Self::parse_response::<DataResponse<T>>(response)
            .await
            .map(|r| r.data)
    }

    async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, ClientError> {
        let response = self
            .authorize(self.client.post(self.url(path)))
            .multipart(form)
            .send()
            .await?;
        Self::parse_response::<DataResponse<T>>(response)
            .await
            .map(|r| r.data)
    }

    // ---- private helpers ----

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

fn file_part(file: &PendingFile) -> Result<Part, ClientError> {
    Ok(Part::bytes(file.bytes.clone())
        .file_name(file.file_name.clone())
        .mime_str(&file.content_type)?)
}

/// Multipart form of a create request.
///
/// Every field becomes a text part; each file travels as a binary part named
/// after its image path, with its metadata in `<path>.metadata`.
pub fn submission_form(payload: &SubmissionPayload) -> Result<Form, ClientError> {
    let mut form = Form::new();
    for (key, value) in &payload.fields {
        form = form.text(key.clone(), value.clone());
    }
    for part in &payload.files {
        form = form
            .part(part.field.clone(), file_part(&part.file)?)
            .text(format!("{}.metadata", part.field), part.metadata.clone());
    }
    Ok(form)
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

/// Creates events with `POST /api/v1/events`.
pub struct HttpEventService {
    api: ApiClient,
}

impl HttpEventService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl EventService for HttpEventService {
    async fn create(&self, payload: SubmissionPayload) -> Result<CreatedEvent, ServiceError> {
        let form = submission_form(&payload)?;
        let created: CreatedEvent = self.api.post_multipart(EVENTS_PATH, form).await?;
        tracing::debug!(event_id = %created.id, "Event created via API");
        Ok(created)
    }
}

/// Uploads images with `POST /api/v1/assets`.
pub struct HttpAssetUploader {
    api: ApiClient,
}

impl HttpAssetUploader {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl AssetUploader for HttpAssetUploader {
    async fn upload(
        &self,
        file: &PendingFile,
        category: AssetCategory,
    ) -> Result<UploadedAsset, UploadError> {
        let form = Form::new()
            .text("category", category.as_str())
            .part("file", file_part(file)?);
        let asset: UploadedAsset = self.api.post_multipart(ASSETS_PATH, form).await?;
        tracing::debug!(
            storage_id = %asset.storage_id,
            category = category.as_str(),
            "Asset uploaded",
        );
        Ok(asset)
    }
}

#[derive(Debug, Deserialize)]
struct EventLimits {
    can_create_event: bool,
}

/// Reads the caller's plan limits from `GET /api/v1/subscriptions/me/limits`.
///
/// The API identifies the caller by token, so `user_id` is only logged.
pub struct HttpSubscriptionGate {
    api: ApiClient,
}

impl HttpSubscriptionGate {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SubscriptionGate for HttpSubscriptionGate {
    async fn can_create_event(&self, user_id: &str) -> Result<bool, GateError> {
        let limits: EventLimits = self.api.get(LIMITS_PATH).await?;
        tracing::debug!(user_id, allowed = limits.can_create_event, "Subscription checked");
        Ok(limits.can_create_event)
    }
}
