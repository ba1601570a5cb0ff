#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use evently_core::config::WizardConfig;
use evently_core::draft::{EventDraft, ImageRef, PendingFile, PhysicalLocation};
use evently_core::persistence::{DraftStore, DraftStoreError, MemoryDraftStore};
use evently_core::retry::RetryConfig;
use evently_core::services::{
    AssetCategory, AssetUploader, CreatedEvent, EventService, GateError, ServiceError,
    SubscriptionGate, UploadError, UploadedAsset,
};
use evently_core::submission::SubmissionPayload;
use evently_core::{WizardController, WizardServices};

pub const USER: &str = "user_1";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Event service that records payloads and replays scripted results.
///
/// When the script is empty every call succeeds.
#[derive(Default)]
pub struct FakeEvents {
    pub payloads: Mutex<Vec<SubmissionPayload>>,
    pub script: Mutex<VecDeque<Result<CreatedEvent, ServiceError>>>,
}

impl FakeEvents {
    pub fn push(&self, result: Result<CreatedEvent, ServiceError>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    pub fn last_payload(&self) -> Option<SubmissionPayload> {
        self.payloads.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl EventService for FakeEvents {
    async fn create(&self, payload: SubmissionPayload) -> Result<CreatedEvent, ServiceError> {
        let title = payload.get("title").unwrap_or_default().to_string();
        self.payloads.lock().unwrap().push(payload);
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(CreatedEvent {
            id: "evt_1".into(),
            title,
        }))
    }
}

/// Uploader replaying scripted results; succeeds once the script is empty.
#[derive(Default)]
pub struct FakeUploader {
    pub script: Mutex<VecDeque<Result<UploadedAsset, UploadError>>>,
    pub calls: Mutex<Vec<(String, AssetCategory)>>,
}

impl FakeUploader {
    pub fn push(&self, result: Result<UploadedAsset, UploadError>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AssetUploader for FakeUploader {
    async fn upload(
        &self,
        file: &PendingFile,
        category: AssetCategory,
    ) -> Result<UploadedAsset, UploadError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((file.file_name.clone(), category));
            calls.len()
        };
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(asset(&format!("https://cdn.example.com/{n}.png"))))
    }
}

pub struct FakeGate {
    pub answer: Result<bool, GateError>,
}

#[async_trait]
impl SubscriptionGate for FakeGate {
    async fn can_create_event(&self, _user_id: &str) -> Result<bool, GateError> {
        self.answer.clone()
    }
}

/// Store whose every operation fails.
pub struct BrokenStore;

impl DraftStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<String>, DraftStoreError> {
        Err(DraftStoreError::Unavailable("quota exceeded".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), DraftStoreError> {
        Err(DraftStoreError::Unavailable("quota exceeded".into()))
    }

    fn remove(&self, _key: &str) -> Result<(), DraftStoreError> {
        Err(DraftStoreError::Unavailable("quota exceeded".into()))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub events: Arc<FakeEvents>,
    pub uploader: Arc<FakeUploader>,
    pub store: Arc<MemoryDraftStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            events: Arc::new(FakeEvents::default()),
            uploader: Arc::new(FakeUploader::default()),
            store: Arc::new(MemoryDraftStore::new()),
        }
    }

    pub fn services(&self) -> WizardServices {
        WizardServices {
            events: self.events.clone(),
            uploader: self.uploader.clone(),
            store: self.store.clone(),
            gate: Arc::new(FakeGate { answer: Ok(true) }),
        }
    }

    /// A mounted wizard for [`USER`].
    pub fn wizard(&self) -> WizardController {
        let mut wizard = WizardController::new(USER, test_config(), self.services());
        wizard.mount();
        wizard
    }
}

/// Default config without upload backoff delays.
pub fn test_config() -> WizardConfig {
    WizardConfig {
        upload_retry: RetryConfig {
            initial_delay: Duration::ZERO,
            ..Default::default()
        },
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

pub fn asset(url: &str) -> UploadedAsset {
    UploadedAsset {
        url: url.into(),
        storage_id: format!("asset:{url}"),
        width: 1200,
        height: 630,
        attribution: None,
    }
}

pub fn png(name: &str) -> PendingFile {
    PendingFile::new(name, "image/png", vec![0x89, 0x50, 0x4e, 0x47])
}

/// A draft that passes every rule.
pub fn valid_draft() -> EventDraft {
    EventDraft {
        title: "Rust Meetup Berlin".into(),
        category: "technology".into(),
        short_description: "Monthly Rust meetup".into(),
        description: "Talks and hacking on all things Rust, followed by drinks.".into(),
        tags: vec!["rust".into()],
        date: NaiveDate::from_ymd_opt(2099, 5, 1),
        start_time: NaiveTime::from_hms_opt(18, 0, 0),
        end_time: NaiveTime::from_hms_opt(21, 0, 0),
        duration: Some(180),
        location: PhysicalLocation {
            address: "Alexanderplatz 1".into(),
            city: "Berlin".into(),
            country: "Germany".into(),
            postal_code: "10178".into(),
        },
        max_attendees: Some(100),
        images: vec![ImageRef {
            url: "https://cdn.example.com/a.jpg".into(),
            storage_id: "img_1".into(),
            width: 1200,
            height: 630,
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// Fill the wizard with `draft` through the change handler.
pub fn load(wizard: &mut WizardController, draft: EventDraft) {
    wizard
        .change(evently_core::draft::Field::Title, |d| *d = draft)
        .expect("wizard should accept edits");
}
