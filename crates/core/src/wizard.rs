//! The event submission wizard controller.
//!
//! [`WizardController`] owns the step pointer, the draft, error and touched
//! state, upload and submission flags, and the two debounce timers (draft
//! autosave and live field validation). Views mutate the draft only through
//! [`WizardController::change`] and drive transitions through `next`,
//! `back`, `edit_step`, `submit` and `cancel`.
//!
//! Time-based work is performed by [`WizardController::poll`]; an event loop
//! sleeps until [`WizardController::next_deadline`] and polls.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::WizardConfig;
use crate::debounce::Debounce;
use crate::draft::{EventDraft, Field, ImageRef, PendingFile};
use crate::error::{WizardError, DRAFT_SAVE_FAILED};
use crate::errors::{ErrorMap, TouchedFields};
use crate::meeting;
use crate::orchestrator::{step_has_errors, validate_step};
use crate::persistence::{DraftAutosave, DraftStore};
use crate::retry::upload_with_retry;
use crate::schema;
use crate::services::{
    AssetCategory, AssetUploader, CreatedEvent, EventService, ServiceError, SubscriptionGate,
    UploadError, UploadedAsset,
};
use crate::steps::{first_step, last_step, owner_of, StepId, STEPS};
use crate::submission::{self, SubmissionPayload};
use crate::types::UserId;

/// Fields validated while the user types, after a short quiet period.
const LIVE_FIELDS: &[Field] = &[
    Field::Title,
    Field::ShortDescription,
    Field::Description,
    Field::MeetingLink,
];

/// List fields whose nested error keys go stale when entries are removed.
const LIST_FIELDS: &[Field] = &[
    Field::Tags,
    Field::Requirements,
    Field::TargetAudience,
    Field::Images,
    Field::Speakers,
];

/// Ticket attributes that only exist for paid events.
const PAID_FIELDS: &[Field] = &[
    Field::Price,
    Field::Currency,
    Field::RefundPolicy,
    Field::EarlyBirdPrice,
    Field::EarlyBirdDeadline,
];

// ---------------------------------------------------------------------------
// Collaborators and public types
// ---------------------------------------------------------------------------

/// External services the wizard depends on.
#[derive(Clone)]
pub struct WizardServices {
    pub events: Arc<dyn EventService>,
    pub uploader: Arc<dyn AssetUploader>,
    pub store: Arc<dyn DraftStore>,
    pub gate: Arc<dyn SubscriptionGate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStatus {
    Editing,
    Submitting,
    Submitted,
    Cancelled,
}

impl WizardStatus {
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Submitted | Self::Cancelled)
    }
}

/// Result of a navigation request.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Moved { from: StepId, to: StepId },
    /// Validation failed; the wizard is now on `step`.
    Blocked { step: StepId },
    Submitted(CreatedEvent),
    Cancelled,
}

/// Outcome of the local half of a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    /// Payload ready for the create operation; the wizard is submitting.
    Ready(SubmissionPayload),
    /// The record is invalid; the wizard moved to `step`.
    Blocked { step: StepId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A toast for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Where an uploaded asset is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    /// Appended to the image list.
    NewImage,
    /// Replaces the image at this index.
    Image(usize),
    /// Sets the photo of the speaker at this index.
    SpeakerPhoto(usize),
}

impl UploadTarget {
    pub fn category(self) -> AssetCategory {
        match self {
            Self::NewImage | Self::Image(_) => AssetCategory::EventImage,
            Self::SpeakerPhoto(_) => AssetCategory::SpeakerPhoto,
        }
    }
}

/// An upload registered with [`WizardController::begin_upload`].
#[derive(Debug, Clone)]
pub struct UploadTicket {
    id: u64,
    target: UploadTarget,
    file: PendingFile,
}

impl UploadTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn target(&self) -> UploadTarget {
        self.target
    }

    pub fn category(&self) -> AssetCategory {
        self.target.category()
    }

    pub fn file(&self) -> &PendingFile {
        &self.file
    }
}

/// One row of the review screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSummary {
    pub id: StepId,
    pub label: &'static str,
    pub number: u8,
    pub is_current: bool,
    pub has_errors: bool,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct WizardController {
    user_id: UserId,
    config: WizardConfig,
    services: WizardServices,

    step: StepId,
    draft: EventDraft,
    errors: ErrorMap,
    touched: TouchedFields,
    status: WizardStatus,
    has_unsaved_changes: bool,
    submit_attempted: bool,
    mounted: bool,

    autosave: DraftAutosave,
    field_timer: Debounce,
    live_fields: BTreeSet<Field>,

    /// In-flight uploads; `None` once the target entry was removed.
    uploads: BTreeMap<u64, Option<UploadTarget>>,
    next_upload_id: u64,

    notices: Vec<Notice>,
    /// Room reference used until the event has an id.
    placeholder_ref: String,
}

impl WizardController {
    /// Open a wizard for `user_id` after checking the subscription gate.
    pub async fn open(
        user_id: impl Into<UserId>,
        config: WizardConfig,
        services: WizardServices,
    ) -> Result<Self, WizardError> {
        let user_id = user_id.into();
        let allowed = services.gate.can_create_event(&user_id).await.map_err(|e| {
            tracing::warn!(user_id = %user_id, error = %e, "Subscription check failed");
            WizardError::Gate(e)
        })?;
        if !allowed {
            tracing::info!(user_id = %user_id, "Event limit reached, wizard not opened");
            return Err(WizardError::LimitReached { user_id });
        }
        Ok(Self::new(user_id, config, services))
    }

    /// Build a wizard without consulting the subscription gate.
    pub fn new(user_id: impl Into<UserId>, config: WizardConfig, services: WizardServices) -> Self {
        let user_id = user_id.into();
        let autosave =
            DraftAutosave::new(services.store.clone(), user_id.clone(), config.draft_debounce);
        let field_timer = Debounce::new(config.field_debounce);
        Self {
            user_id,
            config,
            services,
            step: first_step(),
            draft: EventDraft::default(),
            errors: ErrorMap::new(),
            touched: TouchedFields::new(),
            status: WizardStatus::Editing,
            has_unsaved_changes: false,
            submit_attempted: false,
            mounted: false,
            autosave,
            field_timer,
            live_fields: BTreeSet::new(),
            uploads: BTreeMap::new(),
            next_upload_id: 1,
            notices: Vec::new(),
            placeholder_ref: meeting::placeholder_ref(Uuid::new_v4()),
        }
    }

    /// Restore the saved draft, once, before the first edit.
    ///
    /// Returns whether a snapshot was restored. Store failures are logged and
    /// reported as a warning notice; the wizard continues with a fresh draft.
    pub fn mount(&mut self) -> bool {
        if self.mounted {
            return false;
        }
        self.mounted = true;

        match self.autosave.load() {
            Ok(Some(snapshot)) => {
                self.step = snapshot.current_step;
                self.draft = snapshot.draft;
                self.has_unsaved_changes = false;
                self.sync_location_shape();
                tracing::info!(
                    user_id = %self.user_id,
                    step = self.step.as_str(),
                    saved_at = %snapshot.saved_at,
                    "Draft restored",
                );
                self.notify(NoticeLevel::Info, "We restored your unfinished event.");
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(user_id = %self.user_id, error = %e, "Failed to load draft");
                self.notify(
                    NoticeLevel::Warning,
                    "Your saved draft could not be loaded. You can start over.",
                );
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Apply `mutate` to the draft on behalf of `field`.
    pub fn change(
        &mut self,
        field: Field,
        mutate: impl FnOnce(&mut EventDraft),
    ) -> Result<(), WizardError> {
        self.change_at(field, Instant::now(), mutate)
    }

    /// [`Self::change`] with an explicit clock.
    pub fn change_at(
        &mut self,
        field: Field,
        now: Instant,
        mutate: impl FnOnce(&mut EventDraft),
    ) -> Result<(), WizardError> {
        self.ensure_editable()?;

        let list_len_before = self.list_len(field);
        let media_before = (self.draft.images.len(), self.draft.speakers.len());
        mutate(&mut self.draft);

        self.mark_changed(now);
        self.detach_uploads(media_before);

        match field {
            Field::IsVirtual | Field::StreamingPlatform => self.sync_location_shape(),
            Field::IsFreeEvent if self.draft.is_free_event => {
                for paid in PAID_FIELDS {
                    self.errors.remove_touching(paid.as_str());
                }
            }
            _ => {}
        }

        if let (Some(before), Some(after)) = (list_len_before, self.list_len(field)) {
            if after < before {
                let prefix = format!("{}.", field.as_str());
                self.errors.retain(|key| !key.starts_with(&prefix));
            }
        }

        if LIVE_FIELDS.contains(&field) {
            self.live_fields.insert(field);
            self.field_timer.schedule(now);
        }
        Ok(())
    }

    /// Mark `path` touched and re-validate it immediately.
    pub fn blur(&mut self, path: &str) -> Result<(), WizardError> {
        self.ensure_not_closed()?;
        self.touched.touch(path);
        self.revalidate_path(path);
        Ok(())
    }

    /// Run timers that are due at `now`.
    pub fn poll(&mut self, now: Instant) {
        if self.status.is_closed() {
            return;
        }
        if self.field_timer.fire(now) {
            self.run_live_validation();
        }
        match self.autosave.poll(now, self.step, &self.draft) {
            Ok(true) => self.has_unsaved_changes = false,
            Ok(false) => {}
            Err(e) => self.report_store_failure(&e),
        }
    }

    /// Write the pending draft snapshot now.
    pub fn flush_draft(&mut self) -> Result<bool, WizardError> {
        self.ensure_not_closed()?;
        let written = self.autosave.flush(self.step, &self.draft)?;
        if written {
            self.has_unsaved_changes = false;
        }
        Ok(written)
    }

    /// Earliest instant at which [`Self::poll`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.field_timer.deadline(), self.autosave.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Validate the current step and advance, or submit on the last step.
    pub async fn next(&mut self) -> Result<Transition, WizardError> {
        self.ensure_editable()?;
        self.ensure_no_uploads()?;

        if self.step.is_last() {
            return self.submit().await;
        }

        let from = self.step;
        if !validate_step(from, &self.draft, &mut self.errors, &mut self.touched) {
            tracing::warn!(user_id = %self.user_id, step = from.as_str(), "Step blocked");
            self.notify(
                NoticeLevel::Error,
                format!("Please fix the highlighted fields in {}.", from.label()),
            );
            return Ok(Transition::Blocked { step: from });
        }

        let to = from.next().unwrap_or(from);
        Ok(self.move_to(to))
    }

    /// Go to the previous step without validating; cancels on the first step.
    pub fn back(&mut self) -> Result<Transition, WizardError> {
        self.ensure_editable()?;
        match self.step.previous() {
            Some(to) => Ok(self.move_to(to)),
            None => self.cancel(),
        }
    }

    /// Jump straight to `target` without validating skipped steps.
    pub fn edit_step(&mut self, target: StepId) -> Result<Transition, WizardError> {
        self.ensure_editable()?;
        Ok(self.move_to(target))
    }

    /// Validate the whole record and assemble the payload.
    ///
    /// On success the wizard enters the submitting state; the caller must
    /// report the create result through [`Self::complete_submission`].
    pub fn prepare_submission(&mut self) -> Result<Prepared, WizardError> {
        self.ensure_editable()?;
        self.ensure_no_uploads()?;
        self.submit_attempted = true;

        let issues = schema::check_record(&self.draft);
        if let Some(first) = issues.first() {
            let target = owner_of(&first.path).unwrap_or_else(first_step);
            self.errors = ErrorMap::from_issues(&issues);
            for issue in &issues {
                self.touched.touch(&issue.path);
            }
            tracing::warn!(
                user_id = %self.user_id,
                issues = issues.len(),
                first = %first.path,
                step = target.as_str(),
                "Submission blocked by validation",
            );
            self.notify(
                NoticeLevel::Error,
                format!("Please fix the highlighted fields in {}.", target.label()),
            );
            self.step = target;
            return Ok(Prepared::Blocked { step: target });
        }

        let mut payload = submission::assemble(&self.draft)?;
        if self.draft.is_virtual && self.draft.streaming_platform.uses_generated_room() {
            payload.fields.insert(
                "meeting_link".into(),
                meeting::meeting_url(&self.config.meeting, self.draft.room_name.trim()),
            );
        }

        self.errors.clear();
        self.status = WizardStatus::Submitting;
        tracing::info!(
            user_id = %self.user_id,
            fields = payload.fields.len(),
            files = payload.files.len(),
            "Submitting event",
        );
        Ok(Prepared::Ready(payload))
    }

    /// Apply the result of the create operation.
    pub fn complete_submission(
        &mut self,
        result: Result<CreatedEvent, ServiceError>,
    ) -> Result<Transition, WizardError> {
        if self.status != WizardStatus::Submitting {
            return Err(WizardError::NoSubmission);
        }

        match result {
            Ok(created) => {
                self.status = WizardStatus::Submitted;
                self.field_timer.cancel();
                self.live_fields.clear();
                self.errors.clear();
                self.touched.clear();
                self.submit_attempted = false;
                self.has_unsaved_changes = false;
                if let Err(e) = self.autosave.clear() {
                    self.report_store_failure(&e);
                }
                tracing::info!(
                    user_id = %self.user_id,
                    event_id = %created.id,
                    "Event created",
                );
                self.notify(
                    NoticeLevel::Success,
                    format!("\"{}\" has been created.", display_title(&created, &self.draft)),
                );
                Ok(Transition::Submitted(created))
            }
            Err(error) => {
                self.status = WizardStatus::Editing;
                self.step = last_step();
                let step = error.field.as_deref().and_then(|field| {
                    let owner = owner_of(field)?;
                    self.errors.insert(field, error.message.clone());
                    self.touched.touch(field);
                    Some(owner)
                });
                tracing::warn!(
                    user_id = %self.user_id,
                    code = %error.code,
                    error = %error.message,
                    field = ?error.field,
                    "Event creation failed",
                );
                let err = WizardError::Submission { error, step };
                self.notify(NoticeLevel::Error, err.user_message());
                Err(err)
            }
        }
    }

    /// Validate, assemble and send the event.
    pub async fn submit(&mut self) -> Result<Transition, WizardError> {
        let payload = match self.prepare_submission()? {
            Prepared::Ready(payload) => payload,
            Prepared::Blocked { step } => return Ok(Transition::Blocked { step }),
        };
        let events = self.services.events.clone();
        let result = events.create(payload).await;
        self.complete_submission(result)
    }

    /// Abandon the wizard and delete the saved draft.
    pub fn cancel(&mut self) -> Result<Transition, WizardError> {
        self.ensure_editable()?;
        if let Err(e) = self.autosave.clear() {
            self.report_store_failure(&e);
        }
        self.field_timer.cancel();
        self.live_fields.clear();
        self.uploads.clear();
        self.status = WizardStatus::Cancelled;
        tracing::info!(user_id = %self.user_id, step = self.step.as_str(), "Wizard cancelled");
        Ok(Transition::Cancelled)
    }

    // -----------------------------------------------------------------------
    // Uploads
    // -----------------------------------------------------------------------

    /// Register an upload; navigation is refused until it finishes.
    pub fn begin_upload(
        &mut self,
        target: UploadTarget,
        file: PendingFile,
    ) -> Result<UploadTicket, WizardError> {
        self.ensure_editable()?;
        if !self.target_exists(target) {
            return Err(WizardError::UploadTargetGone);
        }
        let id = self.next_upload_id;
        self.next_upload_id += 1;
        self.uploads.insert(id, Some(target));
        tracing::debug!(upload_id = id, file_name = %file.file_name, "Upload started");
        Ok(UploadTicket { id, target, file })
    }

    /// Record the outcome of the upload registered as `ticket_id`.
    pub fn finish_upload(
        &mut self,
        ticket_id: u64,
        result: Result<UploadedAsset, UploadError>,
    ) -> Result<(), WizardError> {
        let target = self
            .uploads
            .remove(&ticket_id)
            .ok_or(WizardError::UnknownUpload(ticket_id))?;
        self.ensure_not_closed()?;

        let Some(target) = target else {
            tracing::warn!(upload_id = ticket_id, "Upload finished after its target was removed");
            let err = WizardError::UploadTargetGone;
            self.notify(NoticeLevel::Warning, err.user_message());
            return Err(err);
        };

        let asset = match result {
            Ok(asset) => asset,
            Err(e) => {
                let err = WizardError::Upload(e);
                self.notify(NoticeLevel::Error, err.user_message());
                return Err(err);
            }
        };

        let mut image = ImageRef::from(asset);
        let path = match target {
            UploadTarget::NewImage => {
                self.draft.images.push(image);
                format!("images.{}", self.draft.images.len() - 1)
            }
            UploadTarget::Image(i) => {
                let slot = self
                    .draft
                    .images
                    .get_mut(i)
                    .ok_or(WizardError::UploadTargetGone)?;
                if image.attribution.is_none() {
                    image.attribution = slot.attribution.take();
                }
                *slot = image;
                format!("images.{i}")
            }
            UploadTarget::SpeakerPhoto(i) => {
                let speaker = self
                    .draft
                    .speakers
                    .get_mut(i)
                    .ok_or(WizardError::UploadTargetGone)?;
                speaker.photo = Some(image);
                format!("speakers.{i}.photo")
            }
        };

        self.errors.remove_touching(&path);
        if target == UploadTarget::NewImage {
            self.errors.remove(Field::Images.as_str());
        }
        self.mark_changed(Instant::now());
        self.notify(NoticeLevel::Success, "Image uploaded.");
        Ok(())
    }

    /// Upload `file` with retries and place it at `target`.
    pub async fn upload(
        &mut self,
        target: UploadTarget,
        file: PendingFile,
    ) -> Result<(), WizardError> {
        let ticket = self.begin_upload(target, file)?;
        let uploader = self.services.uploader.clone();
        let result = upload_with_retry(
            uploader.as_ref(),
            ticket.file(),
            ticket.category(),
            &self.config.upload_retry,
        )
        .await;
        self.finish_upload(ticket.id(), result)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn step(&self) -> StepId {
        self.step
    }

    pub fn draft(&self) -> &EventDraft {
        &self.draft
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn touched(&self) -> &TouchedFields {
        &self.touched
    }

    pub fn status(&self) -> WizardStatus {
        self.status
    }

    pub fn is_submitting(&self) -> bool {
        self.status == WizardStatus::Submitting
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.has_unsaved_changes
    }

    pub fn uploads_in_flight(&self) -> usize {
        self.uploads.len()
    }

    pub fn is_uploading(&self) -> bool {
        !self.uploads.is_empty()
    }

    /// The error for `path`, once the user should see it.
    pub fn visible_error(&self, path: &str) -> Option<&str> {
        if self.submit_attempted || self.touched.is_touched(path) {
            self.errors.get(path)
        } else {
            None
        }
    }

    /// `(current step number, total steps)`, 1-based.
    pub fn progress(&self) -> (u8, u8) {
        (self.step.to_number(), STEPS.len() as u8)
    }

    pub fn step_summary(&self) -> Vec<StepSummary> {
        STEPS
            .iter()
            .map(|def| StepSummary {
                id: def.id,
                label: def.display_name,
                number: def.id.to_number(),
                is_current: def.id == self.step,
                has_errors: step_has_errors(def.id, &self.errors),
            })
            .collect()
    }

    /// Drain queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn ensure_not_closed(&self) -> Result<(), WizardError> {
        if self.status.is_closed() {
            return Err(WizardError::Closed);
        }
        Ok(())
    }

    fn ensure_editable(&self) -> Result<(), WizardError> {
        self.ensure_not_closed()?;
        if self.status == WizardStatus::Submitting {
            return Err(WizardError::SubmissionInFlight);
        }
        Ok(())
    }

    fn ensure_no_uploads(&mut self) -> Result<(), WizardError> {
        if self.uploads.is_empty() {
            return Ok(());
        }
        let err = WizardError::UploadInProgress;
        self.notify(NoticeLevel::Warning, err.user_message());
        Err(err)
    }

    fn move_to(&mut self, to: StepId) -> Transition {
        let from = self.step;
        self.step = to;
        if from != to {
            self.mark_changed(Instant::now());
        }
        tracing::info!(
            user_id = %self.user_id,
            from = from.as_str(),
            to = to.as_str(),
            "Wizard step changed",
        );
        Transition::Moved { from, to }
    }

    fn mark_changed(&mut self, now: Instant) {
        // Any local change wins over a snapshot restored later.
        self.mounted = true;
        self.has_unsaved_changes = true;
        self.autosave.mark_dirty(now);
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    fn report_store_failure(&mut self, error: &crate::persistence::DraftStoreError) {
        tracing::warn!(user_id = %self.user_id, error = %error, "Draft store failure");
        self.notify(NoticeLevel::Warning, DRAFT_SAVE_FAILED);
    }

    /// Generate a room for the built-in platform when none exists and drop
    /// errors of the inactive location shape.
    fn sync_location_shape(&mut self) {
        if !self.draft.is_virtual {
            for path in ["meeting_link", "room_name", "streaming_platform"] {
                self.errors.remove_touching(path);
            }
            return;
        }

        self.errors.remove_touching(Field::Location.as_str());
        if self.draft.streaming_platform.uses_generated_room() {
            self.errors.remove_touching(Field::MeetingLink.as_str());
            if self.draft.room_name.trim().is_empty() {
                let event_ref = self
                    .draft
                    .event_id
                    .clone()
                    .unwrap_or_else(|| self.placeholder_ref.clone());
                self.draft.room_name = meeting::room_name(&event_ref, chrono::Utc::now());
                self.errors.remove_touching(Field::RoomName.as_str());
                tracing::debug!(room = %self.draft.room_name, "Generated meeting room");
            }
        } else {
            self.errors.remove_touching(Field::RoomName.as_str());
        }
    }

    fn list_len(&self, field: Field) -> Option<usize> {
        if !LIST_FIELDS.contains(&field) {
            return None;
        }
        let d = &self.draft;
        Some(match field {
            Field::Tags => d.tags.len(),
            Field::Requirements => d.requirements.len(),
            Field::TargetAudience => d.target_audience.len(),
            Field::Images => d.images.len(),
            Field::Speakers => d.speakers.len(),
            _ => return None,
        })
    }

    /// Detach in-flight uploads aimed at a list that lost entries; indices
    /// recorded in their tickets no longer identify the same entry.
    fn detach_uploads(&mut self, (images, speakers): (usize, usize)) {
        let images_shrank = self.draft.images.len() < images;
        let speakers_shrank = self.draft.speakers.len() < speakers;
        if !images_shrank && !speakers_shrank {
            return;
        }
        for (id, slot) in self.uploads.iter_mut() {
            let gone = match slot {
                Some(UploadTarget::Image(_)) => images_shrank,
                Some(UploadTarget::SpeakerPhoto(_)) => speakers_shrank,
                _ => false,
            };
            if gone {
                tracing::debug!(upload_id = *id, "Upload target removed");
                *slot = None;
            }
        }
    }

    fn target_exists(&self, target: UploadTarget) -> bool {
        match target {
            UploadTarget::NewImage => true,
            UploadTarget::Image(i) => i < self.draft.images.len(),
            UploadTarget::SpeakerPhoto(i) => i < self.draft.speakers.len(),
        }
    }

    /// Replace the error entries overlapping `path` with fresh results.
    fn revalidate_path(&mut self, path: &str) {
        self.errors.remove_touching(path);
        for issue in schema::issues_touching(path, &self.draft) {
            self.errors.insert_if_absent(&issue.path, &issue.message);
        }
    }

    fn run_live_validation(&mut self) {
        let fields = std::mem::take(&mut self.live_fields);
        for field in fields {
            // Only refresh what the user can already see.
            if self.touched.is_touched(field.as_str()) || self.errors.contains(field.as_str()) {
                self.revalidate_path(field.as_str());
            }
        }
    }
}

fn display_title<'a>(created: &'a CreatedEvent, draft: &'a EventDraft) -> &'a str {
    if created.title.trim().is_empty() {
        draft.title.trim()
    } else {
        created.title.trim()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;
    use crate::draft::StreamingPlatform;
    use crate::persistence::{save_draft, MemoryDraftStore};
    use crate::services::GateError;
    use crate::test_support::valid_draft;

    struct NoopEvents;

    #[async_trait]
    impl EventService for NoopEvents {
        async fn create(&self, _payload: SubmissionPayload) -> Result<CreatedEvent, ServiceError> {
            Ok(CreatedEvent {
                id: "evt_1".into(),
                title: String::new(),
            })
        }
    }

    struct NoopUploader;

    #[async_trait]
    impl AssetUploader for NoopUploader {
        async fn upload(
            &self,
            _file: &PendingFile,
            _category: AssetCategory,
        ) -> Result<UploadedAsset, UploadError> {
            Err(UploadError::Rejected("not in unit tests".into()))
        }
    }

    struct OpenGate(bool);

    #[async_trait]
    impl SubscriptionGate for OpenGate {
        async fn can_create_event(&self, _user_id: &str) -> Result<bool, GateError> {
            Ok(self.0)
        }
    }

    fn services(store: Arc<MemoryDraftStore>, gate: bool) -> WizardServices {
        WizardServices {
            events: Arc::new(NoopEvents),
            uploader: Arc::new(NoopUploader),
            store,
            gate: Arc::new(OpenGate(gate)),
        }
    }

    fn wizard() -> WizardController {
        let store = Arc::new(MemoryDraftStore::new());
        let mut wizard =
            WizardController::new("user_1", WizardConfig::default(), services(store, true));
        wizard.mount();
        wizard
    }

    fn wizard_with(draft: EventDraft) -> WizardController {
        let mut wizard = wizard();
        wizard.change(Field::Title, |d| *d = draft).unwrap();
        wizard
    }

    // -- open / mount --

    #[tokio::test]
    async fn open_respects_gate() {
        let store = Arc::new(MemoryDraftStore::new());
        let result =
            WizardController::open("user_1", WizardConfig::default(), services(store, false)).await;
        let Err(err) = result else {
            panic!("gate should refuse the wizard");
        };
        assert_matches!(err, WizardError::LimitReached { ref user_id } if user_id == "user_1");
    }

    #[test]
    fn mount_restores_once_and_clears_unsaved_flag() {
        let store = Arc::new(MemoryDraftStore::new());
        save_draft(store.as_ref(), "user_1", StepId::Tickets, &valid_draft()).unwrap();

        let mut wizard =
            WizardController::new("user_1", WizardConfig::default(), services(store, true));
        assert!(wizard.mount());
        assert_eq!(wizard.step(), StepId::Tickets);
        assert_eq!(wizard.draft(), &valid_draft());
        assert!(!wizard.has_unsaved_changes());
        assert!(!wizard.mount());
    }

    #[test]
    fn edits_before_mount_prevent_restore() {
        let store = Arc::new(MemoryDraftStore::new());
        save_draft(store.as_ref(), "user_1", StepId::Tickets, &valid_draft()).unwrap();

        let mut wizard =
            WizardController::new("user_1", WizardConfig::default(), services(store, true));
        wizard.change(Field::Title, |d| d.title = "Fresh".into()).unwrap();
        assert!(!wizard.mount());
        assert_eq!(wizard.draft().title, "Fresh");
    }

    // -- change --

    #[test]
    fn change_sets_unsaved_flag_and_schedules_save() {
        let mut wizard = wizard();
        assert!(!wizard.has_unsaved_changes());
        assert!(wizard.next_deadline().is_none());
        wizard.change(Field::Category, |d| d.category = "music".into()).unwrap();
        assert!(wizard.has_unsaved_changes());
        assert!(wizard.next_deadline().is_some());
    }

    #[test]
    fn virtual_toggle_keeps_generated_room() {
        let mut wizard = wizard_with(valid_draft());
        wizard.change(Field::IsVirtual, |d| d.is_virtual = true).unwrap();
        let room = wizard.draft().room_name.clone();
        assert!(room.starts_with("event-temp-"), "{room}");

        wizard.change(Field::IsVirtual, |d| d.is_virtual = false).unwrap();
        wizard.change(Field::IsVirtual, |d| d.is_virtual = true).unwrap();
        assert_eq!(wizard.draft().room_name, room);
    }

    #[test]
    fn room_uses_event_id_when_known() {
        let mut draft = valid_draft();
        draft.event_id = Some("evt_99".into());
        let mut wizard = wizard_with(draft);
        wizard.change(Field::IsVirtual, |d| d.is_virtual = true).unwrap();
        assert!(wizard.draft().room_name.starts_with("event-evt-99-"));
    }

    #[test]
    fn external_platform_does_not_generate_room() {
        let mut wizard = wizard_with(valid_draft());
        wizard
            .change(Field::StreamingPlatform, |d| d.streaming_platform = StreamingPlatform::Zoom)
            .unwrap();
        wizard.change(Field::IsVirtual, |d| d.is_virtual = true).unwrap();
        assert!(wizard.draft().room_name.is_empty());
    }

    #[test]
    fn going_free_clears_price_errors() {
        let mut draft = valid_draft();
        draft.is_free_event = false;
        draft.price = Some(0.0);
        let mut wizard = wizard_with(draft);
        wizard.edit_step(StepId::Tickets).unwrap();
        wizard.blur("price").unwrap();
        assert_eq!(wizard.visible_error("price"), Some("Price must be at least 0.01"));

        wizard.change(Field::IsFreeEvent, |d| d.is_free_event = true).unwrap();
        assert!(wizard.errors().get("price").is_none());
    }

    #[test]
    fn removing_speaker_drops_nested_errors() {
        let mut draft = valid_draft();
        draft.speakers.push(Default::default());
        let mut wizard = wizard_with(draft);
        wizard.blur("speakers").unwrap();
        assert!(wizard.errors().contains("speakers.0.name"));

        wizard
            .change(Field::Speakers, |d| {
                d.speakers.pop();
            })
            .unwrap();
        assert!(!wizard.errors().any(|k| k.starts_with("speakers.")));
    }

    // -- live validation --

    #[test]
    fn title_validation_is_debounced() {
        let mut wizard = wizard();
        let t0 = Instant::now();
        wizard.blur("title").unwrap();
        assert!(wizard.visible_error("title").is_some());

        wizard.change_at(Field::Title, t0, |d| d.title = "Ru".into()).unwrap();
        wizard.poll(t0 + Duration::from_millis(100));
        assert_eq!(wizard.visible_error("title"), Some("Event title is required"));

        wizard.poll(t0 + Duration::from_millis(500));
        assert_eq!(
            wizard.visible_error("title"),
            Some("Title must be at least 3 characters")
        );

        wizard
            .change_at(Field::Title, t0 + Duration::from_secs(1), |d| {
                d.title = "Rust".into()
            })
            .unwrap();
        wizard.poll(t0 + Duration::from_millis(1500));
        assert!(wizard.visible_error("title").is_none());
    }

    #[test]
    fn blur_reveals_only_that_field() {
        let mut wizard = wizard();
        wizard.blur("category").unwrap();
        assert_eq!(wizard.visible_error("category"), Some("Please choose a category"));
        assert!(wizard.visible_error("title").is_none());
        assert!(!wizard.errors().contains("title"));
    }

    // -- navigation --

    #[tokio::test]
    async fn next_blocks_on_step_errors_only() {
        let mut draft = valid_draft();
        draft.location = Default::default();
        let mut wizard = wizard_with(draft);

        assert_matches!(
            wizard.next().await,
            Ok(Transition::Moved {
                from: StepId::BasicInfo,
                to: StepId::DateTime
            })
        );
        assert_matches!(wizard.next().await, Ok(Transition::Moved { .. }));
        assert_matches!(wizard.next().await, Ok(Transition::Blocked { step: StepId::Location }));
        assert_eq!(wizard.step(), StepId::Location);
        assert!(wizard.visible_error("location").is_some());
        let notices = wizard.take_notices();
        assert_eq!(notices.last().map(|n| n.level), Some(NoticeLevel::Error));
    }

    #[test]
    fn back_on_first_step_cancels() {
        let mut wizard = wizard();
        assert_matches!(wizard.back(), Ok(Transition::Cancelled));
        assert_eq!(wizard.status(), WizardStatus::Cancelled);
        assert_matches!(wizard.edit_step(StepId::Review), Err(WizardError::Closed));
    }

    #[test]
    fn edit_step_skips_validation() {
        let mut wizard = wizard();
        assert_matches!(
            wizard.edit_step(StepId::Media),
            Ok(Transition::Moved { from: StepId::BasicInfo, to: StepId::Media })
        );
        assert!(wizard.errors().is_empty());
        assert_eq!(wizard.progress(), (6, 7));
    }

    #[tokio::test]
    async fn upload_in_flight_blocks_navigation() {
        let mut wizard = wizard_with(valid_draft());
        let ticket = wizard
            .begin_upload(UploadTarget::NewImage, PendingFile::new("a.png", "image/png", vec![1]))
            .unwrap();
        assert!(wizard.is_uploading());
        assert_matches!(wizard.next().await, Err(WizardError::UploadInProgress));
        assert_matches!(wizard.prepare_submission(), Err(WizardError::UploadInProgress));

        let asset = UploadedAsset {
            url: "https://cdn.example.com/b.png".into(),
            storage_id: "img_2".into(),
            width: 10,
            height: 10,
            attribution: None,
        };
        wizard.finish_upload(ticket.id(), Ok(asset)).unwrap();
        assert!(!wizard.is_uploading());
        assert_eq!(wizard.draft().images.len(), 2);
        assert_matches!(wizard.next().await, Ok(Transition::Moved { .. }));
    }

    #[test]
    fn unknown_ticket_is_rejected() {
        let mut wizard = wizard();
        assert_matches!(
            wizard.finish_upload(42, Err(UploadError::Transient("x".into()))),
            Err(WizardError::UnknownUpload(42))
        );
        assert_matches!(
            wizard.begin_upload(
                UploadTarget::SpeakerPhoto(3),
                PendingFile::new("a", "image/png", vec![])
            ),
            Err(WizardError::UploadTargetGone)
        );
    }

    // -- summary --

    #[test]
    fn step_summary_flags_steps_with_errors() {
        let mut draft = valid_draft();
        draft.title.clear();
        let mut wizard = wizard_with(draft);
        assert_matches!(
            wizard.prepare_submission(),
            Ok(Prepared::Blocked {
                step: StepId::BasicInfo
            })
        );

        let summary = wizard.step_summary();
        assert_eq!(summary.len(), 7);
        assert!(summary[0].has_errors);
        assert!(summary[0].is_current);
        assert!(summary[1..].iter().all(|s| !s.has_errors));
    }
}
