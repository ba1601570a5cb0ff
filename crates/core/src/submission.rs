//! Assembly of the create-operation payload.
//!
//! The payload is a flat key/value map: scalars are written as plain text,
//! nested objects and lists are pre-serialized as JSON. Files that were
//! never uploaded separately travel as binary parts keyed by the path of the
//! image they belong to (`images.0`, `speakers.2.photo`).
//!
//! Only the active shape is sent: a virtual event carries no physical
//! location and a free event carries no pricing.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::draft::{EventDraft, ImageRef, PendingFile};
use crate::services::AssetCategory;

/// A pending file attached to the submission.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    /// Path of the image the file belongs to.
    pub field: String,
    pub category: AssetCategory,
    pub file: PendingFile,
    /// JSON metadata sent alongside the binary part.
    pub metadata: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionPayload {
    pub fields: BTreeMap<String, String>,
    pub files: Vec<FilePart>,
}

impl SubmissionPayload {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    fn text(&mut self, key: &str, value: &str) {
        self.fields.insert(key.to_string(), value.trim().to_string());
    }

    fn scalar(&mut self, key: &str, value: impl ToString) {
        self.fields.insert(key.to_string(), value.to_string());
    }

    fn json<T>(&mut self, key: &str, value: &T) -> Result<(), serde_json::Error>
    where
        T: Serialize + ?Sized,
    {
        self.fields.insert(key.to_string(), serde_json::to_string(value)?);
        Ok(())
    }
}

#[derive(Serialize)]
struct FileMetadata<'a> {
    file_name: &'a str,
    content_type: &'a str,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    attribution: Option<&'a crate::draft::Attribution>,
}

fn file_part(
    field: String,
    category: AssetCategory,
    image: &ImageRef,
) -> Option<Result<FilePart, serde_json::Error>> {
    let file = image.pending_file.as_ref()?;
    let metadata = FileMetadata {
        file_name: &file.file_name,
        content_type: &file.content_type,
        size: file.bytes.len(),
        attribution: image.attribution.as_ref(),
    };
    Some(serde_json::to_string(&metadata).map(|metadata| FilePart {
        field,
        category,
        file: file.clone(),
        metadata,
    }))
}

/// Build the create payload for `draft`.
pub fn assemble(draft: &EventDraft) -> Result<SubmissionPayload, serde_json::Error> {
    let mut payload = SubmissionPayload::default();

    if let Some(id) = &draft.event_id {
        payload.text("event_id", id);
    }

    // Basic info
    payload.text("title", &draft.title);
    payload.text("category", &draft.category);
    payload.text("short_description", &draft.short_description);
    payload.text("description", &draft.description);
    payload.json("tags", &draft.tags)?;

    // Date & time
    if let Some(date) = draft.date {
        payload.scalar("date", date.format("%Y-%m-%d"));
    }
    if let Some(start) = draft.start_time {
        payload.scalar("start_time", start.format("%H:%M"));
    }
    if let Some(end) = draft.end_time {
        payload.scalar("end_time", end.format("%H:%M"));
    }
    if let Some(duration) = draft.duration {
        payload.scalar("duration", duration);
    }

    // Location
    payload.scalar("is_virtual", draft.is_virtual);
    if draft.is_virtual {
        payload.scalar("streaming_platform", draft.streaming_platform.as_str());
        if draft.streaming_platform.uses_generated_room() {
            payload.text("room_name", &draft.room_name);
        }
        if !draft.meeting_link.trim().is_empty() {
            payload.text("meeting_link", &draft.meeting_link);
        }
    } else {
        payload.json("location", &draft.location)?;
    }

    // Audience & access
    payload.json("requirements", &draft.requirements)?;
    payload.json("target_audience", &draft.target_audience)?;
    if let Some(min) = draft.min_attendees {
        payload.scalar("min_attendees", min);
    }
    if let Some(max) = draft.max_attendees {
        payload.scalar("max_attendees", max);
    }
    payload.json("visibility", &draft.visibility)?;

    // Tickets
    payload.scalar("is_free_event", draft.is_free_event);
    if !draft.is_free_event {
        if let Some(price) = draft.price {
            payload.scalar("price", price);
        }
        payload.scalar("currency", draft.currency.trim().to_uppercase());
        payload.text("refund_policy", &draft.refund_policy);
        if let Some(early) = draft.early_bird_price {
            payload.scalar("early_bird_price", early);
        }
        if let Some(deadline) = draft.early_bird_deadline {
            payload.scalar("early_bird_deadline", deadline.format("%Y-%m-%d"));
        }
    }

    // Images & speakers
    payload.json("images", &draft.images)?;
    payload.json("speakers", &draft.speakers)?;

    for (i, image) in draft.images.iter().enumerate() {
        if let Some(part) = file_part(format!("images.{i}"), AssetCategory::EventImage, image) {
            payload.files.push(part?);
        }
    }
    for (i, speaker) in draft.speakers.iter().enumerate() {
        let Some(photo) = &speaker.photo else { continue };
        let field = format!("speakers.{i}.photo");
        if let Some(part) = file_part(field, AssetCategory::SpeakerPhoto, photo) {
            payload.files.push(part?);
        }
    }

    Ok(payload)
}
