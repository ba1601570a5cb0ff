//! The in-progress event record collected by the submission wizard.
//!
//! [`EventDraft`] is deliberately permissive: every attribute may be empty
//! while the user works through the steps. Whether a value is acceptable is
//! decided by [`crate::schema`], never by the type itself.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::services::UploadedAsset;

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// Top-level attributes of an [`EventDraft`].
///
/// Error paths are rooted at one of these names (`location.city` belongs to
/// [`Field::Location`], `speakers.0.name` to [`Field::Speakers`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Category,
    ShortDescription,
    Description,
    Tags,
    Date,
    StartTime,
    EndTime,
    Duration,
    IsVirtual,
    StreamingPlatform,
    MeetingLink,
    RoomName,
    Location,
    Requirements,
    TargetAudience,
    MinAttendees,
    MaxAttendees,
    Visibility,
    IsFreeEvent,
    Price,
    Currency,
    RefundPolicy,
    EarlyBirdPrice,
    EarlyBirdDeadline,
    Images,
    Speakers,
}

impl Field {
    pub const ALL: [Field; 27] = [
        Self::Title,
        Self::Category,
        Self::ShortDescription,
        Self::Description,
        Self::Tags,
        Self::Date,
        Self::StartTime,
        Self::EndTime,
        Self::Duration,
        Self::IsVirtual,
        Self::StreamingPlatform,
        Self::MeetingLink,
        Self::RoomName,
        Self::Location,
        Self::Requirements,
        Self::TargetAudience,
        Self::MinAttendees,
        Self::MaxAttendees,
        Self::Visibility,
        Self::IsFreeEvent,
        Self::Price,
        Self::Currency,
        Self::RefundPolicy,
        Self::EarlyBirdPrice,
        Self::EarlyBirdDeadline,
        Self::Images,
        Self::Speakers,
    ];

    /// Serialized name of the field, which is also the root of its error paths.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Category => "category",
            Self::ShortDescription => "short_description",
            Self::Description => "description",
            Self::Tags => "tags",
            Self::Date => "date",
            Self::StartTime => "start_time",
            Self::EndTime => "end_time",
            Self::Duration => "duration",
            Self::IsVirtual => "is_virtual",
            Self::StreamingPlatform => "streaming_platform",
            Self::MeetingLink => "meeting_link",
            Self::RoomName => "room_name",
            Self::Location => "location",
            Self::Requirements => "requirements",
            Self::TargetAudience => "target_audience",
            Self::MinAttendees => "min_attendees",
            Self::MaxAttendees => "max_attendees",
            Self::Visibility => "visibility",
            Self::IsFreeEvent => "is_free_event",
            Self::Price => "price",
            Self::Currency => "currency",
            Self::RefundPolicy => "refund_policy",
            Self::EarlyBirdPrice => "early_bird_price",
            Self::EarlyBirdDeadline => "early_bird_deadline",
            Self::Images => "images",
            Self::Speakers => "speakers",
        }
    }

    /// Resolve the field that roots a (possibly nested) error path.
    pub fn from_path(path: &str) -> Option<Field> {
        let root = path.split('.').next()?;
        Self::ALL.into_iter().find(|f| f.as_str() == root)
    }

    /// Whether `path` is this field or nested beneath it.
    pub fn owns_path(self, path: &str) -> bool {
        crate::errors::is_path_prefix(self.as_str(), path)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Streaming platform
// ---------------------------------------------------------------------------

/// Conferencing platform used by a virtual event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamingPlatform {
    /// The platform's own conferencing; rooms are generated, not typed in.
    #[default]
    BuiltIn,
    Zoom,
    GoogleMeet,
    MicrosoftTeams,
    Youtube,
    Other,
}

impl StreamingPlatform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BuiltIn => "built_in",
            Self::Zoom => "zoom",
            Self::GoogleMeet => "google_meet",
            Self::MicrosoftTeams => "microsoft_teams",
            Self::Youtube => "youtube",
            Self::Other => "other",
        }
    }

    /// Human-readable label for the platform.
    pub fn label(self) -> &'static str {
        match self {
            Self::BuiltIn => "Built-in video rooms",
            Self::Zoom => "Zoom",
            Self::GoogleMeet => "Google Meet",
            Self::MicrosoftTeams => "Microsoft Teams",
            Self::Youtube => "YouTube Live",
            Self::Other => "Other",
        }
    }

    /// Built-in conferencing addresses events by a generated room name
    /// instead of a user-supplied meeting link.
    pub fn uses_generated_room(self) -> bool {
        matches!(self, Self::BuiltIn)
    }
}

// ---------------------------------------------------------------------------
// Physical location
// ---------------------------------------------------------------------------

/// Venue of an in-person event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalLocation {
    pub address: String,
    pub city: String,
    pub country: String,
    pub postal_code: String,
}

impl PhysicalLocation {
    /// In-person events must be findable by at least an address or a city.
    pub fn has_address_or_city(&self) -> bool {
        !self.address.trim().is_empty() || !self.city.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Images and speakers
// ---------------------------------------------------------------------------

/// Credit line for third-party stock imagery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attribution {
    pub author: String,
    pub source_url: Option<String>,
}

/// A file selected locally but not uploaded yet.
///
/// Never serialized: pending files do not survive a reload and must be
/// selected again.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PendingFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

impl fmt::Debug for PendingFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Reference to an event image or speaker photo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageRef {
    pub url: String,
    pub storage_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Attribution>,
    #[serde(skip)]
    pub pending_file: Option<PendingFile>,
}

impl ImageRef {
    /// An image that will be sent as a binary part of the submission.
    pub fn pending(file: PendingFile) -> Self {
        Self {
            pending_file: Some(file),
            ..Default::default()
        }
    }

    /// Whether the image already lives in asset storage.
    pub fn is_uploaded(&self) -> bool {
        !self.url.trim().is_empty()
    }

    /// Whether the image can be submitted (uploaded, or carrying a file).
    pub fn has_source(&self) -> bool {
        self.is_uploaded() || self.pending_file.is_some()
    }
}

impl From<UploadedAsset> for ImageRef {
    fn from(asset: UploadedAsset) -> Self {
        Self {
            url: asset.url,
            storage_id: asset.storage_id,
            width: asset.width,
            height: asset.height,
            attribution: asset.attribution,
            pending_file: None,
        }
    }
}

/// A person presenting at the event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Speaker {
    pub name: String,
    pub role: String,
    pub bio: String,
    pub photo: Option<ImageRef>,
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Who may see the finished event.
///
/// Always serialized in the canonical tagged form
/// (`{"status":"private","allow_list":[...]}`). Deserialization accepts the
/// looser shapes found in older snapshots and API payloads and normalizes
/// them, so nothing downstream inspects the raw shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", from = "RawVisibility")]
pub enum Visibility {
    Public,
    Private { allow_list: Vec<String> },
}

impl Default for Visibility {
    fn default() -> Self {
        Self::Public
    }
}

impl Visibility {
    /// Build a visibility from a loose status string and allow list.
    ///
    /// Only `private` selects [`Visibility::Private`]; every other status,
    /// including retired ones such as `unlisted`, normalizes to public.
    /// Allow-list entries are trimmed, blank entries dropped, duplicates
    /// removed (first occurrence wins).
    pub fn normalize(status: &str, allow_list: Vec<String>) -> Self {
        if !status.trim().eq_ignore_ascii_case("private") {
            return Self::Public;
        }
        let mut normalized: Vec<String> = Vec::with_capacity(allow_list.len());
        for entry in allow_list {
            let entry = entry.trim();
            if !entry.is_empty() && !normalized.iter().any(|e| e == entry) {
                normalized.push(entry.to_string());
            }
        }
        Self::Private {
            allow_list: normalized,
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private { .. })
    }

    /// Identifiers allowed to see a private event (empty when public).
    pub fn allow_list(&self) -> &[String] {
        match self {
            Self::Public => &[],
            Self::Private { allow_list } => allow_list,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Private { .. } => "Private",
        }
    }
}

/// Shapes of visibility accepted at the boundary.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawVisibility {
    Status(String),
    Record {
        status: String,
        #[serde(default, alias = "allowed_users", alias = "allowedUsers", alias = "allowList")]
        allow_list: Vec<String>,
    },
}

impl From<RawVisibility> for Visibility {
    fn from(raw: RawVisibility) -> Self {
        match raw {
            RawVisibility::Status(status) => Visibility::normalize(&status, Vec::new()),
            RawVisibility::Record { status, allow_list } => {
                Visibility::normalize(&status, allow_list)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Event draft
// ---------------------------------------------------------------------------

/// The mutable, partially-filled event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDraft {
    /// Set when the draft edits an event that already exists remotely.
    pub event_id: Option<String>,

    pub title: String,
    pub category: String,
    pub short_description: String,
    pub description: String,
    pub tags: Vec<String>,

    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    /// Planned length in minutes.
    pub duration: Option<u32>,

    pub is_virtual: bool,
    pub streaming_platform: StreamingPlatform,
    pub meeting_link: String,
    pub room_name: String,
    pub location: PhysicalLocation,

    pub requirements: Vec<String>,
    pub target_audience: Vec<String>,
    pub min_attendees: Option<u32>,
    pub max_attendees: Option<u32>,
    pub visibility: Visibility,

    pub is_free_event: bool,
    pub price: Option<f64>,
    pub currency: String,
    pub refund_policy: String,
    pub early_bird_price: Option<f64>,
    pub early_bird_deadline: Option<NaiveDate>,

    pub images: Vec<ImageRef>,
    pub speakers: Vec<Speaker>,
}

impl Default for EventDraft {
    fn default() -> Self {
        Self {
            event_id: None,
            title: String::new(),
            category: String::new(),
            short_description: String::new(),
            description: String::new(),
            tags: Vec::new(),
            date: None,
            start_time: None,
            end_time: None,
            duration: None,
            is_virtual: false,
            streaming_platform: StreamingPlatform::default(),
            meeting_link: String::new(),
            room_name: String::new(),
            location: PhysicalLocation::default(),
            requirements: Vec::new(),
            target_audience: Vec::new(),
            min_attendees: None,
            max_attendees: None,
            visibility: Visibility::default(),
            is_free_event: true,
            price: None,
            currency: "USD".to_string(),
            refund_policy: String::new(),
            early_bird_price: None,
            early_bird_deadline: None,
            images: Vec::new(),
            speakers: Vec::new(),
        }
    }
}

impl EventDraft {
    /// Whether any image or speaker photo still holds a local file.
    pub fn has_pending_files(&self) -> bool {
        self.images.iter().any(|i| i.pending_file.is_some())
            || self
                .speakers
                .iter()
                .filter_map(|s| s.photo.as_ref())
                .any(|p| p.pending_file.is_some())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
