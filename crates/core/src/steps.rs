//! Step definitions for the event submission wizard.
//!
//! The wizard has seven steps. Each step owns a fixed set of top-level
//! [`Field`]s; ownership routes validation errors to a step and decides
//! which errors block navigation away from it.

use serde::{Deserialize, Serialize};

use crate::draft::Field;

// ---------------------------------------------------------------------------
// Step ids
// ---------------------------------------------------------------------------

/// The seven steps in the event wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    BasicInfo,
    DateTime,
    Location,
    Details,
    Tickets,
    Media,
    Review,
}

/// Total number of steps in the wizard.
pub const TOTAL_STEPS: u8 = 7;

/// Minimum step number (1-based).
pub const MIN_STEP: u8 = 1;

/// Maximum step number (1-based).
pub const MAX_STEP: u8 = 7;

impl StepId {
    /// Convert a 1-based step number to a `StepId`.
    pub fn from_number(n: u8) -> Option<Self> {
        STEPS.get(usize::from(n).checked_sub(1)?).map(|d| d.id)
    }

    /// Convert to a 1-based step number.
    pub fn to_number(self) -> u8 {
        match self {
            Self::BasicInfo => 1,
            Self::DateTime => 2,
            Self::Location => 3,
            Self::Details => 4,
            Self::Tickets => 5,
            Self::Media => 6,
            Self::Review => 7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BasicInfo => "basic_info",
            Self::DateTime => "date_time",
            Self::Location => "location",
            Self::Details => "details",
            Self::Tickets => "tickets",
            Self::Media => "media",
            Self::Review => "review",
        }
    }

    /// Human-readable label for the step.
    pub fn label(self) -> &'static str {
        self.definition().display_name
    }

    pub fn definition(self) -> &'static StepDefinition {
        &STEPS[self.index()]
    }

    /// Zero-based position in [`STEPS`].
    pub fn index(self) -> usize {
        usize::from(self.to_number() - 1)
    }

    /// The following step, or `None` on the last step.
    pub fn next(self) -> Option<Self> {
        STEPS.get(self.index() + 1).map(|d| d.id)
    }

    /// The preceding step, or `None` on the first step.
    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| STEPS[i].id)
    }

    pub fn is_first(self) -> bool {
        self == first_step()
    }

    pub fn is_last(self) -> bool {
        self == last_step()
    }
}

// ---------------------------------------------------------------------------
// Step definition table
// ---------------------------------------------------------------------------

/// One screen of the wizard and the fields it owns.
#[derive(Debug)]
pub struct StepDefinition {
    pub id: StepId,
    pub display_name: &'static str,
    pub owned_fields: &'static [Field],
}

impl StepDefinition {
    /// Whether an error `path` belongs to this step.
    pub fn owns(&self, path: &str) -> bool {
        self.owned_fields.iter().any(|f| f.owns_path(path))
    }
}

/// Ordered step table.
pub static STEPS: [StepDefinition; TOTAL_STEPS as usize] = [
    StepDefinition {
        id: StepId::BasicInfo,
        display_name: "Basic Info",
        owned_fields: &[
            Field::Title,
            Field::Category,
            Field::ShortDescription,
            Field::Description,
            Field::Tags,
        ],
    },
    StepDefinition {
        id: StepId::DateTime,
        display_name: "Date & Time",
        owned_fields: &[Field::Date, Field::StartTime, Field::EndTime, Field::Duration],
    },
    StepDefinition {
        id: StepId::Location,
        display_name: "Location",
        owned_fields: &[
            Field::IsVirtual,
            Field::StreamingPlatform,
            Field::MeetingLink,
            Field::RoomName,
            Field::Location,
        ],
    },
    StepDefinition {
        id: StepId::Details,
        display_name: "Audience & Access",
        owned_fields: &[
            Field::Requirements,
            Field::TargetAudience,
            Field::MinAttendees,
            Field::MaxAttendees,
            Field::Visibility,
        ],
    },
    StepDefinition {
        id: StepId::Tickets,
        display_name: "Tickets",
        owned_fields: &[
            Field::IsFreeEvent,
            Field::Price,
            Field::Currency,
            Field::RefundPolicy,
            Field::EarlyBirdPrice,
            Field::EarlyBirdDeadline,
        ],
    },
    StepDefinition {
        id: StepId::Media,
        display_name: "Images & Speakers",
        owned_fields: &[Field::Images, Field::Speakers],
    },
    StepDefinition {
        id: StepId::Review,
        display_name: "Review",
        owned_fields: &[],
    },
];

pub fn first_step() -> StepId {
    STEPS[0].id
}

pub fn last_step() -> StepId {
    STEPS[STEPS.len() - 1].id
}

/// The step owning an error path, if any.
pub fn owner_of(path: &str) -> Option<StepId> {
    STEPS.iter().find(|d| d.owns(path)).map(|d| d.id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
