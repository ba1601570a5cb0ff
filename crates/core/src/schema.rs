//! Whole-record schema for [`EventDraft`].
//!
//! The schema has two parts:
//!
//! - [`FIELD_RULES`]: a declarative table of single-field rules evaluated
//!   against the JSON projection of the draft. Paths may contain a `*`
//!   segment that expands over array elements (`speakers.*.name`).
//! - cross-field rules that compare several attributes (end after start,
//!   address-or-city, room-or-link, paid pricing, early-bird ordering).
//!
//! Rules attached to an inactive shape (virtual vs. physical, free vs. paid)
//! are skipped entirely.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use validator::ValidateUrl;

use crate::draft::{EventDraft, Visibility};
use crate::errors::{path_touches, ErrorMap};
use crate::steps;

/// Smallest accepted ticket price.
pub const MIN_PRICE: f64 = 0.01;

/// Minimum length of a generated conferencing room name.
pub const MIN_ROOM_NAME_LEN: usize = 3;

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// A single rule violation, keyed by the full path of the offending value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub path: String,
    pub message: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Declarative field rules
// ---------------------------------------------------------------------------

/// The check applied to a single value.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Present, non-null, not a blank string, not an empty array.
    Required,
    /// Non-empty strings must have at least this many characters.
    MinLength(usize),
    MaxLength(usize),
    MinValue(f64),
    MaxValue(f64),
    MaxItems(usize),
    /// Non-empty strings must match the pattern.
    Pattern(&'static LazyLock<Regex>),
}

/// When a rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    Virtual,
    Physical,
    Paid,
}

impl Condition {
    fn holds(self, draft: &EventDraft) -> bool {
        match self {
            Self::Always => true,
            Self::Virtual => draft.is_virtual,
            Self::Physical => !draft.is_virtual,
            Self::Paid => !draft.is_free_event,
        }
    }
}

/// One row of the schema table.
#[derive(Debug)]
pub struct FieldRule {
    pub path: &'static str,
    pub rule: Rule,
    pub when: Condition,
    pub message: &'static str,
}

const fn rule(path: &'static str, rule: Rule, message: &'static str) -> FieldRule {
    FieldRule {
        path,
        rule,
        when: Condition::Always,
        message,
    }
}

const fn rule_when(
    path: &'static str,
    rule: Rule,
    when: Condition,
    message: &'static str,
) -> FieldRule {
    FieldRule {
        path,
        rule,
        when,
        message,
    }
}

static POSTAL_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 \-]{1,9}$").expect("valid regex")
});

static CURRENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{3}$").expect("valid regex"));

/// Single-field rules, in wizard step order.
pub static FIELD_RULES: &[FieldRule] = &[
    // Basic info
    rule("title", Rule::Required, "Event title is required"),
    rule("title", Rule::MinLength(3), "Title must be at least 3 characters"),
    rule("title", Rule::MaxLength(100), "Title must be at most 100 characters"),
    rule("category", Rule::Required, "Please choose a category"),
    rule("short_description", Rule::Required, "A short description is required"),
    rule(
        "short_description",
        Rule::MaxLength(160),
        "Short description must be at most 160 characters",
    ),
    rule("description", Rule::Required, "Please describe your event"),
    rule(
        "description",
        Rule::MinLength(20),
        "Description must be at least 20 characters",
    ),
    rule(
        "description",
        Rule::MaxLength(5000),
        "Description must be at most 5000 characters",
    ),
    rule("tags", Rule::MaxItems(10), "You can add up to 10 tags"),
    rule("tags.*", Rule::MaxLength(30), "Tags must be at most 30 characters"),
    // Date & time
    rule("date", Rule::Required, "Event date is required"),
    rule("start_time", Rule::Required, "Start time is required"),
    rule("end_time", Rule::Required, "End time is required"),
    rule("duration", Rule::MinValue(1.0), "Duration must be at least 1 minute"),
    rule("duration", Rule::MaxValue(10_080.0), "Duration cannot exceed 7 days"),
    // Location
    rule_when(
        "meeting_link",
        Rule::MaxLength(2048),
        Condition::Virtual,
        "Meeting link is too long",
    ),
    rule_when(
        "location.address",
        Rule::MaxLength(200),
        Condition::Physical,
        "Address must be at most 200 characters",
    ),
    rule_when(
        "location.city",
        Rule::MaxLength(100),
        Condition::Physical,
        "City must be at most 100 characters",
    ),
    rule_when(
        "location.country",
        Rule::MaxLength(100),
        Condition::Physical,
        "Country must be at most 100 characters",
    ),
    rule_when(
        "location.postal_code",
        Rule::Pattern(&POSTAL_CODE_RE),
        Condition::Physical,
        "Enter a valid postal code",
    ),
    // Audience & access
    rule("requirements", Rule::MaxItems(20), "You can list up to 20 requirements"),
    rule(
        "requirements.*",
        Rule::MaxLength(200),
        "Requirements must be at most 200 characters",
    ),
    rule("target_audience", Rule::MaxItems(10), "You can list up to 10 audiences"),
    rule(
        "min_attendees",
        Rule::MinValue(1.0),
        "Minimum attendees must be at least 1",
    ),
    rule(
        "max_attendees",
        Rule::MinValue(1.0),
        "Maximum attendees must be at least 1",
    ),
    rule(
        "max_attendees",
        Rule::MaxValue(100_000.0),
        "Maximum attendees cannot exceed 100000",
    ),
    // Tickets
    rule_when(
        "price",
        Rule::Required,
        Condition::Paid,
        "Ticket price is required for paid events",
    ),
    rule_when("currency", Rule::Required, Condition::Paid, "Please choose a currency"),
    rule_when(
        "currency",
        Rule::Pattern(&CURRENCY_RE),
        Condition::Paid,
        "Currency must be a 3-letter code",
    ),
    rule_when(
        "refund_policy",
        Rule::MaxLength(1000),
        Condition::Paid,
        "Refund policy must be at most 1000 characters",
    ),
    // Images & speakers
    rule("images", Rule::Required, "Add at least one event image"),
    rule("images", Rule::MaxItems(10), "You can add up to 10 images"),
    rule("speakers", Rule::MaxItems(20), "You can add up to 20 speakers"),
    rule("speakers.*.name", Rule::Required, "Speaker name is required"),
    rule(
        "speakers.*.name",
        Rule::MinLength(2),
        "Speaker name must be at least 2 characters",
    ),
    rule("speakers.*.role", Rule::Required, "Speaker role is required"),
    rule(
        "speakers.*.bio",
        Rule::MaxLength(1000),
        "Speaker bio must be at most 1000 characters",
    ),
];

/// Resolve a rule path against a JSON value, expanding `*` over arrays.
///
/// Returns `(concrete path, value)` pairs; the value is `None` when the path
/// does not exist.
fn resolve<'a>(root: &'a Value, path: &str) -> Vec<(String, Option<&'a Value>)> {
    let mut out = Vec::new();
    let segments: Vec<&str> = path.split('.').collect();
    resolve_into(Some(root), &segments, String::new(), &mut out);
    out
}

fn resolve_into<'a>(
    current: Option<&'a Value>,
    segments: &[&str],
    prefix: String,
    out: &mut Vec<(String, Option<&'a Value>)>,
) {
    let Some((head, rest)) = segments.split_first() else {
        out.push((prefix, current));
        return;
    };
    let join = |seg: &str| {
        if prefix.is_empty() {
            seg.to_string()
        } else {
            format!("{prefix}.{seg}")
        }
    };
    if *head == "*" {
        if let Some(Value::Array(items)) = current {
            for (i, item) in items.iter().enumerate() {
                resolve_into(Some(item), rest, join(&i.to_string()), out);
            }
        }
        return;
    }
    let next = current.and_then(|v| v.get(*head));
    resolve_into(next, rest, join(head), out);
}

fn check(rule: Rule, value: Option<&Value>) -> bool {
    match rule {
        Rule::Required => match value {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            _ => true,
        },
        Rule::MinLength(min) => match value.and_then(Value::as_str) {
            Some(s) if !s.trim().is_empty() => s.trim().chars().count() >= min,
            _ => true,
        },
        Rule::MaxLength(max) => value
            .and_then(Value::as_str)
            .map_or(true, |s| s.trim().chars().count() <= max),
        Rule::MinValue(min) => value.and_then(Value::as_f64).map_or(true, |n| n >= min),
        Rule::MaxValue(max) => value.and_then(Value::as_f64).map_or(true, |n| n <= max),
        Rule::MaxItems(max) => value
            .and_then(Value::as_array)
            .map_or(true, |a| a.len() <= max),
        Rule::Pattern(re) => value
            .and_then(Value::as_str)
            .map(str::trim)
            .map_or(true, |s| s.is_empty() || re.is_match(s)),
    }
}

fn check_field_rules(draft: &EventDraft, json: &Value, issues: &mut Vec<Issue>) {
    for field_rule in FIELD_RULES {
        if !field_rule.when.holds(draft) {
            continue;
        }
        for (path, value) in resolve(json, field_rule.path) {
            if !check(field_rule.rule, value) {
                issues.push(Issue::new(path, field_rule.message));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Cross-field rules
// ---------------------------------------------------------------------------

/// Whether `value` parses as an absolute URL.
pub fn is_absolute_url(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value.to_string().validate_url()
}

fn check_cross_field_rules(draft: &EventDraft, issues: &mut Vec<Issue>) {
    // Schedule
    if let (Some(start), Some(end)) = (draft.start_time, draft.end_time) {
        if end <= start {
            issues.push(Issue::new("end_time", "End time must be after start time"));
        }
    }

    // Location: exactly one shape is active.
    if draft.is_virtual {
        if draft.streaming_platform.uses_generated_room() {
            let len = draft.room_name.trim().chars().count();
            if len == 0 {
                issues.push(Issue::new(
                    "room_name",
                    "A meeting room must be generated for this event",
                ));
            } else if len < MIN_ROOM_NAME_LEN {
                issues.push(Issue::new(
                    "room_name",
                    "Room name must be at least 3 characters",
                ));
            }
        } else if draft.meeting_link.trim().is_empty() {
            issues.push(Issue::new(
                "meeting_link",
                "Meeting link is required for virtual events",
            ));
        } else if !is_absolute_url(&draft.meeting_link) {
            issues.push(Issue::new(
                "meeting_link",
                "Meeting link must be a full URL, e.g. https://example.com/room",
            ));
        }
    } else if !draft.location.has_address_or_city() {
        issues.push(Issue::new(
            "location",
            "Enter an address or city for in-person events",
        ));
    }

    // Audience
    if let (Some(min), Some(max)) = (draft.min_attendees, draft.max_attendees) {
        if max < min {
            issues.push(Issue::new(
                "max_attendees",
                "Maximum attendees must not be lower than minimum attendees",
            ));
        }
    }
    if let Visibility::Private { allow_list } = &draft.visibility {
        if allow_list.is_empty() {
            issues.push(Issue::new(
                "visibility.allow_list",
                "Add at least one person who can see this private event",
            ));
        }
    }

    // Tickets: exactly one shape is active.
    if !draft.is_free_event {
        if let Some(price) = draft.price {
            if !price.is_finite() || price < MIN_PRICE {
                issues.push(Issue::new("price", "Price must be at least 0.01"));
            }
        }
        if let Some(early) = draft.early_bird_price {
            if !early.is_finite() || early < MIN_PRICE {
                issues.push(Issue::new(
                    "early_bird_price",
                    "Early-bird price must be at least 0.01",
                ));
            } else if draft.price.is_some_and(|p| early >= p) {
                issues.push(Issue::new(
                    "early_bird_price",
                    "Early-bird price must be lower than the regular price",
                ));
            }
        }
        if let (Some(deadline), Some(date)) = (draft.early_bird_deadline, draft.date) {
            if deadline >= date {
                issues.push(Issue::new(
                    "early_bird_deadline",
                    "Early-bird deadline must be before the event date",
                ));
            }
        }
    }

    // Media
    for (i, image) in draft.images.iter().enumerate() {
        if !image.has_source() {
            issues.push(Issue::new(
                format!("images.{i}.url"),
                "Select the image file again",
            ));
        }
    }
    for (i, speaker) in draft.speakers.iter().enumerate() {
        if let Some(photo) = &speaker.photo {
            if !photo.has_source() {
                issues.push(Issue::new(
                    format!("speakers.{i}.photo"),
                    "Select the speaker photo again",
                ));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run every rule and return the ordered issue list.
///
/// Issues are ordered by the wizard step owning their path, then by rule
/// order, so the first issue is the earliest thing the user has to fix.
pub fn check_record(draft: &EventDraft) -> Vec<Issue> {
    let json = match serde_json::to_value(draft) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Failed to project event draft to JSON");
            Value::Null
        }
    };

    let mut issues = Vec::new();
    check_field_rules(draft, &json, &mut issues);
    check_cross_field_rules(draft, &mut issues);

    // Stable: preserves rule order within a step.
    issues.sort_by_key(|issue| steps::owner_of(&issue.path).map_or(usize::MAX, |s| s.index()));
    issues
}

/// Every issue of the record, keyed by full path.
pub fn validate_record(draft: &EventDraft) -> ErrorMap {
    ErrorMap::from_issues(&check_record(draft))
}

/// Issues whose path overlaps `field`.
pub fn issues_touching(field: &str, draft: &EventDraft) -> Vec<Issue> {
    check_record(draft)
        .into_iter()
        .filter(|issue| path_touches(&issue.path, field))
        .collect()
}

/// The first message concerning `field`, or `None`.
///
/// `None` means either the record is valid or it is invalid only for
/// reasons unrelated to `field`.
pub fn validate_field(field: &str, draft: &EventDraft) -> Option<String> {
    check_record(draft)
        .into_iter()
        .find(|issue| path_touches(&issue.path, field))
        .map(|issue| issue.message)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
