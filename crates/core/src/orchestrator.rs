//! Step validation.
//!
//! Combines whole-record schema issues with step-scoped conditional rules and
//! decides whether the wizard may leave a step. Only errors owned by the step
//! being validated are written to the error map, and only those block.

use crate::draft::EventDraft;
use crate::errors::{ErrorMap, TouchedFields};
use crate::schema::{self, is_absolute_url, MIN_PRICE, MIN_ROOM_NAME_LEN};
use crate::steps::{StepDefinition, StepId};

/// Validate `step` against `draft`.
///
/// Returns `true` when the step has no errors of its own. As a side effect
/// the step-owned keys of `errors` are replaced with the fresh result (stale
/// step-owned keys are removed, other steps' keys are left alone) and every
/// failing path is marked touched so its message becomes visible.
pub fn validate_step(
    step: StepId,
    draft: &EventDraft,
    errors: &mut ErrorMap,
    touched: &mut TouchedFields,
) -> bool {
    let definition = step.definition();
    if definition.owned_fields.is_empty() {
        return true;
    }

    let mut fresh = ErrorMap::new();
    for issue in schema::check_record(draft) {
        if definition.owns(&issue.path) {
            fresh.insert_if_absent(&issue.path, &issue.message);
        }
    }

    apply_step_rules(step, draft, &mut fresh);

    for (path, _) in fresh.iter() {
        touched.touch(path);
    }
    let valid = fresh.is_empty();
    errors.merge_owned(|path| definition.owns(path), fresh);

    if !valid {
        tracing::debug!(
            step = step.as_str(),
            errors = errors_for(definition, errors),
            "Step validation failed",
        );
    }
    valid
}

/// Number of errors currently recorded for `definition`.
fn errors_for(definition: &StepDefinition, errors: &ErrorMap) -> usize {
    errors.iter().filter(|(path, _)| definition.owns(path)).count()
}

/// Whether the error map holds any error owned by `step`.
pub fn step_has_errors(step: StepId, errors: &ErrorMap) -> bool {
    let definition = step.definition();
    errors.any(|path| definition.owns(path))
}

/// Conditional rules that depend on which branch of the record is active.
fn apply_step_rules(step: StepId, draft: &EventDraft, fresh: &mut ErrorMap) {
    match step {
        StepId::Location if draft.is_virtual => {
            if draft.streaming_platform.uses_generated_room() {
                if draft.room_name.trim().chars().count() < MIN_ROOM_NAME_LEN {
                    fresh.insert_if_absent(
                        "room_name",
                        "A meeting room must be generated for this event",
                    );
                }
            } else if !is_absolute_url(&draft.meeting_link) {
                fresh.insert_if_absent(
                    "meeting_link",
                    "Meeting link must be a full URL, e.g. https://example.com/room",
                );
            }
        }
        StepId::Tickets if draft.is_free_event => {
            fresh.remove("price");
        }
        StepId::Tickets => match draft.price {
            Some(price) if price.is_finite() && price >= MIN_PRICE => {}
            Some(_) => fresh.insert_if_absent("price", "Price must be at least 0.01"),
            None => fresh.insert_if_absent("price", "Ticket price is required for paid events"),
        },
        _ => {}
    }
}
