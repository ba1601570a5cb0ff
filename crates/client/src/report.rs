//! Per-step validation report of a saved draft.

use std::fmt;

use evently_core::draft::EventDraft;
use evently_core::errors::{ErrorMap, TouchedFields};
use evently_core::orchestrator::validate_step;
use evently_core::steps::{StepId, STEPS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: StepId,
    pub label: &'static str,
    pub number: u8,
    /// `(path, message)` pairs, sorted by path.
    pub errors: Vec<(String, String)>,
}

impl StepReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.is_valid() { "ok" } else { "!!" };
        write!(f, "[{mark}] {}. {}", self.number, self.label)?;
        for (path, message) in &self.errors {
            write!(f, "\n       {path}: {message}")?;
        }
        Ok(())
    }
}

/// Validate every step of `draft` independently.
pub fn step_report(draft: &EventDraft) -> Vec<StepReport> {
    STEPS
        .iter()
        .map(|def| {
            let mut errors = ErrorMap::new();
            let mut touched = TouchedFields::new();
            validate_step(def.id, draft, &mut errors, &mut touched);
            StepReport {
                step: def.id,
                label: def.display_name,
                number: def.id.to_number(),
                errors: errors
                    .iter()
                    .map(|(path, message)| (path.to_string(), message.to_string()))
                    .collect(),
            }
        })
        .collect()
}

/// Whether every step passed.
pub fn is_ready(reports: &[StepReport]) -> bool {
    reports.iter().all(StepReport::is_valid)
}
