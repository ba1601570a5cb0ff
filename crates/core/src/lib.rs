//! Client-side engine of the multi-step event submission wizard.
//!
//! The crate is transport-agnostic: remote collaborators (event creation,
//! asset upload, subscription limits, draft storage) are traits in
//! [`services`] and [`persistence`], implemented over HTTP and the file
//! system by `evently-client`.

pub mod config;
pub mod debounce;
pub mod draft;
pub mod error;
pub mod errors;
pub mod meeting;
pub mod orchestrator;
pub mod persistence;
pub mod retry;
pub mod schema;
pub mod services;
pub mod steps;
pub mod submission;
pub mod types;
pub mod wizard;

pub use error::WizardError;
pub use wizard::{WizardController, WizardServices};
