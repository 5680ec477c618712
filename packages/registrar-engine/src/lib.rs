//! Match monitoring and registration decision engine.
//!
//! Discovers candidate events from fetched markup, classifies each into a
//! registration status via an ordered rule table, and applies the run-level
//! action policy with an at-most-one-registration-per-run guarantee.
//! Network access and notifications enter through the traits in [`traits`];
//! this crate performs no I/O of its own.

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod traits;
pub mod types;

// Re-exports for clean API
pub use config::{required_env, RegistrantIdentity, RunConfig};
pub use engine::{discover_records, run_once, survey_statuses};
pub use error::{ConfigError, FetchError, RegisterError};
pub use traits::{Notifier, PageFetcher, Registrar};
pub use types::{
    ActionOutcome, EventRecord, NotifyKind, RecordAction, RegistrationStatus, RunId,
    RunReport, RunSummary,
};
