//! Triage-and-draft pipeline.
//!
//! - `classifier`: zero-shot importance decision
//! - `drafting`: reply generation with brace-scan / parse / fallback repair
//! - `triage`: the service the request layer calls

pub mod classifier;
pub mod drafting;
pub mod triage;

pub use classifier::ImportanceClassifier;
pub use drafting::{DraftOptions, DraftReply, ReplyDrafter};
pub use triage::{IngestOutcome, TriageService};
