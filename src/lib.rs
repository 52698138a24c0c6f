//! Mail triage: importance classification, reply drafting and storage.

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod store;
