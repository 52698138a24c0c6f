//! Persistence layer for mail storage.

pub mod db;
pub mod mails;

pub use db::Database;
pub use mails::{MailRecord, MailStore, NewMail, SNIPPET_PLACEHOLDER};
