//! The operations exposed to the request layer.
//!
//! Flow on ingest: classify → build record → insert. A record is written
//! exactly once with `important` already resolved.

use tracing::info;

use crate::error::{DatabaseError, Error, LlmError};
use crate::llm::ModelGateway;
use crate::pipeline::classifier::ImportanceClassifier;
use crate::pipeline::drafting::{DraftOptions, DraftReply, ReplyDrafter};
use crate::store::{MailRecord, MailStore, NewMail, SNIPPET_PLACEHOLDER};

/// Result of ingesting one mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub id: i64,
    pub important: bool,
    pub snippet: String,
}

/// Classification, drafting and storage behind one handle.
pub struct TriageService {
    classifier: ImportanceClassifier,
    drafter: ReplyDrafter,
    store: MailStore,
}

impl TriageService {
    pub fn new(gateway: ModelGateway, store: MailStore) -> Self {
        Self {
            classifier: ImportanceClassifier::new(gateway.classifier),
            drafter: ReplyDrafter::new(gateway.generator),
            store,
        }
    }

    /// Whether a mail needs attention.
    pub async fn classify_important(&self, subject: &str, body: &str) -> Result<bool, LlmError> {
        self.classifier.classify(subject, body).await
    }

    /// Draft a reply. Malformed model output degrades to a fallback reply.
    pub async fn draft_reply(
        &self,
        sender: &str,
        subject: &str,
        body: &str,
        options: &DraftOptions,
    ) -> Result<DraftReply, LlmError> {
        self.drafter.draft(sender, subject, body, options).await
    }

    /// Persist an already-classified mail.
    pub fn store_mail(&self, mail: &NewMail) -> Result<i64, DatabaseError> {
        self.store.insert(mail)
    }

    /// Every stored mail in insertion order.
    pub fn fetch_all_mail(&self) -> Result<Vec<MailRecord>, DatabaseError> {
        self.store.list_all()
    }

    /// Classify and store an incoming mail.
    pub async fn ingest(
        &self,
        sender: &str,
        subject: &str,
        body: &str,
    ) -> Result<IngestOutcome, Error> {
        let important = self.classify_important(subject, body).await?;

        let mail = NewMail {
            sender: sender.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            snippet: Some(SNIPPET_PLACEHOLDER.to_string()),
            important,
        };
        let id = self.store_mail(&mail)?;

        info!(id, sender = sender, important, "Mail ingested");
        Ok(IngestOutcome {
            id,
            important,
            snippet: SNIPPET_PLACEHOLDER.to_string(),
        })
    }
}
