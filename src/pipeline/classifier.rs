//! Importance classifier. Zero-shot label ranking mapped to a boolean.
//!
//! The mail is scored against a fixed label set with an attention-framed
//! hypothesis, and only the top-ranked label decides importance.

use std::sync::Arc;

use tracing::debug;

use crate::error::LlmError;
use crate::llm::provider::{ClassificationRequest, ZeroShotClassifier};

/// Candidate labels, in the order they are submitted.
pub const CANDIDATE_LABELS: [&str; 11] = [
    "urgent",
    "not urgent",
    "congratulations message",
    "meeting request",
    "newsletter",
    "technical support request",
    "case update",
    "system-related",
    "spam",
    "thank you message",
    "social media notification",
];

/// Top labels that mark a mail as important.
pub const IMPORTANT_LABELS: [&str; 6] = [
    "urgent",
    "meeting request",
    "newsletter",
    "technical support request",
    "case update",
    "system-related",
];

/// Frames each label as a requires-attention claim.
pub const HYPOTHESIS_TEMPLATE: &str = "This email is {} and requires immediate attention.";

/// Decides whether a mail needs attention.
pub struct ImportanceClassifier {
    model: Arc<dyn ZeroShotClassifier>,
}

impl ImportanceClassifier {
    pub fn new(model: Arc<dyn ZeroShotClassifier>) -> Self {
        Self { model }
    }

    /// Classify a mail. Subject and body are expected to be non-empty.
    pub async fn classify(&self, subject: &str, body: &str) -> Result<bool, LlmError> {
        let request = ClassificationRequest {
            text: classification_text(subject, body),
            candidate_labels: CANDIDATE_LABELS.iter().map(|l| l.to_string()).collect(),
            hypothesis_template: HYPOTHESIS_TEMPLATE.to_string(),
            multi_label: false,
        };

        let ranked = self.model.classify(request).await?;
        let top = ranked.first().ok_or_else(|| LlmError::InvalidResponse {
            provider: self.model.model_name().to_string(),
            reason: "classifier returned no labels".to_string(),
        })?;

        let important = is_important_label(&top.label);
        debug!(
            label = %top.label,
            score = top.score,
            important,
            "Mail classified"
        );
        Ok(important)
    }
}

/// Text submitted to the classifier.
pub fn classification_text(subject: &str, body: &str) -> String {
    format!("Subject: {subject}. {body}")
}

/// Whether a top-ranked label marks the mail as important.
pub fn is_important_label(label: &str) -> bool {
    IMPORTANT_LABELS.contains(&label)
}
