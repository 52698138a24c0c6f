//! Model gateway contracts.
//!
//! Two independent capabilities are modelled as separate traits so a
//! deployment can back them with different services:
//! - [`LlmProvider`]: chat-style text generation
//! - [`ZeroShotClassifier`]: ranking a text against a candidate label set

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A text generation request.
///
/// Providers return only the newly generated continuation, never the
/// echoed prompt.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            top_p: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    Unknown,
}

impl FinishReason {
    pub fn from_api(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") | Some("eos_token") | Some("stop_sequence") => Self::Stop,
            Some("length") => Self::Length,
            _ => Self::Unknown,
        }
    }
}

/// A text generation response.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: FinishReason,
}

/// Text generation capability.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// A zero-shot classification request.
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub text: String,
    /// Ordered candidate labels.
    pub candidate_labels: Vec<String>,
    /// NLI hypothesis with a `{}` placeholder for the label.
    pub hypothesis_template: String,
    /// Score labels independently instead of as a single distribution.
    pub multi_label: bool,
}

/// One ranked label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Zero-shot classification capability.
///
/// Implementations return labels ranked by descending score.
#[async_trait]
pub trait ZeroShotClassifier: Send + Sync {
    fn model_name(&self) -> &str;

    async fn classify(&self, request: ClassificationRequest) -> Result<Vec<LabelScore>, LlmError>;
}
