//! Reply drafting: asks the text generator for a `{subject, body}` reply
//! and repairs whatever comes back.
//!
//! Models do not reliably honour "JSON only", so the output goes through:
//! 1. Brace scan: first `{` through last `}` (drops prose and code fences)
//! 2. JSON parse: anything that is not an object of strings falls back
//! 3. Field defaults: missing or blank fields get a per-field default
//!
//! Malformed output never becomes an error. Only gateway failures propagate.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

/// Nucleus sampling cutoff for drafting.
pub const DRAFT_TOP_P: f32 = 0.9;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default output-length cap.
pub const DEFAULT_MAX_TOKENS: u32 = 400;

/// Body used when the model output cannot be used at all.
pub const FALLBACK_BODY: &str =
    "Hello,\n\nThank you for your message. Could you please share more details?\n\nBest regards,\n";

/// Body used when the model produced valid JSON without a usable body.
pub const DEFAULT_BODY: &str = "Hello,\n\nThank you for your message.\n\nBest regards,";

/// Outermost-brace span, greedy across newlines.
static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex is valid"));

/// A drafted reply. Both fields are always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftReply {
    pub subject: String,
    pub body: String,
}

/// Tuning for a single draft.
#[derive(Debug, Clone)]
pub struct DraftOptions {
    /// Grounding material injected into the system instruction. May be empty.
    pub user_context: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for DraftOptions {
    fn default() -> Self {
        Self {
            user_context: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Drafts replies with a text generation model.
pub struct ReplyDrafter {
    llm: Arc<dyn LlmProvider>,
}

impl ReplyDrafter {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Draft a reply to an incoming mail.
    ///
    /// Fails only when the generator itself fails.
    pub async fn draft(
        &self,
        sender: &str,
        subject: &str,
        body: &str,
        options: &DraftOptions,
    ) -> Result<DraftReply, LlmError> {
        info!(sender = sender, model = self.llm.model_name(), "Drafting reply");

        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_system_prompt(&options.user_context)),
            ChatMessage::user(build_user_prompt(sender, subject, body)),
        ])
        .with_temperature(options.temperature)
        .with_top_p(DRAFT_TOP_P)
        .with_max_tokens(options.max_tokens);

        let response = self.llm.complete(request).await?;
        Ok(parse_reply(&response.content, subject))
    }
}

// ── Prompt construction ─────────────────────────────────────────────

/// Build the drafting system instruction.
pub fn build_system_prompt(user_context: &str) -> String {
    format!(
        "You are a professional email assistant. Write replies that are clear, polite, \
         concise and helpful. If the incoming email is written in English, reply in English; \
         if it is written in Portuguese, reply in Portuguese.\n\n\
         Respond EXCLUSIVELY with a JSON object in exactly this format:\n\
         {{\n  \"subject\": \"<reply subject>\",\n  \"body\": \"<reply body>\"\n}}\n\
         Do not write anything outside the JSON object.\n\
         If the email does not give you enough information, ask specific questions in the reply.\n\n\
         Use the following context to craft your reply: {user_context}"
    )
}

/// Build the user turn for an incoming mail.
pub fn build_user_prompt(sender: &str, subject: &str, body: &str) -> String {
    format!(
        "Sender: {sender}\n\
         Subject: {subject}\n\
         Body:\n{body}\n\n\
         Task: Draft an appropriate reply to the email above, keeping the language of the original message."
    )
}

// ── Response parsing ────────────────────────────────────────────────

/// Reply returned when nothing usable came back.
pub fn fallback_reply(original_subject: &str) -> DraftReply {
    DraftReply {
        subject: default_subject(original_subject),
        body: FALLBACK_BODY.to_string(),
    }
}

fn default_subject(original_subject: &str) -> String {
    format!("Re: {original_subject}").trim().to_string()
}

/// First `{` through last `}` of the model output, if any.
pub fn extract_json_object(text: &str) -> Option<&str> {
    JSON_OBJECT.find(text).map(|m| m.as_str())
}

/// Turn raw model output into a reply. Never fails.
pub fn parse_reply(raw: &str, original_subject: &str) -> DraftReply {
    let Some(json_str) = extract_json_object(raw) else {
        warn!(response = raw, "No JSON object in draft output, using fallback reply");
        return fallback_reply(original_subject);
    };

    match fields_from_json(json_str) {
        Ok((subject, body)) => DraftReply {
            subject: subject.unwrap_or_else(|| default_subject(original_subject)),
            body: body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
        },
        Err(reason) => {
            warn!(
                response = raw,
                error = %reason,
                "Unusable JSON in draft output, using fallback reply"
            );
            fallback_reply(original_subject)
        }
    }
}

/// Read `subject` and `body` from a JSON object.
///
/// `Ok(None)` for a field means absent, null or blank. Any other non-string
/// value is an error.
fn fields_from_json(json_str: &str) -> Result<(Option<String>, Option<String>), String> {
    let value: Value =
        serde_json::from_str(json_str).map_err(|e| format!("JSON parse error: {e}"))?;
    let Value::Object(map) = value else {
        return Err("not a JSON object".into());
    };

    let field = |name: &str| -> Result<Option<String>, String> {
        match map.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Some(other) => Err(format!("field '{name}' is not a string: {other}")),
        }
    };

    Ok((field("subject")?, field("body")?))
}
