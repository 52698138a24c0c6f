//! Hugging Face inference gateway.
//!
//! Backs both model capabilities with plain HTTP calls:
//! - text generation via the OpenAI-compatible `/v1/chat/completions` route
//! - zero-shot classification via `/hf-inference/models/{model}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::error::LlmError;
use crate::llm::provider::{
    ClassificationRequest, CompletionRequest, CompletionResponse, FinishReason, LabelScore,
    LlmProvider, ZeroShotClassifier,
};

const PROVIDER: &str = "huggingface";

/// Max characters of an error body kept in error messages.
const ERROR_BODY_PREVIEW: usize = 300;

/// HTTP client for one inference endpoint.
///
/// Built once at startup and shared behind `Arc`.
pub struct HuggingFaceGateway {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<SecretString>,
    generation_model: String,
    classifier_model: String,
}

impl HuggingFaceGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            generation_model: config.generation_model.clone(),
            classifier_model: config.classifier_model.clone(),
        })
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, LlmError> {
        let mut request = self.http.post(url).json(body);
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after, &text));
        }

        let bytes = response.bytes().await.map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })?;

        serde_json::from_slice(&bytes).map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: format!("undecodable body: {e}"),
        })
    }
}

fn status_error(status: StatusCode, retry_after: Option<Duration>, body: &str) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthFailed {
            provider: PROVIDER.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
            provider: PROVIDER.to_string(),
            retry_after,
        },
        _ => {
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {status}: {preview}"),
            }
        }
    }
}

// ── Text generation ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[async_trait]
impl LlmProvider for HuggingFaceGateway {
    fn model_name(&self) -> &str {
        &self.generation_model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut body = serde_json::json!({
            "model": self.generation_model,
            "messages": request.messages,
            "stream": false,
        });
        if let Some(t) = request.temperature {
            body["temperature"] = t.into();
        }
        if let Some(p) = request.top_p {
            body["top_p"] = p.into();
        }
        if let Some(m) = request.max_tokens {
            body["max_tokens"] = m.into();
        }

        let url = format!("{}/v1/chat/completions", self.base_url);
        let parsed: ChatCompletionResponse = self.post_json(&url, &body).await?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "no choices in completion response".to_string(),
            })?;
        let usage = parsed.usage.unwrap_or(ChatUsage {
            prompt_tokens: 0,
            completion_tokens: 0,
        });

        debug!(
            model = %self.generation_model,
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            "Completion received"
        );

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            finish_reason: FinishReason::from_api(choice.finish_reason.as_deref()),
        })
    }
}

// ── Zero-shot classification ────────────────────────────────────────

/// The endpoint answers in one of two shapes depending on deployment.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Ranked(Vec<LabelScore>),
    Columns {
        labels: Vec<String>,
        scores: Vec<f64>,
    },
}

impl ZeroShotResponse {
    fn into_ranked(self) -> Result<Vec<LabelScore>, LlmError> {
        let mut ranked = match self {
            Self::Ranked(list) => list,
            Self::Columns { labels, scores } => {
                if labels.len() != scores.len() {
                    return Err(LlmError::InvalidResponse {
                        provider: PROVIDER.to_string(),
                        reason: format!(
                            "{} labels but {} scores",
                            labels.len(),
                            scores.len()
                        ),
                    });
                }
                labels
                    .into_iter()
                    .zip(scores)
                    .map(|(label, score)| LabelScore { label, score })
                    .collect()
            }
        };
        // Stable: equal scores keep the order the service sent them in.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(ranked)
    }
}

#[async_trait]
impl ZeroShotClassifier for HuggingFaceGateway {
    fn model_name(&self) -> &str {
        &self.classifier_model
    }

    async fn classify(&self, request: ClassificationRequest) -> Result<Vec<LabelScore>, LlmError> {
        let body = serde_json::json!({
            "inputs": request.text,
            "parameters": {
                "candidate_labels": request.candidate_labels,
                "hypothesis_template": request.hypothesis_template,
                "multi_label": request.multi_label,
            },
        });

        let url = format!("{}/hf-inference/models/{}", self.base_url, self.classifier_model);
        let parsed: ZeroShotResponse = self.post_json(&url, &body).await?;
        parsed.into_ranked()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::StatusCode as AxumStatus;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;
    use tokio::net::TcpListener;

    use super::*;
    use crate::llm::provider::ChatMessage;

    #[derive(Clone)]
    struct Stub {
        status: AxumStatus,
        reply: Value,
        seen: Arc<Mutex<Vec<(String, Value)>>>,
    }

    async fn chat(State(stub): State<Stub>, Json(body): Json<Value>) -> impl IntoResponse {
        stub.seen.lock().unwrap().push(("chat".into(), body));
        (stub.status, Json(stub.reply.clone()))
    }

    async fn zero_shot(State(stub): State<Stub>, Json(body): Json<Value>) -> impl IntoResponse {
        stub.seen.lock().unwrap().push(("zero_shot".into(), body));
        (stub.status, Json(stub.reply.clone()))
    }

    /// Start a stub inference server, return a gateway pointed at it.
    async fn start_stub(
        status: AxumStatus,
        reply: Value,
    ) -> (HuggingFaceGateway, Arc<Mutex<Vec<(String, Value)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let stub = Stub {
            status,
            reply,
            seen: Arc::clone(&seen),
        };
        let app = Router::new()
            .route("/v1/chat/completions", post(chat))
            .route("/hf-inference/models/{*model}", post(zero_shot))
            .with_state(stub);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = GatewayConfig {
            base_url: format!("http://127.0.0.1:{port}"),
            api_token: Some(SecretString::from("hf_test")),
            ..GatewayConfig::default()
        };
        (HuggingFaceGateway::new(&config).unwrap(), seen)
    }

    #[tokio::test]
    async fn complete_returns_first_choice() {
        let (gateway, seen) = start_stub(
            AxumStatus::OK,
            serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"subject\":\"Hi\"}"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 5}
            }),
        )
        .await;

        let request = CompletionRequest::new(vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hello"),
        ])
        .with_temperature(0.7)
        .with_top_p(0.9)
        .with_max_tokens(400);

        let response = gateway.complete(request).await.unwrap();
        assert_eq!(response.content, "{\"subject\":\"Hi\"}");
        assert_eq!(response.input_tokens, 12);
        assert_eq!(response.output_tokens, 5);
        assert_eq!(response.finish_reason, FinishReason::Stop);

        let seen = seen.lock().unwrap();
        let (route, body) = &seen[0];
        assert_eq!(route, "chat");
        assert_eq!(body["model"], crate::config::DEFAULT_GENERATION_MODEL);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["max_tokens"], 400);
        assert_eq!(body["stream"], false);
        assert!((body["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn complete_without_choices_is_invalid() {
        let (gateway, _) = start_stub(AxumStatus::OK, serde_json::json!({"choices": []})).await;
        let err = gateway
            .complete(CompletionRequest::new(vec![ChatMessage::user("x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn classify_accepts_ranked_list() {
        let (gateway, seen) = start_stub(
            AxumStatus::OK,
            serde_json::json!([
                {"label": "spam", "score": 0.1},
                {"label": "meeting request", "score": 0.8},
            ]),
        )
        .await;

        let ranked = gateway
            .classify(ClassificationRequest {
                text: "Subject: Sync. Can we meet?".into(),
                candidate_labels: vec!["spam".into(), "meeting request".into()],
                hypothesis_template: "This email is {}.".into(),
                multi_label: false,
            })
            .await
            .unwrap();
        assert_eq!(ranked[0].label, "meeting request");
        assert_eq!(ranked[1].label, "spam");

        let seen = seen.lock().unwrap();
        let (route, body) = &seen[0];
        assert_eq!(route, "zero_shot");
        assert_eq!(body["inputs"], "Subject: Sync. Can we meet?");
        assert_eq!(body["parameters"]["candidate_labels"][1], "meeting request");
        assert_eq!(body["parameters"]["multi_label"], false);
    }

    #[tokio::test]
    async fn classify_accepts_column_shape() {
        let (gateway, _) = start_stub(
            AxumStatus::OK,
            serde_json::json!({
                "sequence": "x",
                "labels": ["urgent", "spam"],
                "scores": [0.7, 0.3]
            }),
        )
        .await;

        let ranked = gateway
            .classify(ClassificationRequest {
                text: "x".into(),
                candidate_labels: vec!["spam".into(), "urgent".into()],
                hypothesis_template: "{}".into(),
                multi_label: false,
            })
            .await
            .unwrap();
        assert_eq!(ranked[0].label, "urgent");
        assert!((ranked[0].score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn ties_keep_service_order() {
        let response = ZeroShotResponse::Ranked(vec![
            LabelScore { label: "b".into(), score: 0.5 },
            LabelScore { label: "a".into(), score: 0.5 },
        ]);
        let ranked = response.into_ranked().unwrap();
        assert_eq!(ranked[0].label, "b");
    }

    #[test]
    fn mismatched_columns_are_invalid() {
        let response = ZeroShotResponse::Columns {
            labels: vec!["a".into()],
            scores: vec![],
        };
        assert!(matches!(
            response.into_ranked(),
            Err(LlmError::InvalidResponse { .. })
        ));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_failed() {
        let (gateway, _) =
            start_stub(AxumStatus::UNAUTHORIZED, serde_json::json!({"error": "bad token"})).await;
        let err = gateway
            .complete(CompletionRequest::new(vec![ChatMessage::user("x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::AuthFailed { .. }));
    }

    #[tokio::test]
    async fn server_error_maps_to_request_failed() {
        let (gateway, _) = start_stub(
            AxumStatus::SERVICE_UNAVAILABLE,
            serde_json::json!({"error": "model loading"}),
        )
        .await;
        let err = gateway
            .classify(ClassificationRequest {
                text: "x".into(),
                candidate_labels: vec!["a".into()],
                hypothesis_template: "{}".into(),
                multi_label: false,
            })
            .await
            .unwrap_err();
        match err {
            LlmError::RequestFailed { reason, .. } => assert!(reason.contains("503")),
            other => panic!("Expected RequestFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_request_failed() {
        let config = GatewayConfig {
            base_url: "http://127.0.0.1:1".into(),
            timeout: Duration::from_secs(2),
            ..GatewayConfig::default()
        };
        let gateway = HuggingFaceGateway::new(&config).unwrap();
        let err = gateway
            .complete(CompletionRequest::new(vec![ChatMessage::user("x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed { .. }));
    }
}
