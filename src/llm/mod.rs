//! Model gateway for mail triage.
//!
//! Exposes two capabilities behind traits:
//! - **Text generation** ([`LlmProvider`]) for reply drafting
//! - **Zero-shot classification** ([`ZeroShotClassifier`]) for importance
//!
//! The concrete backend is the Hugging Face inference API. It is built once
//! at startup and handed to the pipeline as shared handles.

pub mod huggingface;
pub mod provider;

pub use huggingface::HuggingFaceGateway;
pub use provider::*;

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::error::LlmError;

/// Shared handles to both gateway capabilities.
#[derive(Clone)]
pub struct ModelGateway {
    pub generator: Arc<dyn LlmProvider>,
    pub classifier: Arc<dyn ZeroShotClassifier>,
}

impl ModelGateway {
    pub fn new(generator: Arc<dyn LlmProvider>, classifier: Arc<dyn ZeroShotClassifier>) -> Self {
        Self {
            generator,
            classifier,
        }
    }
}

/// Create the model gateway from configuration.
pub fn create_gateway(config: &GatewayConfig) -> Result<ModelGateway, LlmError> {
    let hf = Arc::new(HuggingFaceGateway::new(config)?);
    tracing::info!(
        generation_model = %config.generation_model,
        classifier_model = %config.classifier_model,
        base_url = %config.base_url,
        "Using Hugging Face inference"
    );
    Ok(ModelGateway::new(hf.clone(), hf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_gateway_without_token_still_constructs() {
        // Auth failures only surface once a request is made.
        let gateway = create_gateway(&GatewayConfig::default()).unwrap();
        assert_eq!(
            gateway.generator.model_name(),
            crate::config::DEFAULT_GENERATION_MODEL
        );
        assert_eq!(
            gateway.classifier.model_name(),
            crate::config::DEFAULT_CLASSIFIER_MODEL
        );
    }
}
