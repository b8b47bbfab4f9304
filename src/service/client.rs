use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, warn};

use super::InferenceService;
use super::wire::{self, ChatContext, ChatRequest, ModelInfo};
use crate::config::ServiceConfig;
use crate::error::{ConfigError, SessionError, SessionResult};
use crate::types::{AnalysisResult, ImageAsset};

/// HTTP client for the detection API.
///
/// Holds no per-session state; every call is an independent request that
/// shares the pooled connection and the configured timeout.
#[derive(Clone)]
pub struct ServiceClient {
    client: Client,
    config: ServiceConfig,
}

impl ServiceClient {
    pub fn new(config: ServiceConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Client for the process-wide configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(ServiceConfig::global()?.clone())
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    async fn execute(&self, request: RequestBuilder) -> SessionResult<(StatusCode, String)> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        Ok((status, body))
    }

    fn transport_error(&self, err: reqwest::Error) -> SessionError {
        if err.is_decode() {
            return SessionError::protocol(err.to_string());
        }
        warn!(base_url = %self.config.base_url(), error = %err, "detection API unreachable");
        SessionError::Connectivity {
            base_url: self.config.base_url().to_string(),
        }
    }
}

#[async_trait]
impl InferenceService for ServiceClient {
    async fn predict(&self, image: &ImageAsset) -> SessionResult<AnalysisResult> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.name().to_string())
            .mime_str(image.mime_type())
            .map_err(|e| SessionError::validation(format!("Invalid image type: {e}")))?;
        let form = Form::new().part("image", part);

        debug!(name = image.name(), size = image.size_bytes(), "sending image for prediction");
        let request = self.client.post(self.config.endpoint("/predict")).multipart(form);
        let (status, body) = self.execute(request).await?;
        wire::decode_prediction(status, &body)
    }

    async fn chat(&self, message: &str, context: &ChatContext) -> SessionResult<String> {
        debug!(label = %context.result, "sending chat message");
        let request = self
            .client
            .post(self.config.endpoint("/chat"))
            .json(&ChatRequest { message, context });
        let (status, body) = self.execute(request).await?;
        wire::decode_chat_reply(status, &body)
    }

    async fn health(&self) -> bool {
        match self.client.get(self.config.endpoint("/")).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!(error = %err, "health check failed");
                false
            }
        }
    }

    async fn model_info(&self) -> SessionResult<ModelInfo> {
        let request = self.client.get(self.config.endpoint("/model-info"));
        let (status, body) = self.execute(request).await?;
        wire::decode_model_info(status, &body)
    }
}
