//! Request and response bodies of the detection API, plus the decoders that
//! map a raw `(status, body)` pair onto the error taxonomy.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{SessionError, SessionResult};
use crate::types::AnalysisResult;

/// Analysis context sent along with every chat message.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatContext {
    pub result: String,
    pub confidence: f64,
}

impl From<&AnalysisResult> for ChatContext {
    fn from(result: &AnalysisResult) -> Self {
        Self {
            result: result.label.clone(),
            confidence: result.confidence,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub message: &'a str,
    pub context: &'a ChatContext,
}

/// Metadata served by `/model-info`. Unknown fields are kept in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub input_shape: Option<Vec<i64>>,
    #[serde(default)]
    pub output_shape: Option<Vec<i64>>,
    #[serde(default)]
    pub input_dtype: Option<String>,
    #[serde(default)]
    pub output_dtype: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub input_size: Option<Vec<u32>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct PredictionResponse {
    result: Option<String>,
    confidence: Option<f64>,
    #[serde(default)]
    all_probabilities: Option<BTreeMap<String, f64>>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: Option<String>,
}

pub(crate) fn decode_prediction(status: StatusCode, body: &str) -> SessionResult<AnalysisResult> {
    if !status.is_success() {
        return Err(service_error(status, body));
    }

    let parsed: PredictionResponse = serde_json::from_str(body)
        .map_err(|e| SessionError::protocol(format!("prediction body is not valid JSON: {e}")))?;

    let label = parsed
        .result
        .filter(|label| !label.trim().is_empty())
        .ok_or_else(|| SessionError::protocol("prediction is missing `result`"))?;
    let confidence = parsed
        .confidence
        .ok_or_else(|| SessionError::protocol("prediction is missing `confidence`"))?;
    if !(0.0..=100.0).contains(&confidence) {
        return Err(SessionError::protocol(format!(
            "confidence {confidence} is outside 0-100"
        )));
    }

    Ok(AnalysisResult {
        label,
        confidence,
        probabilities: parsed.all_probabilities,
    })
}

pub(crate) fn decode_chat_reply(status: StatusCode, body: &str) -> SessionResult<String> {
    if !status.is_success() {
        return Err(service_error(status, body));
    }

    match serde_json::from_str::<ChatResponse>(body) {
        Ok(ChatResponse {
            response: Some(text),
        }) if !text.is_empty() => Ok(text),
        Ok(_) => Err(SessionError::protocol("No response from server")),
        Err(e) => Err(SessionError::protocol(format!(
            "chat body is not valid JSON: {e}"
        ))),
    }
}

pub(crate) fn decode_model_info(status: StatusCode, body: &str) -> SessionResult<ModelInfo> {
    if !status.is_success() {
        return Err(service_error(status, body));
    }
    serde_json::from_str(body)
        .map_err(|e| SessionError::protocol(format!("model info is not valid JSON: {e}")))
}

/// Prefer the body's `message`, then its `error`, then a generic status line.
fn service_error(status: StatusCode, body: &str) -> SessionError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|err| err.message.or(err.error))
        .filter(|msg| !msg.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));

    SessionError::Service {
        status: status.as_u16(),
        message,
    }
}
