/// Remote detection API.
///
/// The controllers only see the [`InferenceService`] trait, so tests and
/// alternative transports can stand in for the HTTP [`ServiceClient`].
mod client;
mod wire;

use async_trait::async_trait;

use crate::error::SessionResult;
use crate::types::{AnalysisResult, ImageAsset};

pub use client::ServiceClient;
pub use wire::{ChatContext, ModelInfo};

#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Classify an image via `POST /predict`.
    async fn predict(&self, image: &ImageAsset) -> SessionResult<AnalysisResult>;

    /// Ask the assistant about the current result via `POST /chat`.
    async fn chat(&self, message: &str, context: &ChatContext) -> SessionResult<String>;

    /// Liveness probe; any failure reads as unhealthy.
    async fn health(&self) -> bool;

    /// Model metadata from `GET /model-info`.
    async fn model_info(&self) -> SessionResult<ModelInfo>;
}
