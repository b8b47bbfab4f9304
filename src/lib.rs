//! Client-side session orchestration for leukemia detection.
//!
//! A shell selects an image, asks the [`DetectionController`] to analyse it,
//! and then lets the user discuss the result through the [`ChatController`].
//! Both controllers talk to the detection API through an
//! [`InferenceService`] and change state only by dispatching events into a
//! shared [`SessionStore`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use leukodetect::{ChatController, DetectionController, ImageAsset, ServiceClient, SessionStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! leukodetect::init_tracing();
//! let service = Arc::new(ServiceClient::from_env()?);
//! let store = SessionStore::new();
//! let detection = DetectionController::new(store.clone(), service.clone());
//! let chat = ChatController::new(store.clone(), service);
//!
//! detection.select_image(ImageAsset::from_path("smear.jpg").await?);
//! detection.submit_current().await;
//! chat.open_chat();
//! chat.send_message("What does this mean?").await;
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod config;
pub mod detection;
pub mod error;
mod logging;
pub mod service;
pub mod session;
pub mod types;

pub use chat::{ChatController, ChatOutcome};
pub use config::ServiceConfig;
pub use detection::{DetectionController, DetectionOutcome};
pub use error::{ConfigError, SessionError, SessionResult};
pub use logging::init_tracing;
pub use service::{ChatContext, InferenceService, ModelInfo, ServiceClient};
pub use session::{
    ChatPhase, ChatSession, Notice, NoticeLevel, Phase, SessionEvent, SessionSnapshot,
    SessionState, SessionStore,
};
pub use types::{AnalysisResult, ChatMessage, ImageAsset, Role};
