use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{SessionError, SessionResult};
use crate::service::{InferenceService, ModelInfo};
use crate::session::{PendingGuard, RequestSequencer, SessionEvent, SessionStore};
use crate::types::{AnalysisResult, ImageAsset};

/// How a call to [`DetectionController::submit_analysis`] ended.
#[derive(Clone, Debug, PartialEq)]
pub enum DetectionOutcome {
    Completed(AnalysisResult),
    /// Already queued as a notice; the caller may retry.
    Failed(SessionError),
    /// A newer submission (or an image clear) overtook this one.
    Superseded,
}

/// Drives the image -> analysis result lifecycle.
pub struct DetectionController {
    store: SessionStore,
    service: Arc<dyn InferenceService>,
    sequencer: RequestSequencer,
}

impl DetectionController {
    pub fn new(store: SessionStore, service: Arc<dyn InferenceService>) -> Self {
        Self {
            store,
            service,
            sequencer: RequestSequencer::default(),
        }
    }

    pub fn select_image(&self, image: ImageAsset) {
        info!(name = image.name(), size = image.size_bytes(), "image selected");
        self.store.dispatch(SessionEvent::ImageSelected(image));
    }

    pub fn clear_image(&self) {
        self.store.dispatch(SessionEvent::ImageCleared);
    }

    /// Analyse whatever image the session currently holds.
    pub async fn submit_current(&self) -> DetectionOutcome {
        let image = self.store.read(|state| state.image().cloned());
        self.submit_analysis(image.as_ref()).await
    }

    pub async fn submit_analysis(&self, image: Option<&ImageAsset>) -> DetectionOutcome {
        let Some(image) = image else {
            let error = SessionError::validation("no image selected");
            self.store
                .dispatch(SessionEvent::DetectionRejected(error.clone()));
            return DetectionOutcome::Failed(error);
        };

        let seq = self.sequencer.issue();
        info!(seq, name = image.name(), "detection requested");
        self.store.dispatch(SessionEvent::DetectionRequested { seq });

        let guard = PendingGuard::new(&self.store, SessionEvent::DetectionAbandoned { seq });
        let response = self.service.predict(image).await;
        guard.disarm();

        match response {
            Ok(result) => {
                let transition = self.store.dispatch(SessionEvent::DetectionSucceeded {
                    seq,
                    result: result.clone(),
                });
                if !transition.is_applied() {
                    info!(seq, "detection result superseded");
                    return DetectionOutcome::Superseded;
                }
                info!(seq, label = %result.label, confidence = result.confidence, "detection completed");
                DetectionOutcome::Completed(result)
            }
            Err(error) => {
                let transition = self.store.dispatch(SessionEvent::DetectionFailed {
                    seq,
                    error: error.clone(),
                });
                if !transition.is_applied() {
                    return DetectionOutcome::Superseded;
                }
                warn!(seq, error = %error, "detection failed");
                DetectionOutcome::Failed(error)
            }
        }
    }

    pub async fn check_health(&self) -> bool {
        self.service.health().await
    }

    pub async fn model_info(&self) -> SessionResult<ModelInfo> {
        self.service.model_info().await
    }
}
