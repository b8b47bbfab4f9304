use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::service::{ChatContext, InferenceService};
use crate::session::{PendingGuard, RequestSequencer, SessionEvent, SessionStore};

pub use crate::session::{FALLBACK_REPLY, seed_message};

/// How a call to [`ChatController::send_message`] ended.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatOutcome {
    /// Blank input, or no analysis result to talk about.
    Ignored,
    Replied(String),
    /// The fallback reply was appended in place of an answer.
    FellBack(SessionError),
    /// A later message was sent before this reply arrived; the reply was dropped.
    Superseded,
}

/// Drives the follow-up conversation about the current analysis result.
pub struct ChatController {
    store: SessionStore,
    service: Arc<dyn InferenceService>,
    sequencer: RequestSequencer,
}

impl ChatController {
    pub fn new(store: SessionStore, service: Arc<dyn InferenceService>) -> Self {
        Self {
            store,
            service,
            sequencer: RequestSequencer::default(),
        }
    }

    /// Show the chat surface, creating and seeding the session on first use.
    pub fn open_chat(&self) -> bool {
        self.store.dispatch(SessionEvent::ChatOpened).is_applied()
    }

    pub fn close_chat(&self) {
        self.store.dispatch(SessionEvent::ChatClosed);
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.store
            .dispatch(SessionEvent::ChatInputChanged(text.into()));
    }

    /// Send whatever is in the input buffer.
    pub async fn send_input(&self) -> ChatOutcome {
        let text = self
            .store
            .read(|state| state.chat().map(|chat| chat.input().to_string()))
            .unwrap_or_default();
        self.send_message(&text).await
    }

    pub async fn send_message(&self, text: &str) -> ChatOutcome {
        if text.trim().is_empty() {
            return ChatOutcome::Ignored;
        }

        let context = self.store.read(|state| {
            state
                .chat()
                .and(state.result())
                .map(ChatContext::from)
        });
        let Some(context) = context else {
            debug!("chat message dropped, no analysis result");
            return ChatOutcome::Ignored;
        };

        let seq = self.sequencer.issue();
        let sent = self.store.dispatch(SessionEvent::ChatMessageSent {
            seq,
            text: text.to_string(),
            context: context.clone(),
        });
        if !sent.is_applied() {
            debug!(seq, "chat message dropped, result changed");
            return ChatOutcome::Ignored;
        }

        let guard = PendingGuard::new(&self.store, SessionEvent::ChatReplyAbandoned { seq });
        let reply = self.service.chat(text, &context).await;
        guard.disarm();

        match reply {
            Ok(text) => {
                let transition = self.store.dispatch(SessionEvent::ChatReplySucceeded {
                    seq,
                    text: text.clone(),
                });
                if !transition.is_applied() {
                    info!(seq, "chat reply superseded");
                    return ChatOutcome::Superseded;
                }
                ChatOutcome::Replied(text)
            }
            Err(error) => {
                let transition = self.store.dispatch(SessionEvent::ChatReplyFailed {
                    seq,
                    error: error.clone(),
                });
                if !transition.is_applied() {
                    return ChatOutcome::Superseded;
                }
                warn!(seq, error = %error, "chat request failed, using fallback reply");
                ChatOutcome::FellBack(error)
            }
        }
    }
}
