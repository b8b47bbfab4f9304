use crate::error::SessionError;
use crate::service::ChatContext;
use crate::types::{AnalysisResult, ImageAsset};

/// Everything that can change a [`SessionState`](super::SessionState).
///
/// Request/response pairs carry the sequence number the issuing controller
/// assigned, so late responses to superseded requests can be dropped.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    ImageSelected(ImageAsset),
    ImageCleared,
    DetectionRequested { seq: u64 },
    DetectionRejected(SessionError),
    DetectionSucceeded { seq: u64, result: AnalysisResult },
    DetectionFailed { seq: u64, error: SessionError },
    /// The detection future was dropped before it resolved.
    DetectionAbandoned { seq: u64 },
    ChatOpened,
    ChatClosed,
    ChatInputChanged(String),
    /// `context` is what the request will carry; the message is dropped if
    /// the current result no longer matches it.
    ChatMessageSent {
        seq: u64,
        text: String,
        context: ChatContext,
    },
    ChatReplySucceeded { seq: u64, text: String },
    ChatReplyFailed { seq: u64, error: SessionError },
    ChatReplyAbandoned { seq: u64 },
}

/// What the reducer did with an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// Stale or not applicable in the current state; nothing changed.
    Ignored,
}

impl Transition {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}
