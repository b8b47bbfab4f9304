use tracing::debug;

use super::event::{SessionEvent, Transition};
use super::preview::{PreviewHandle, PreviewRegistry};
use crate::error::SessionError;
use crate::service::ChatContext;
use crate::types::{AnalysisResult, ChatMessage, ImageAsset, Role};

/// Assistant reply used whenever the chat round-trip fails.
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong. Make sure the detection API is running and the assistant API key is configured.";

/// First assistant message of a chat session.
///
/// Confidence is shown to one decimal, with ties rounded away from zero
/// (`72.25` reads as `72.3%`).
pub fn seed_message(result: &AnalysisResult) -> String {
    let confidence = (result.confidence * 10.0).round() / 10.0;
    format!(
        "Hello! I can help you understand this leukemia analysis. The detection result is: {} with {:.1}% confidence. Ask me anything you would like to know.",
        result.label, confidence
    )
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Detecting,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChatPhase {
    #[default]
    Idle,
    AwaitingReply,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A non-fatal, user-visible notification (rendered as a toast by the shell).
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
    pub error: Option<SessionError>,
}

impl Notice {
    fn info(title: &str, description: &str) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.to_string(),
            description: description.to_string(),
            error: None,
        }
    }

    fn error(title: &str, error: SessionError) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.to_string(),
            description: error.to_string(),
            error: Some(error),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.error.as_ref().is_some_and(SessionError::is_retryable)
    }
}

/// Conversation about one analysis result. Append-only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    next_ordinal: u64,
    seeded: bool,
    open: bool,
    input: String,
}

impl ChatSession {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Append the greeting for `result` unless this session already has one.
    pub fn seed_if_needed(&mut self, result: &AnalysisResult) -> bool {
        if self.seeded {
            return false;
        }
        self.push(Role::Assistant, seed_message(result));
        self.seeded = true;
        true
    }

    fn push(&mut self, role: Role, content: impl Into<String>) {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.messages.push(ChatMessage::new(role, content, ordinal));
    }
}

/// The single mutable context shared by both controllers.
///
/// Only [`SessionState::apply`] changes it.
#[derive(Default)]
pub struct SessionState {
    image: Option<ImageAsset>,
    preview: Option<PreviewHandle>,
    previews: PreviewRegistry,
    result: Option<AnalysisResult>,
    confidence: Option<f64>,
    phase: Phase,
    pending_detection: Option<u64>,
    chat: Option<ChatSession>,
    chat_phase: ChatPhase,
    pending_reply: Option<u64>,
    notices: Vec<Notice>,
}

impl SessionState {
    pub fn new(previews: PreviewRegistry) -> Self {
        Self {
            previews,
            ..Self::default()
        }
    }

    pub fn image(&self) -> Option<&ImageAsset> {
        self.image.as_ref()
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Confidence last shown to the user.
    ///
    /// Kept while a new detection is running even though `result` is already
    /// cleared, so the display does not blank out mid-request.
    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn chat(&self) -> Option<&ChatSession> {
        self.chat.as_ref()
    }

    pub fn chat_phase(&self) -> ChatPhase {
        self.chat_phase
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub(crate) fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn apply(&mut self, event: SessionEvent) -> Transition {
        match event {
            SessionEvent::ImageSelected(image) => {
                // Acquire before replacing so the old handle drops afterwards.
                let preview = self.previews.acquire(&image);
                self.preview = Some(preview);
                self.image = Some(image);
            }
            SessionEvent::ImageCleared => {
                self.image = None;
                self.preview = None;
                self.confidence = None;
                self.phase = Phase::Idle;
                self.pending_detection = None;
                self.clear_result();
            }
            SessionEvent::DetectionRequested { seq } => {
                self.phase = Phase::Detecting;
                self.pending_detection = Some(seq);
                self.clear_result();
            }
            SessionEvent::DetectionRejected(error) => {
                self.notices.push(Notice::error("No image", error));
            }
            SessionEvent::DetectionSucceeded { seq, result } => {
                if !self.finish_detection(seq) {
                    return Transition::Ignored;
                }
                self.confidence = Some(result.confidence);
                self.result = Some(result);
                self.notices.push(Notice::info(
                    "Analysis complete",
                    "The detection result is available",
                ));
            }
            SessionEvent::DetectionFailed { seq, error } => {
                if !self.finish_detection(seq) {
                    return Transition::Ignored;
                }
                self.notices.push(Notice::error("Detection failed", error));
            }
            SessionEvent::DetectionAbandoned { seq } => {
                if !self.finish_detection(seq) {
                    return Transition::Ignored;
                }
            }
            SessionEvent::ChatOpened => {
                let Some(result) = self.result.as_ref() else {
                    return Transition::Ignored;
                };
                let chat = self.chat.get_or_insert_with(ChatSession::default);
                chat.open = true;
                chat.seed_if_needed(result);
            }
            SessionEvent::ChatClosed => {
                let Some(chat) = self.chat.as_mut() else {
                    return Transition::Ignored;
                };
                chat.open = false;
            }
            SessionEvent::ChatInputChanged(text) => {
                let Some(chat) = self.chat.as_mut() else {
                    return Transition::Ignored;
                };
                chat.input = text;
            }
            SessionEvent::ChatMessageSent { seq, text, context } => {
                let current = self.result.as_ref().map(ChatContext::from);
                if current.as_ref() != Some(&context) || text.trim().is_empty() {
                    return Transition::Ignored;
                }
                let Some(chat) = self.chat.as_mut() else {
                    return Transition::Ignored;
                };
                chat.push(Role::User, text);
                chat.input.clear();
                self.chat_phase = ChatPhase::AwaitingReply;
                self.pending_reply = Some(seq);
            }
            SessionEvent::ChatReplySucceeded { seq, text } => {
                let Some(chat) = self.finish_reply(seq) else {
                    return Transition::Ignored;
                };
                chat.push(Role::Assistant, text);
            }
            SessionEvent::ChatReplyFailed { seq, error } => {
                let Some(chat) = self.finish_reply(seq) else {
                    return Transition::Ignored;
                };
                debug!(error = %error, "chat reply replaced with fallback");
                chat.push(Role::Assistant, FALLBACK_REPLY);
            }
            SessionEvent::ChatReplyAbandoned { seq } => {
                if self.finish_reply(seq).is_none() {
                    return Transition::Ignored;
                }
            }
        }
        Transition::Applied
    }

    /// Nulls the result; the chat session and its in-flight reply go with it.
    fn clear_result(&mut self) {
        self.result = None;
        self.chat = None;
        self.chat_phase = ChatPhase::Idle;
        self.pending_reply = None;
    }

    fn finish_detection(&mut self, seq: u64) -> bool {
        if self.pending_detection != Some(seq) {
            return false;
        }
        self.pending_detection = None;
        self.phase = Phase::Idle;
        true
    }

    fn finish_reply(&mut self, seq: u64) -> Option<&mut ChatSession> {
        if self.pending_reply != Some(seq) {
            return None;
        }
        self.pending_reply = None;
        self.chat_phase = ChatPhase::Idle;
        self.chat.as_mut()
    }
}
