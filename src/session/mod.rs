//! Session state machine.
//!
//! [`SessionState`] is changed only by [`SessionState::apply`], driven by
//! [`SessionEvent`]s that the controllers dispatch through a [`SessionStore`].
//! Subscribers see every applied event, in order, which is how a shell
//! reacts to new chat messages or results without polling.

mod event;
mod preview;
mod state;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, trace};

pub use event::{SessionEvent, Transition};
pub use preview::{PreviewHandle, PreviewRegistry};
pub use state::{
    ChatPhase, ChatSession, FALLBACK_REPLY, Notice, NoticeLevel, Phase, SessionState,
    seed_message,
};

use crate::types::{AnalysisResult, ImageAsset};

const EVENT_CAPACITY: usize = 64;

/// Shared handle to the session; cheap to clone.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<Mutex<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
    previews: PreviewRegistry,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_previews(PreviewRegistry::new())
    }

    pub fn with_previews(previews: PreviewRegistry) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(SessionState::new(previews.clone()))),
            events,
            previews,
        }
    }

    /// Run the reducer and notify subscribers if anything changed.
    pub fn dispatch(&self, event: SessionEvent) -> Transition {
        let mut state = self.lock();
        let transition = state.apply(event.clone());
        match transition {
            Transition::Applied => {
                trace!(?event, "session event applied");
                // Sent under the lock so subscribers observe reducer order.
                let _ = self.events.send(event);
            }
            Transition::Ignored => debug!(?event, "session event ignored"),
        }
        transition
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.lock())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.read(|state| SessionSnapshot {
            image: state.image().cloned(),
            preview_uri: state.preview().map(PreviewHandle::uri),
            result: state.result().cloned(),
            confidence: state.confidence(),
            phase: state.phase(),
            chat: state.chat().cloned(),
            chat_phase: state.chat_phase(),
        })
    }

    /// Hand pending notices to the shell for display.
    pub fn take_notices(&self) -> Vec<Notice> {
        self.lock().take_notices()
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the session for rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub image: Option<ImageAsset>,
    pub preview_uri: Option<String>,
    pub result: Option<AnalysisResult>,
    pub confidence: Option<f64>,
    pub phase: Phase,
    pub chat: Option<ChatSession>,
    pub chat_phase: ChatPhase,
}

/// Dispatches its event on drop unless disarmed.
///
/// Controllers hold one across each `.await` so a dropped future still
/// returns the phase to idle.
pub(crate) struct PendingGuard<'a> {
    store: &'a SessionStore,
    on_drop: Option<SessionEvent>,
}

impl<'a> PendingGuard<'a> {
    pub(crate) fn new(store: &'a SessionStore, on_drop: SessionEvent) -> Self {
        Self {
            store,
            on_drop: Some(on_drop),
        }
    }

    pub(crate) fn disarm(mut self) {
        self.on_drop = None;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Some(event) = self.on_drop.take() {
            self.store.dispatch(event);
        }
    }
}

/// Monotonic request numbers for one controller.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    counter: AtomicU64,
}

impl RequestSequencer {
    pub fn issue(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}
