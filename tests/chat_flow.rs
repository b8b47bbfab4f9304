//! Chat lifecycle on top of a completed detection.

mod support;

use std::sync::Arc;
use std::time::Duration;

use leukodetect::chat::FALLBACK_REPLY;
use leukodetect::{
    ChatContext, ChatController, ChatOutcome, ChatPhase, DetectionController, Role,
    SessionError, SessionEvent, SessionStore,
};
use support::{ScriptedService, analysis, connectivity, image, wait_until};

struct Harness {
    store: SessionStore,
    service: Arc<ScriptedService>,
    detection: DetectionController,
    chat: ChatController,
}

impl Harness {
    fn new() -> Self {
        let store = SessionStore::new();
        let service = Arc::new(ScriptedService::new());
        Self {
            detection: DetectionController::new(store.clone(), service.clone()),
            chat: ChatController::new(store.clone(), service.clone()),
            store,
            service,
        }
    }

    /// Detection of "Normal" at 96.4% with the chat surface opened.
    async fn analysed() -> Self {
        let harness = Self::new();
        harness.service.push_prediction(Ok(analysis("Normal", 96.4)));
        harness.detection.select_image(image("a.jpg"));
        harness.detection.submit_current().await;
        assert!(harness.chat.open_chat());
        harness
    }

    fn log(&self) -> Vec<(Role, String)> {
        self.store.read(|state| {
            state
                .chat()
                .map(|chat| {
                    chat.messages()
                        .iter()
                        .map(|m| (m.role, m.content.clone()))
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    fn chat_phase(&self) -> ChatPhase {
        self.store.snapshot().chat_phase
    }
}

#[tokio::test]
async fn opening_chat_seeds_with_result() {
    let harness = Harness::analysed().await;

    let log = harness.log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].0, Role::Assistant);
    assert!(log[0].1.contains("Normal"));
    assert!(log[0].1.contains("96.4%"));
    assert!(harness.store.snapshot().chat.unwrap().is_seeded());
}

#[tokio::test]
async fn chat_cannot_open_without_a_result() {
    let harness = Harness::new();
    assert!(!harness.chat.open_chat());
    assert!(harness.store.snapshot().chat.is_none());
    assert_eq!(harness.chat.send_message("Hi").await, ChatOutcome::Ignored);
    assert!(harness.service.chat_calls().is_empty());
}

#[tokio::test]
async fn reply_is_appended_after_the_question() {
    let harness = Harness::analysed().await;
    harness
        .service
        .push_reply(Ok("Explanation...".to_string()));

    let outcome = harness.chat.send_message("What does this mean?").await;

    assert_eq!(outcome, ChatOutcome::Replied("Explanation...".into()));
    let log = harness.log();
    assert_eq!(log.len(), 3);
    assert_eq!(log[1], (Role::User, "What does this mean?".to_string()));
    assert_eq!(log[2], (Role::Assistant, "Explanation...".to_string()));
    assert_eq!(harness.chat_phase(), ChatPhase::Idle);

    let calls = harness.service.chat_calls();
    assert_eq!(
        calls,
        vec![(
            "What does this mean?".to_string(),
            ChatContext {
                result: "Normal".into(),
                confidence: 96.4
            }
        )]
    );
}

#[tokio::test]
async fn blank_messages_are_ignored() {
    let harness = Harness::analysed().await;

    for text in ["", "   ", "\n\t"] {
        assert_eq!(harness.chat.send_message(text).await, ChatOutcome::Ignored);
    }

    assert_eq!(harness.log().len(), 1);
    assert_eq!(harness.chat_phase(), ChatPhase::Idle);
    assert!(harness.service.chat_calls().is_empty());
}

#[tokio::test]
async fn failed_chat_appends_fallback_and_resets_phase() {
    let harness = Harness::analysed().await;
    harness.service.push_reply(Err(connectivity()));

    let outcome = harness.chat.send_message("Hi").await;

    assert_eq!(outcome, ChatOutcome::FellBack(connectivity()));
    let log = harness.log();
    assert_eq!(log.len(), 3);
    assert_eq!(log[1], (Role::User, "Hi".to_string()));
    assert_eq!(log[2], (Role::Assistant, FALLBACK_REPLY.to_string()));
    assert_eq!(harness.chat_phase(), ChatPhase::Idle);
    assert!(harness.store.take_notices().iter().all(|n| n.error.is_none()));
}

#[tokio::test]
async fn malformed_and_service_failures_also_fall_back() {
    let harness = Harness::analysed().await;
    harness
        .service
        .push_reply(Err(SessionError::protocol("No response from server")));
    harness.service.push_reply(Err(SessionError::Service {
        status: 500,
        message: "Gemini API key missing".into(),
    }));

    harness.chat.send_message("one").await;
    harness.chat.send_message("two").await;

    let fallbacks = harness
        .log()
        .iter()
        .filter(|(role, content)| *role == Role::Assistant && content == FALLBACK_REPLY)
        .count();
    assert_eq!(fallbacks, 2);
    assert_eq!(harness.chat_phase(), ChatPhase::Idle);
}

#[tokio::test]
async fn user_message_is_visible_while_awaiting_reply() {
    let harness = Harness::analysed().await;
    let gate = harness.service.gate_reply();

    let (outcome, ()) = futures::join!(harness.chat.send_message("Is this serious?"), async {
        wait_until(|| harness.service.chat_calls().len() == 1).await;
        assert_eq!(harness.chat_phase(), ChatPhase::AwaitingReply);
        assert_eq!(harness.log().last().unwrap().1, "Is this serious?");
        gate.release(Ok("Please consult a hematologist.".into()));
    });

    assert!(matches!(outcome, ChatOutcome::Replied(_)));
    assert_eq!(harness.chat_phase(), ChatPhase::Idle);
}

#[tokio::test]
async fn input_buffer_is_sent_and_cleared() {
    let harness = Harness::analysed().await;
    harness.service.push_reply(Ok("Sure.".into()));

    harness.chat.set_input("Explain AML");
    assert_eq!(harness.store.snapshot().chat.unwrap().input(), "Explain AML");
    harness.chat.send_input().await;

    assert_eq!(harness.store.snapshot().chat.unwrap().input(), "");
    assert_eq!(harness.log()[1], (Role::User, "Explain AML".to_string()));
}

#[tokio::test]
async fn ordinals_follow_insertion_order() {
    let harness = Harness::analysed().await;
    for reply in ["a", "b", "c"] {
        harness.service.push_reply(Ok(reply.into()));
        harness.chat.send_message("q").await;
    }

    let ordinals: Vec<u64> = harness.store.read(|state| {
        state
            .chat()
            .unwrap()
            .messages()
            .iter()
            .map(|m| m.ordinal)
            .collect()
    });
    assert_eq!(ordinals, (0..7).collect::<Vec<u64>>());
}

#[tokio::test]
async fn stale_reply_is_dropped_when_a_newer_message_was_sent() {
    let harness = Harness::analysed().await;
    let first_gate = harness.service.gate_reply();
    harness.service.push_reply(Ok("second answer".into()));

    let (first, second) = futures::join!(harness.chat.send_message("first"), async {
        wait_until(|| harness.service.chat_calls().len() == 1).await;
        let outcome = harness.chat.send_message("second").await;
        first_gate.release(Ok("first answer".into()));
        outcome
    });

    assert_eq!(first, ChatOutcome::Superseded);
    assert_eq!(second, ChatOutcome::Replied("second answer".into()));
    let contents: Vec<String> = harness.log().into_iter().map(|(_, c)| c).collect();
    assert_eq!(contents[1..], ["first", "second", "second answer"]);
    assert_eq!(harness.chat_phase(), ChatPhase::Idle);
}

#[tokio::test]
async fn dropping_an_in_flight_reply_resets_the_phase() {
    let harness = Harness::analysed().await;
    let _gate = harness.service.gate_reply();

    let timed_out = tokio::time::timeout(
        Duration::from_millis(20),
        harness.chat.send_message("anyone there?"),
    )
    .await;

    assert!(timed_out.is_err());
    assert_eq!(harness.chat_phase(), ChatPhase::Idle);
    assert_eq!(harness.log().len(), 2);
}

#[tokio::test]
async fn new_detection_destroys_chat_and_allows_one_new_seed() {
    let harness = Harness::analysed().await;
    harness.service.push_reply(Ok("ok".into()));
    harness.chat.send_message("hello").await;

    harness
        .service
        .push_prediction(Ok(analysis("Leukemia Akut Limfoblastik (ALL)", 92.5)));
    harness.detection.submit_current().await;
    assert!(harness.store.snapshot().chat.is_none());

    harness.chat.open_chat();
    harness.chat.close_chat();
    harness.chat.open_chat();

    let log = harness.log();
    assert_eq!(log.len(), 1);
    assert!(log[0].1.contains("Leukemia Akut Limfoblastik (ALL)"));
    assert!(log[0].1.contains("92.5%"));
}

#[tokio::test]
async fn clearing_the_image_destroys_the_chat() {
    let harness = Harness::analysed().await;
    let mut events = harness.store.subscribe();

    harness.detection.clear_image();

    assert!(harness.store.snapshot().chat.is_none());
    assert!(matches!(events.try_recv(), Ok(SessionEvent::ImageCleared)));
}
