//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

use leukodetect::{
    AnalysisResult, ChatContext, ImageAsset, InferenceService, ModelInfo, SessionError,
    SessionResult,
};

pub const BASE_URL: &str = "http://localhost:5000";

/// A response the scripted service hands out, either immediately or once
/// the test releases it.
pub enum Scripted<T> {
    Ready(SessionResult<T>),
    Gated(oneshot::Receiver<SessionResult<T>>),
}

impl<T> Scripted<T> {
    async fn resolve(self) -> SessionResult<T> {
        match self {
            Scripted::Ready(value) => value,
            Scripted::Gated(rx) => rx.await.unwrap_or_else(|_| Err(connectivity())),
        }
    }
}

/// Release handle for a gated response.
pub struct Gate<T>(oneshot::Sender<SessionResult<T>>);

impl<T> Gate<T> {
    pub fn release(self, value: SessionResult<T>) {
        let _ = self.0.send(value);
    }
}

#[derive(Default)]
pub struct ScriptedService {
    predictions: Mutex<VecDeque<Scripted<AnalysisResult>>>,
    replies: Mutex<VecDeque<Scripted<String>>>,
    chat_calls: Mutex<Vec<(String, ChatContext)>>,
    predict_calls: AtomicUsize,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_prediction(&self, value: SessionResult<AnalysisResult>) {
        self.predictions
            .lock()
            .unwrap()
            .push_back(Scripted::Ready(value));
    }

    pub fn gate_prediction(&self) -> Gate<AnalysisResult> {
        let (tx, rx) = oneshot::channel();
        self.predictions.lock().unwrap().push_back(Scripted::Gated(rx));
        Gate(tx)
    }

    pub fn push_reply(&self, value: SessionResult<String>) {
        self.replies.lock().unwrap().push_back(Scripted::Ready(value));
    }

    pub fn gate_reply(&self) -> Gate<String> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(Scripted::Gated(rx));
        Gate(tx)
    }

    pub fn predict_calls(&self) -> usize {
        self.predict_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> Vec<(String, ChatContext)> {
        self.chat_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceService for ScriptedService {
    async fn predict(&self, _image: &ImageAsset) -> SessionResult<AnalysisResult> {
        self.predict_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.predictions.lock().unwrap().pop_front();
        match next {
            Some(scripted) => scripted.resolve().await,
            None => Err(SessionError::protocol("no scripted prediction")),
        }
    }

    async fn chat(&self, message: &str, context: &ChatContext) -> SessionResult<String> {
        self.chat_calls
            .lock()
            .unwrap()
            .push((message.to_string(), context.clone()));
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(scripted) => scripted.resolve().await,
            None => Err(SessionError::protocol("no scripted reply")),
        }
    }

    async fn health(&self) -> bool {
        true
    }

    async fn model_info(&self) -> SessionResult<ModelInfo> {
        Ok(ModelInfo {
            classes: vec!["ALL".into(), "AML".into(), "Normal".into()],
            ..ModelInfo::default()
        })
    }
}

pub fn connectivity() -> SessionError {
    SessionError::Connectivity {
        base_url: BASE_URL.to_string(),
    }
}

pub fn image(name: &str) -> ImageAsset {
    ImageAsset::new(name, "image/jpeg", vec![0xFFu8, 0xD8, 0xFF, 0xE0]).unwrap()
}

pub fn analysis(label: &str, confidence: f64) -> AnalysisResult {
    AnalysisResult {
        label: label.to_string(),
        confidence,
        probabilities: None,
    }
}

/// Yield until `cond` holds; used to line up concurrent requests.
pub async fn wait_until(cond: impl Fn() -> bool) {
    while !cond() {
        tokio::task::yield_now().await;
    }
}
