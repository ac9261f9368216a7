//! Fakes for the guard's collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::header;
use reqwest::StatusCode;
use tokio::sync::oneshot;

use crate::auth::Session;
use crate::error::GuardError;
use crate::request::{ApiRequest, ApiResponse};
use crate::transport::Transport;
use crate::ui::{CredentialPrompt, Notifier};

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, GuardError> + Send + Sync>;

/// Transport that records every request and answers from a closure.
pub(crate) struct FakeTransport {
    handler: Handler,
    sent: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse, GuardError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn ok() -> Arc<Self> {
        Self::new(|_| Ok(ApiResponse::new(StatusCode::OK, "")))
    }

    /// 200 for requests bearing `token`, 401 for everything else
    pub fn requiring_token(token: &str) -> Arc<Self> {
        let expected = format!("Bearer {}", token);
        Self::new(move |req| {
            if bearer(req).as_deref() == Some(expected.as_str()) {
                Ok(ApiResponse::new(StatusCode::OK, "{}"))
            } else {
                Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, ""))
            }
        })
    }

    pub fn sent(&self) -> Vec<ApiRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GuardError> {
        // suspend once, like a real network call
        tokio::task::yield_now().await;
        let result = (self.handler)(&request);
        self.sent.lock().unwrap().push(request);
        result
    }
}

/// Prompt with a fixed answer, optionally held open until released.
pub(crate) struct FakePrompt {
    answer: Option<Session>,
    calls: AtomicUsize,
    gate: tokio::sync::Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakePrompt {
    pub fn answering(answer: Option<Session>) -> Arc<Self> {
        Arc::new(Self {
            answer,
            calls: AtomicUsize::new(0),
            gate: tokio::sync::Mutex::new(None),
        })
    }

    /// The first `ask` stays open until the returned sender fires
    pub fn gated(answer: Option<Session>) -> (Arc<Self>, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        let prompt = Arc::new(Self {
            answer,
            calls: AtomicUsize::new(0),
            gate: tokio::sync::Mutex::new(Some(rx)),
        });
        (prompt, tx)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialPrompt for FakePrompt {
    async fn ask(&self) -> Option<Session> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().await.take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        self.answer.clone()
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    warnings: Mutex<Vec<String>>,
    refreshes: AtomicUsize,
}

impl RecordingNotifier {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl Notifier for RecordingNotifier {
    fn info(&self, _message: &str) {}

    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn session_with_token(token: &str) -> Session {
    Session {
        token: Some(token.to_string()),
        ..Session::default()
    }
}

pub(crate) fn bearer(request: &ApiRequest) -> Option<String> {
    request
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
