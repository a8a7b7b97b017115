//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use form_relay::config::RelayConfig;
use form_relay::mail::{AccessToken, Mailer, OutgoingMail, TokenProvider};
use form_relay::{RelayError, RelayResult};

/// One request received by the mock upstream.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl Captured {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Clone, Default)]
struct MockState {
    captured: Arc<Mutex<Vec<Captured>>>,
    token_status: Arc<AtomicU16>,
    send_status: Arc<AtomicU16>,
    token_calls: Arc<AtomicUsize>,
}

/// Mock identity + mail API on an ephemeral port.
///
/// `POST /{tenant}/oauth2/v2.0/token` issues `mock-token`;
/// `POST /users/{sender}/sendMail` answers 202. Both statuses are programmable.
pub struct MockGraph {
    pub addr: SocketAddr,
    state: MockState,
}

impl MockGraph {
    pub async fn start() -> Self {
        let state = MockState::default();
        state.token_status.store(200, Ordering::SeqCst);
        state.send_status.store(202, Ordering::SeqCst);

        let app = Router::new().fallback(mock_handler).with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Relay config pointing both upstreams at this mock.
    pub fn config(&self) -> RelayConfig {
        let mut config = RelayConfig::default();
        config.mail.authority_url = self.base_url();
        config.mail.graph_url = self.base_url();
        config.timeouts.upstream_connect_secs = 2;
        config
    }

    pub fn fail_tokens(&self, status: u16) {
        self.state.token_status.store(status, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, status: u16) {
        self.state.send_status.store(status, Ordering::SeqCst);
    }

    pub fn token_calls(&self) -> usize {
        self.state.token_calls.load(Ordering::SeqCst)
    }

    pub fn captured(&self) -> Vec<Captured> {
        self.state.captured.lock().unwrap().clone()
    }

    /// Captured `sendMail` calls, in arrival order.
    pub fn sent(&self) -> Vec<Captured> {
        self.captured()
            .into_iter()
            .filter(|c| c.path.ends_with("/sendMail"))
            .collect()
    }
}

async fn mock_handler(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let path = uri.path().to_string();
    state.captured.lock().unwrap().push(Captured {
        method,
        path: path.clone(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    if path.ends_with("/oauth2/v2.0/token") {
        state.token_calls.fetch_add(1, Ordering::SeqCst);
        let status = StatusCode::from_u16(state.token_status.load(Ordering::SeqCst)).unwrap();
        if status.is_success() {
            let body = json!({ "access_token": "mock-token", "expires_in": 3599, "token_type": "Bearer" });
            return (status, body.to_string()).into_response();
        }
        let body = json!({ "error": "invalid_client", "error_description": "bad secret" });
        return (status, body.to_string()).into_response();
    }

    if path.ends_with("/sendMail") {
        let status = StatusCode::from_u16(state.send_status.load(Ordering::SeqCst)).unwrap();
        if status.is_success() {
            return status.into_response();
        }
        let body = json!({ "error": { "code": "ErrorAccessDenied", "message": "denied" } });
        return (status, body.to_string()).into_response();
    }

    StatusCode::NOT_FOUND.into_response()
}

/// Token provider that counts calls and invalidations, and optionally fails.
#[derive(Default)]
pub struct StubTokens {
    pub calls: AtomicUsize,
    pub invalidations: AtomicUsize,
    pub fail: bool,
}

impl StubTokens {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for StubTokens {
    async fn access_token(&self) -> RelayResult<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RelayError::UpstreamAuth);
        }
        Ok(AccessToken::new("stub-token", Duration::from_secs(3600)))
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mailer that records every message. Attempts are numbered from 1:
/// `fail_on` fails one, `slow_on` sleeps before completing one.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingMail>>,
    pub attempts: AtomicUsize,
    pub fail_on: Option<usize>,
    pub slow_on: Option<(usize, Duration)>,
}

impl RecordingMailer {
    pub fn failing_on(attempt: usize) -> Self {
        Self {
            fail_on: Some(attempt),
            ..Default::default()
        }
    }

    pub fn slow_on(attempt: usize, delay: Duration) -> Self {
        Self {
            slow_on: Some((attempt, delay)),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, token: &AccessToken, mail: &OutgoingMail) -> RelayResult<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        assert_eq!(token.bearer(), "stub-token");
        if let Some((slow, delay)) = self.slow_on {
            if slow == attempt {
                tokio::time::sleep(delay).await;
            }
        }
        if self.fail_on == Some(attempt) {
            return Err(RelayError::UpstreamSend);
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

/// Mailer whose every send panics.
pub struct PanickingMailer;

#[async_trait]
impl Mailer for PanickingMailer {
    async fn send(&self, _token: &AccessToken, _mail: &OutgoingMail) -> RelayResult<()> {
        panic!("mailer exploded");
    }
}

pub fn consultation_json() -> Value {
    json!({
        "name": "Ada Lovelace",
        "email": "Ada@Example.com",
        "company": "Analytical Engines",
        "message": "We need help with SOC 2."
    })
}

pub fn checkup_json() -> Value {
    json!({
        "company_name": "Acme Corp",
        "contact_name": "Wile E. Coyote",
        "work_email": "wile@acme.example",
        "phone": "555-0100",
        "industry": "Manufacturing",
        "company_size": "51-200",
        "data_encryption": "Yes",
        "access_controls": "Partially",
        "mfa_enabled": "Yes",
        "security_policy": "No",
        "certifications": ["ISO 27001"],
        "score": 72,
        "timestamp": "2024-05-01T12:00:00.000Z"
    })
}

pub fn quiz_json() -> Value {
    json!({
        "email": "grace@navy.example",
        "name": "Grace Hopper",
        "company": "Navy",
        "recommendations": [{
            "name": "Invoice Automation",
            "description": "Extract and post invoices automatically.",
            "benefits": ["Saves 10 hours a week", "Fewer errors"]
        }],
        "details": {
            "industry": "Government",
            "pain_points": ["Data entry", "Reporting"]
        },
        "timestamp": "2024-05-01T12:00:00.000Z"
    })
}
