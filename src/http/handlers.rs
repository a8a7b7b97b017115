//! Route handlers.
//!
//! Each form handler adapts the JSON body to the shared pipeline and maps
//! the outcome back to `{success, message}` or `{error}`.

use std::future::Future;
use std::time::{Duration, Instant};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use tracing::Instrument;

use crate::error::{RelayError, RelayResult};
use crate::forms::{ComplianceSubmission, ConsultationRequest, FormKind, QuizSubmission};
use crate::http::request::request_id;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::pipeline::Receipt;

type FormResponse = Result<Json<Receipt>, ApiError>;

/// POST /api/contact-form, /api/contact
pub async fn consultation(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ConsultationRequest>, JsonRejection>,
) -> FormResponse {
    let Json(request) = body?;
    let pipeline = state.pipeline.clone();
    respond(FormKind::Consultation, &headers, state.request_timeout, async move {
        pipeline.consultation(request).await
    })
    .await
}

/// POST /api/send-email
pub async fn checkup(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ComplianceSubmission>, JsonRejection>,
) -> FormResponse {
    let Json(submission) = body?;
    let pipeline = state.pipeline.clone();
    respond(FormKind::Checkup, &headers, state.request_timeout, async move {
        pipeline.checkup(submission).await
    })
    .await
}

/// POST /api/submit-quiz
pub async fn quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<QuizSubmission>, JsonRejection>,
) -> FormResponse {
    let Json(submission) = body?;
    let pipeline = state.pipeline.clone();
    respond(FormKind::Quiz, &headers, state.request_timeout, async move {
        pipeline.quiz(submission).await
    })
    .await
}

/// Run `work` on its own task and wait at most `deadline` for it.
///
/// The relay is never cancelled: a dropped connection or a passed deadline
/// only stops the wait, and the task still records its own outcome.
async fn respond<F>(
    kind: FormKind,
    headers: &HeaderMap,
    deadline: Duration,
    work: F,
) -> FormResponse
where
    F: Future<Output = RelayResult<Receipt>> + Send + 'static,
{
    let request_id = request_id(headers);
    let relay = tokio::spawn(settle(kind, request_id.clone(), work).in_current_span());

    match tokio::time::timeout(deadline, relay).await {
        Ok(Ok(outcome)) => outcome.map(Json).map_err(ApiError::from),
        Ok(Err(join_err)) => Err(RelayError::Unexpected(join_err.to_string()).into()),
        Err(_) => {
            tracing::warn!(
                request_id = %request_id,
                form = kind.as_str(),
                deadline_secs = deadline.as_secs(),
                "Response deadline passed, relay continues in background"
            );
            Err(RelayError::TimedOut.into())
        }
    }
}

async fn settle<F>(kind: FormKind, request_id: String, work: F) -> RelayResult<Receipt>
where
    F: Future<Output = RelayResult<Receipt>>,
{
    let start = Instant::now();
    let outcome = work.await;

    match &outcome {
        Ok(_) => {
            metrics::record_submission(kind.as_str(), "sent", start);
            tracing::info!(
                request_id = %request_id,
                form = kind.as_str(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Submission relayed"
            );
        }
        Err(err) => {
            metrics::record_submission(kind.as_str(), err.kind(), start);
            tracing::warn!(
                request_id = %request_id,
                form = kind.as_str(),
                kind = err.kind(),
                "Submission not relayed"
            );
        }
    }
    outcome
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
