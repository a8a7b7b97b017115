//! Submission pipeline shared by every form endpoint.
//!
//! # Data Flow
//! ```text
//! DTO
//!     → validate (400 on failure, no network call made)
//!     → normalize
//!     → TokenProvider::access_token
//!     → render
//!     → Mailer::send (quiz: submitter, then sales)
//!     → Receipt
//! ```
//!
//! # Design Decisions
//! - One implementation; the HTTP layer only adapts request and response shapes
//! - Network calls are sequential within a submission and never retried
//! - A quiz whose sales copy fails reports failure even though the submitter
//!   already received mail
//! - A refused send drops the cached token, so the next submission fetches a
//!   fresh one

use std::sync::Arc;

use serde::Serialize;

use crate::error::{RelayError, RelayResult};
use crate::forms::{
    ComplianceSubmission, ConsultationRequest, FormSubmission, QuizSubmission,
};
use crate::mail::{
    render, AccessToken, Mailer, OutgoingMail, TokenProvider, COMPLIANCE_MAILBOX, SALES_MAILBOX,
};

/// Successful outcome returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub success: bool,
    pub message: &'static str,
}

impl Receipt {
    fn sent(message: &'static str) -> Self {
        Self {
            success: true,
            message,
        }
    }
}

/// Validates, renders and relays form submissions.
#[derive(Clone)]
pub struct FormPipeline {
    tokens: Arc<dyn TokenProvider>,
    mailer: Arc<dyn Mailer>,
}

impl FormPipeline {
    pub fn new(tokens: Arc<dyn TokenProvider>, mailer: Arc<dyn Mailer>) -> Self {
        Self { tokens, mailer }
    }

    /// Consultation request → sales mailbox.
    pub async fn consultation(&self, mut request: ConsultationRequest) -> RelayResult<Receipt> {
        prepare(&mut request)?;

        let token = self.tokens.access_token().await?;
        let mail = OutgoingMail::new(
            SALES_MAILBOX,
            render::consultation_subject(&request),
            render::consultation(&request),
        );
        self.deliver(&token, &mail).await?;

        tracing::info!(company = %request.company, "Consultation request relayed");
        Ok(Receipt::sent("Consultation request sent successfully"))
    }

    /// Compliance checkup → compliance mailbox.
    pub async fn checkup(&self, mut submission: ComplianceSubmission) -> RelayResult<Receipt> {
        prepare(&mut submission)?;

        let token = self.tokens.access_token().await?;
        let mail = OutgoingMail::new(
            COMPLIANCE_MAILBOX,
            render::checkup_subject(&submission),
            render::checkup(&submission),
        );
        self.deliver(&token, &mail).await?;

        tracing::info!(
            company = %submission.company_name,
            score = submission.effective_score(),
            "Compliance checkup relayed"
        );
        Ok(Receipt::sent("Checkup results sent successfully"))
    }

    /// Quiz results → submitter, then sales. Both must succeed.
    pub async fn quiz(&self, mut submission: QuizSubmission) -> RelayResult<Receipt> {
        prepare(&mut submission)?;

        let token = self.tokens.access_token().await?;
        let subject = render::quiz_subject(&submission);
        let html = render::quiz(&submission);

        let to_submitter = OutgoingMail::new(submission.email.clone(), subject.clone(), html.clone());
        self.deliver(&token, &to_submitter).await?;

        let to_sales = OutgoingMail::new(SALES_MAILBOX, subject, html);
        if let Err(e) = self.deliver(&token, &to_sales).await {
            tracing::warn!(
                to = %submission.email,
                "Quiz results reached the submitter but not the sales mailbox"
            );
            return Err(e);
        }

        tracing::info!(
            company = %submission.company,
            recommendations = submission.recommendations.len(),
            "Quiz results relayed"
        );
        Ok(Receipt::sent("Quiz results sent successfully"))
    }

    async fn deliver(&self, token: &AccessToken, mail: &OutgoingMail) -> RelayResult<()> {
        let result = self.mailer.send(token, mail).await;
        if let Err(RelayError::UpstreamSend) = result {
            self.tokens.invalidate();
        }
        result
    }
}

/// Validate, then normalize in place.
fn prepare<F: FormSubmission>(form: &mut F) -> RelayResult<()> {
    if let Err(reason) = form.validate() {
        tracing::debug!(form = F::KIND.as_str(), reason = %reason, "Submission rejected");
        return Err(reason.into());
    }
    form.normalize();
    Ok(())
}
