//! Mail delivery through the Graph `sendMail` endpoint.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{RelayError, RelayResult};
use crate::mail::token::AccessToken;
use crate::mail::OutgoingMail;
use crate::observability::metrics;

/// Delivers a rendered message.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, token: &AccessToken, mail: &OutgoingMail) -> RelayResult<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMailRequest<'a> {
    message: Message<'a>,
    save_to_sent_items: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Message<'a> {
    subject: &'a str,
    body: Body<'a>,
    to_recipients: [Recipient<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Body<'a> {
    content_type: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Recipient<'a> {
    email_address: EmailAddress<'a>,
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    address: &'a str,
}

impl<'a> SendMailRequest<'a> {
    fn new(mail: &'a OutgoingMail) -> Self {
        Self {
            message: Message {
                subject: &mail.subject,
                body: Body {
                    content_type: "HTML",
                    content: &mail.html,
                },
                to_recipients: [Recipient {
                    email_address: EmailAddress { address: &mail.to },
                }],
            },
            save_to_sent_items: true,
        }
    }
}

/// Sends mail as a fixed shared mailbox.
pub struct GraphMailer {
    http: reqwest::Client,
    send_url: String,
}

impl GraphMailer {
    pub fn new(http: reqwest::Client, graph_url: &str, sender: &str) -> Self {
        Self {
            http,
            send_url: format!("{}/users/{}/sendMail", graph_url.trim_end_matches('/'), sender),
        }
    }

    pub fn send_url(&self) -> &str {
        &self.send_url
    }
}

#[async_trait]
impl Mailer for GraphMailer {
    async fn send(&self, token: &AccessToken, mail: &OutgoingMail) -> RelayResult<()> {
        let response = self
            .http
            .post(&self.send_url)
            .bearer_auth(token.bearer())
            .json(&SendMailRequest::new(mail))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, to = %mail.to, "Send mail request failed");
                metrics::record_upstream_failure("send");
                RelayError::UpstreamSend
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, to = %mail.to, "Mail API rejected message");
            metrics::record_upstream_failure("send");
            return Err(RelayError::UpstreamSend);
        }

        tracing::info!(to = %mail.to, subject = %mail.subject, "Email sent");
        Ok(())
    }
}
