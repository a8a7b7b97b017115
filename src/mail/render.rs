//! HTML email templates.
//!
//! Pure functions: the same submission always renders to the same bytes.
//! Every value that came from a submission is escaped here, exactly once.

use chrono::{DateTime, Local};

use crate::forms::sanitize::escape_html;
use crate::forms::{
    ComplianceSubmission, ConsultationRequest, QuizSubmission, Section, NOT_PROVIDED,
};

const STYLE: &str = "\
body{font-family:Arial,Helvetica,sans-serif;line-height:1.6;color:#1f2937;background:#f3f4f6;margin:0;padding:0}\
.container{max-width:640px;margin:0 auto;padding:24px}\
.header{background:#0f172a;color:#ffffff;padding:24px;border-radius:8px 8px 0 0}\
.header h1{margin:0;font-size:22px}\
.content{background:#ffffff;padding:24px;border-radius:0 0 8px 8px}\
.section{margin-bottom:24px}\
.section h2{font-size:16px;color:#0f172a;border-bottom:2px solid #22c55e;padding-bottom:4px}\
table{width:100%;border-collapse:collapse}\
td{padding:6px 8px;border-bottom:1px solid #e5e7eb;vertical-align:top}\
td.label{font-weight:bold;width:40%;color:#374151}\
.score{font-size:32px;font-weight:bold;color:#16a34a;margin:0}\
.recommendation{border-left:4px solid #22c55e;padding:8px 16px;margin-bottom:16px;background:#f9fafb}\
.recommendation h3{margin:0 0 8px 0;font-size:16px}\
.message{white-space:pre-wrap;background:#f9fafb;padding:12px;border-radius:4px}\
.footer{text-align:center;font-size:12px;color:#6b7280;margin-top:16px}";

/// Human-readable local time, or the raw text when it is not RFC 3339.
pub fn format_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(ts) => ts
            .with_timezone(&Local)
            .format("%B %-d, %Y at %-I:%M %p")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Collapse line breaks so user text cannot split a header.
fn one_line(value: &str) -> String {
    value
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect()
}

fn or_not_provided(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_PROVIDED
    } else {
        value
    }
}

fn document(title: &str, body: &str) -> String {
    let title = escape_html(title);
    format!(
        "<!DOCTYPE html>\n\
<html lang=\"en\">\n\
<head>\n\
<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
<title>{title}</title>\n\
<style>{STYLE}</style>\n\
</head>\n\
<body>\n\
<div class=\"container\">\n\
<div class=\"header\"><h1>{title}</h1></div>\n\
<div class=\"content\">\n\
{body}\
</div>\n\
<div class=\"footer\">Secure Automations &middot; secureautomations.ai</div>\n\
</div>\n\
</body>\n\
</html>\n"
    )
}

fn section(section: &Section) -> String {
    let mut html = format!(
        "<div class=\"section\">\n<h2>{}</h2>\n<table>\n",
        escape_html(section.title)
    );
    for (label, value) in &section.rows {
        html.push_str(&format!(
            "<tr><td class=\"label\">{}</td><td>{}</td></tr>\n",
            escape_html(label),
            escape_html(or_not_provided(value))
        ));
    }
    html.push_str("</table>\n</div>\n");
    html
}

fn submitted_at(timestamp: Option<&str>) -> String {
    let when = timestamp
        .filter(|t| !t.trim().is_empty())
        .map(format_timestamp)
        .unwrap_or_else(|| NOT_PROVIDED.to_string());
    format!("<p><strong>Submitted:</strong> {}</p>\n", escape_html(&when))
}

pub fn consultation_subject(request: &ConsultationRequest) -> String {
    format!(
        "New Consultation Request from {} ({})",
        one_line(&request.name),
        one_line(&request.company)
    )
}

/// Consultation request, addressed to the sales mailbox.
pub fn consultation(request: &ConsultationRequest) -> String {
    let email = escape_html(or_not_provided(&request.email));
    let mut body = String::from("<p>A new consultation request was submitted on the website.</p>\n");
    body.push_str(&section(&Section::new(
        "Contact Details",
        vec![
            ("Name", request.name.clone()),
            ("Company", request.company.clone()),
        ],
    )));
    body.push_str(&format!(
        "<p><strong>Email:</strong> <a href=\"mailto:{email}\">{email}</a></p>\n"
    ));
    body.push_str(&format!(
        "<div class=\"section\">\n<h2>Message</h2>\n<div class=\"message\">{}</div>\n</div>\n",
        escape_html(or_not_provided(&request.message))
    ));
    document("New Consultation Request", &body)
}

fn rating(score: u8) -> &'static str {
    match score {
        80..=100 => "Strong",
        50..=79 => "Moderate",
        _ => "Needs Attention",
    }
}

pub fn checkup_subject(submission: &ComplianceSubmission) -> String {
    format!(
        "Compliance Checkup Results: {} - Score {}%",
        one_line(&submission.company_name),
        submission.effective_score()
    )
}

/// Compliance checkup results, addressed to the compliance mailbox.
pub fn checkup(submission: &ComplianceSubmission) -> String {
    let score = submission.effective_score();
    let mut body = format!(
        "<div class=\"section\">\n<h2>Readiness Score</h2>\n<p class=\"score\">{score}%</p>\n<p>{}</p>\n</div>\n",
        rating(score)
    );
    for s in submission.sections() {
        body.push_str(&section(&s));
    }
    body.push_str(&submitted_at(submission.timestamp.as_deref()));
    document("Compliance Checkup Submission", &body)
}

pub fn quiz_subject(submission: &QuizSubmission) -> String {
    format!(
        "Your Automation Recommendations - {}",
        one_line(&submission.company)
    )
}

/// Quiz results. The same document goes to the submitter and to sales.
pub fn quiz(submission: &QuizSubmission) -> String {
    let mut body = format!(
        "<p>Hi {},</p>\n<p>Thank you for taking the automation quiz. Based on your answers, \
here are our recommendations for {}:</p>\n",
        escape_html(or_not_provided(&submission.name)),
        escape_html(or_not_provided(&submission.company))
    );

    body.push_str("<div class=\"section\">\n<h2>Recommended Automations</h2>\n");
    for (i, rec) in submission.recommendations.iter().enumerate() {
        body.push_str(&format!(
            "<div class=\"recommendation\">\n<h3>{}. {}</h3>\n<p>{}</p>\n",
            i + 1,
            escape_html(or_not_provided(&rec.name)),
            escape_html(or_not_provided(&rec.description))
        ));
        if !rec.benefits.is_empty() {
            body.push_str("<ul>\n");
            for benefit in &rec.benefits {
                body.push_str(&format!("<li>{}</li>\n", escape_html(benefit)));
            }
            body.push_str("</ul>\n");
        }
        body.push_str("</div>\n");
    }
    body.push_str("</div>\n");

    body.push_str(&section(&Section::new(
        "Contact Information",
        vec![
            ("Name", submission.name.clone()),
            ("Email", submission.email.clone()),
            ("Company", submission.company.clone()),
        ],
    )));
    body.push_str(&section(&submission.answers_section()));
    body.push_str(&submitted_at(submission.timestamp.as_deref()));
    body.push_str(
        "<p>Our team will reach out shortly to discuss how these automations fit your business.</p>\n",
    );
    document("Your Automation Recommendations", &body)
}
