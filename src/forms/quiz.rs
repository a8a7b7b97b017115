//! Automation quiz results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InvalidSubmission;
use crate::forms::sanitize::{is_valid_email, normalize};
use crate::forms::{
    is_blank, list_skipping_nulls, normalize_email, null_as_default, FormKind, FormSubmission,
    Section, NOT_PROVIDED, SHORT_TEXT_MAX,
};

const DESCRIPTION_MAX: usize = 1000;
const BENEFIT_MAX: usize = 500;
const ANSWER_MAX: usize = 500;
const MAX_RECOMMENDATIONS: usize = 10;
const MAX_BENEFITS: usize = 10;
const MAX_ANSWER_ITEMS: usize = 20;

/// Questions shown in the results email, in display order.
pub const QUESTIONS: &[(&str, &str)] = &[
    ("industry", "Industry"),
    ("company_size", "Company Size"),
    ("role", "Your Role"),
    ("manual_hours", "Hours Spent on Manual Tasks Weekly"),
    ("pain_points", "Biggest Operational Pain Points"),
    ("current_tools", "Current Tools"),
    ("automation_experience", "Automation Experience"),
    ("priority_areas", "Priority Areas"),
    ("timeline", "Implementation Timeline"),
    ("budget", "Budget Range"),
];

/// One automation the quiz recommends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Recommendation {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "list_skipping_nulls")]
    pub benefits: Vec<String>,
}

/// Quiz answers plus the recommendations computed in the browser.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QuizSubmission {
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub company: String,
    #[serde(deserialize_with = "list_skipping_nulls")]
    pub recommendations: Vec<Recommendation>,
    /// Question id → answer (string, number, or list of strings).
    #[serde(deserialize_with = "null_as_default")]
    pub details: BTreeMap<String, Value>,
    pub timestamp: Option<String>,
}

impl QuizSubmission {
    /// The "Your Answers" section, one row per known question.
    pub fn answers_section(&self) -> Section {
        let rows = QUESTIONS
            .iter()
            .map(|(id, label)| {
                let value = self.details.get(*id).map(display_answer).unwrap_or_default();
                let value = if is_blank(&value) {
                    NOT_PROVIDED.to_string()
                } else {
                    value
                };
                (*label, value)
            })
            .collect();
        Section::new("Your Answers", rows)
    }
}

/// Flatten a JSON answer into display text.
fn display_answer(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_answer)
            .filter(|s| !is_blank(s))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Trim and cap every string inside an answer.
fn normalize_answer(value: &mut Value) {
    match value {
        Value::String(s) => *s = normalize(s, ANSWER_MAX),
        Value::Array(items) => {
            items.truncate(MAX_ANSWER_ITEMS);
            items.iter_mut().for_each(normalize_answer);
        }
        Value::Object(map) => map.values_mut().for_each(normalize_answer),
        _ => {}
    }
}

impl FormSubmission for QuizSubmission {
    const KIND: FormKind = FormKind::Quiz;

    fn validate(&self) -> Result<(), InvalidSubmission> {
        if is_blank(&self.name)
            || is_blank(&self.email)
            || is_blank(&self.company)
            || self.recommendations.is_empty()
        {
            return Err(InvalidSubmission::MissingFields);
        }
        if !is_valid_email(self.email.trim()) {
            return Err(InvalidSubmission::InvalidEmail);
        }
        Ok(())
    }

    fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
        self.name = normalize(&self.name, SHORT_TEXT_MAX);
        self.company = normalize(&self.company, SHORT_TEXT_MAX);

        self.recommendations.truncate(MAX_RECOMMENDATIONS);
        for rec in &mut self.recommendations {
            rec.name = normalize(&rec.name, SHORT_TEXT_MAX);
            rec.description = normalize(&rec.description, DESCRIPTION_MAX);
            rec.benefits = rec
                .benefits
                .iter()
                .map(|b| normalize(b, BENEFIT_MAX))
                .filter(|b| !b.is_empty())
                .take(MAX_BENEFITS)
                .collect();
        }

        self.details.values_mut().for_each(normalize_answer);
        self.timestamp = self.timestamp.as_deref().map(|t| normalize(t, 64));
    }
}
