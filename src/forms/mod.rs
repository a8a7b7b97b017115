//! Website form submissions.
//!
//! # Data Flow
//! ```text
//! JSON body
//!     → serde (every field optional at parse time; `null` reads as absent)
//!     → FormSubmission::validate (required fields, email syntax)
//!     → FormSubmission::normalize (trim, length caps, lower-cased email)
//!     → mail::render
//! ```
//!
//! # Design Decisions
//! - No schema library: required-field checks are explicit per form
//! - Normalized values are not HTML-escaped; the renderer escapes once

pub mod checkup;
pub mod contact;
pub mod quiz;
pub mod sanitize;

pub use checkup::ComplianceSubmission;
pub use contact::ConsultationRequest;
pub use quiz::{QuizSubmission, Recommendation};

use serde::{Deserialize, Deserializer};

use crate::error::InvalidSubmission;

/// Cap for names, companies and categorical answers.
pub const SHORT_TEXT_MAX: usize = 200;

/// Cap for free-text messages and notes.
pub const LONG_TEXT_MAX: usize = 5000;

/// Rendered in place of empty values.
pub const NOT_PROVIDED: &str = "Not provided";

/// The three forms the site submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    Consultation,
    Checkup,
    Quiz,
}

impl FormKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormKind::Consultation => "consultation",
            FormKind::Checkup => "checkup",
            FormKind::Quiz => "quiz",
        }
    }
}

/// Behaviour shared by every submission type.
pub trait FormSubmission {
    const KIND: FormKind;

    /// Reject the submission before any network call is made.
    fn validate(&self) -> Result<(), InvalidSubmission>;

    /// Trim and cap every free-text field in place.
    fn normalize(&mut self);
}

/// A titled group of label/value rows in a rendered email.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: &'static str,
    pub rows: Vec<(&'static str, String)>,
}

impl Section {
    pub fn new(title: &'static str, rows: Vec<(&'static str, String)>) -> Self {
        Self { title, rows }
    }
}

/// True when the value is empty after trimming.
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Normalize an email address: trim, cap, lower-case.
pub(crate) fn normalize_email(value: &str) -> String {
    sanitize::normalize(value, sanitize::MAX_EMAIL_LEN).to_lowercase()
}

/// Read `null` as the field's default, the same as an absent key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Read a list where the list itself or any item may be `null`.
/// Null items are dropped.
pub(crate) fn list_skipping_nulls<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?;
    Ok(items.into_iter().flatten().flatten().collect())
}
