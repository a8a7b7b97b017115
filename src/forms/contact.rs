//! Consultation request form.

use serde::{Deserialize, Serialize};

use crate::error::InvalidSubmission;
use crate::forms::sanitize::{is_valid_email, normalize};
use crate::forms::{
    is_blank, normalize_email, null_as_default, FormKind, FormSubmission, LONG_TEXT_MAX,
    SHORT_TEXT_MAX,
};

/// A "book a consultation" request from the landing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsultationRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub company: String,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
}

impl FormSubmission for ConsultationRequest {
    const KIND: FormKind = FormKind::Consultation;

    fn validate(&self) -> Result<(), InvalidSubmission> {
        if [&self.name, &self.email, &self.company, &self.message]
            .iter()
            .any(|v| is_blank(v))
        {
            return Err(InvalidSubmission::MissingFields);
        }
        if !is_valid_email(self.email.trim()) {
            return Err(InvalidSubmission::InvalidEmail);
        }
        Ok(())
    }

    fn normalize(&mut self) {
        self.name = normalize(&self.name, SHORT_TEXT_MAX);
        self.email = normalize_email(&self.email);
        self.company = normalize(&self.company, SHORT_TEXT_MAX);
        self.message = normalize(&self.message, LONG_TEXT_MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ConsultationRequest {
        ConsultationRequest {
            name: "Ada Lovelace".into(),
            email: "Ada@Example.COM ".into(),
            company: "Analytical Engines".into(),
            message: "We need help automating invoices.".into(),
        }
    }

    #[test]
    fn test_valid_request() {
        assert_eq!(request().validate(), Ok(()));
    }

    #[test]
    fn test_blank_field_is_missing() {
        let mut req = request();
        req.message = "   ".into();
        assert_eq!(req.validate(), Err(InvalidSubmission::MissingFields));
    }

    #[test]
    fn test_missing_fields_win_over_bad_email() {
        let req = ConsultationRequest {
            email: "nope".into(),
            ..Default::default()
        };
        assert_eq!(req.validate(), Err(InvalidSubmission::MissingFields));
    }

    #[test]
    fn test_bad_email() {
        let mut req = request();
        req.email = "ada-at-example.com".into();
        assert_eq!(req.validate(), Err(InvalidSubmission::InvalidEmail));
    }

    #[test]
    fn test_normalize_lowercases_email_and_caps_fields() {
        let mut req = request();
        req.name = format!("  {}  ", "n".repeat(300));
        req.normalize();
        assert_eq!(req.email, "ada@example.com");
        assert_eq!(req.name.chars().count(), SHORT_TEXT_MAX);
    }

    #[test]
    fn test_deserialize_tolerates_missing_keys() {
        let req: ConsultationRequest = serde_json::from_str(r#"{"name":"Ada"}"#).unwrap();
        assert_eq!(req.name, "Ada");
        assert!(req.message.is_empty());
    }

    #[test]
    fn test_null_reads_as_missing() {
        let req: ConsultationRequest = serde_json::from_str(
            r#"{"name":"Ada","email":"ada@example.com","company":"Acme","message":null}"#,
        )
        .unwrap();
        assert!(req.message.is_empty());
        assert_eq!(req.validate(), Err(InvalidSubmission::MissingFields));
    }
}
