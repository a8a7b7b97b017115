//! Compliance checkup form and its readiness score.
//!
//! Most answers are categorical strings ("Yes", "No", "Partially", or a
//! choice from a dropdown). A subset of them is weighted; the weighted sum
//! of their credit is the readiness score.

use serde::{Deserialize, Serialize};

use crate::error::InvalidSubmission;
use crate::forms::sanitize::{is_valid_email, normalize};
use crate::forms::{
    is_blank, list_skipping_nulls, normalize_email, null_as_default, FormKind, FormSubmission,
    Section, LONG_TEXT_MAX, NOT_PROVIDED, SHORT_TEXT_MAX,
};

/// Most certifications a single submission may list.
const MAX_CERTIFICATIONS: usize = 20;

/// Result of the compliance checkup questionnaire.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ComplianceSubmission {
    // Company
    #[serde(deserialize_with = "null_as_default")]
    pub company_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub contact_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub work_email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(deserialize_with = "null_as_default")]
    pub industry: String,
    #[serde(deserialize_with = "null_as_default")]
    pub company_size: String,
    #[serde(deserialize_with = "null_as_default")]
    pub role: String,

    // Data protection
    #[serde(deserialize_with = "null_as_default")]
    pub sensitive_data_types: String,
    #[serde(deserialize_with = "null_as_default")]
    pub data_encryption: String,
    #[serde(deserialize_with = "null_as_default")]
    pub access_controls: String,
    #[serde(deserialize_with = "null_as_default")]
    pub mfa_enabled: String,
    #[serde(deserialize_with = "null_as_default")]
    pub password_manager: String,

    // Policies and training
    #[serde(deserialize_with = "null_as_default")]
    pub security_policy: String,
    #[serde(deserialize_with = "null_as_default")]
    pub incident_response_plan: String,
    #[serde(deserialize_with = "null_as_default")]
    pub security_training: String,
    #[serde(deserialize_with = "null_as_default")]
    pub vendor_risk_management: String,
    #[serde(deserialize_with = "null_as_default")]
    pub data_retention_policy: String,

    // Operations
    #[serde(deserialize_with = "null_as_default")]
    pub backup_strategy: String,
    #[serde(deserialize_with = "null_as_default")]
    pub backup_testing: String,
    #[serde(deserialize_with = "null_as_default")]
    pub patch_management: String,
    #[serde(deserialize_with = "null_as_default")]
    pub endpoint_protection: String,
    #[serde(deserialize_with = "null_as_default")]
    pub log_monitoring: String,
    #[serde(deserialize_with = "null_as_default")]
    pub network_segmentation: String,

    // Compliance readiness
    #[serde(deserialize_with = "null_as_default")]
    pub compliance_frameworks: String,
    #[serde(deserialize_with = "null_as_default")]
    pub previous_audit: String,
    #[serde(deserialize_with = "null_as_default")]
    pub audit_readiness: String,
    #[serde(deserialize_with = "null_as_default")]
    pub compliance_tracking: String,
    #[serde(deserialize_with = "null_as_default")]
    pub automation_interest: String,

    // Planning
    #[serde(deserialize_with = "null_as_default")]
    pub timeline: String,
    #[serde(deserialize_with = "null_as_default")]
    pub budget: String,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: String,

    #[serde(deserialize_with = "list_skipping_nulls")]
    pub certifications: Vec<String>,

    /// Score computed by the browser, if any.
    pub score: Option<f64>,

    /// ISO 8601 submission time from the browser.
    pub timestamp: Option<String>,
}

/// Credit earned by a single categorical answer, in [0, 1].
fn credit(answer: &str) -> f64 {
    let answer = answer.trim();
    if answer.eq_ignore_ascii_case("yes") {
        1.0
    } else if answer.eq_ignore_ascii_case("partially") {
        0.5
    } else {
        0.0
    }
}

impl ComplianceSubmission {
    /// Weighted readiness score in 0..=100.
    pub fn calculate_score(&self) -> u8 {
        let total: f64 = self
            .weighted_answers()
            .iter()
            .map(|(answer, weight)| credit(answer) * f64::from(*weight))
            .sum();
        total.round().clamp(0.0, 100.0) as u8
    }

    /// Weighted answers and their share of the score. Weights sum to 100.
    fn weighted_answers(&self) -> [(&str, u32); 14] {
        [
            (self.data_encryption.as_str(), 10),
            (self.access_controls.as_str(), 10),
            (self.mfa_enabled.as_str(), 10),
            (self.password_manager.as_str(), 5),
            (self.security_policy.as_str(), 8),
            (self.incident_response_plan.as_str(), 8),
            (self.security_training.as_str(), 7),
            (self.vendor_risk_management.as_str(), 5),
            (self.data_retention_policy.as_str(), 5),
            (self.backup_strategy.as_str(), 8),
            (self.backup_testing.as_str(), 5),
            (self.patch_management.as_str(), 7),
            (self.endpoint_protection.as_str(), 6),
            (self.log_monitoring.as_str(), 6),
        ]
    }

    /// Score reported in the email: the browser's value when it is a sane
    /// percentage, otherwise recomputed from the answers.
    pub fn effective_score(&self) -> u8 {
        match self.score {
            Some(score) if score.is_finite() && (0.0..=100.0).contains(&score) => score.round() as u8,
            _ => self.calculate_score(),
        }
    }

    /// Fixed, ordered sections for rendering.
    pub fn sections(&self) -> Vec<Section> {
        fn v(value: &str) -> String {
            if is_blank(value) {
                NOT_PROVIDED.to_string()
            } else {
                value.to_string()
            }
        }

        vec![
            Section::new(
                "Company Information",
                vec![
                    ("Company Name", v(&self.company_name)),
                    ("Contact Name", v(&self.contact_name)),
                    ("Work Email", v(&self.work_email)),
                    ("Phone", v(&self.phone)),
                    ("Industry", v(&self.industry)),
                    ("Company Size", v(&self.company_size)),
                    ("Role", v(&self.role)),
                ],
            ),
            Section::new(
                "Data Protection",
                vec![
                    ("Sensitive Data Handled", v(&self.sensitive_data_types)),
                    ("Data Encryption", v(&self.data_encryption)),
                    ("Access Controls", v(&self.access_controls)),
                    ("Multi-Factor Authentication", v(&self.mfa_enabled)),
                    ("Password Manager", v(&self.password_manager)),
                ],
            ),
            Section::new(
                "Policies & Training",
                vec![
                    ("Written Security Policy", v(&self.security_policy)),
                    ("Incident Response Plan", v(&self.incident_response_plan)),
                    ("Security Awareness Training", v(&self.security_training)),
                    ("Vendor Risk Management", v(&self.vendor_risk_management)),
                    ("Data Retention Policy", v(&self.data_retention_policy)),
                ],
            ),
            Section::new(
                "Operations",
                vec![
                    ("Backup Strategy", v(&self.backup_strategy)),
                    ("Backup Restore Testing", v(&self.backup_testing)),
                    ("Patch Management", v(&self.patch_management)),
                    ("Endpoint Protection", v(&self.endpoint_protection)),
                    ("Log Monitoring", v(&self.log_monitoring)),
                    ("Network Segmentation", v(&self.network_segmentation)),
                ],
            ),
            Section::new(
                "Compliance Readiness",
                vec![
                    ("Target Frameworks", v(&self.compliance_frameworks)),
                    ("Current Certifications", v(&self.certifications.join(", "))),
                    ("Previous Audit", v(&self.previous_audit)),
                    ("Audit Readiness", v(&self.audit_readiness)),
                    ("Compliance Tracking", v(&self.compliance_tracking)),
                    ("Interest in Automation", v(&self.automation_interest)),
                ],
            ),
            Section::new(
                "Planning",
                vec![
                    ("Timeline", v(&self.timeline)),
                    ("Budget", v(&self.budget)),
                    ("Additional Notes", v(&self.notes)),
                ],
            ),
        ]
    }

    fn short_fields_mut(&mut self) -> [&mut String; 29] {
        [
            &mut self.company_name,
            &mut self.contact_name,
            &mut self.phone,
            &mut self.industry,
            &mut self.company_size,
            &mut self.role,
            &mut self.sensitive_data_types,
            &mut self.data_encryption,
            &mut self.access_controls,
            &mut self.mfa_enabled,
            &mut self.password_manager,
            &mut self.security_policy,
            &mut self.incident_response_plan,
            &mut self.security_training,
            &mut self.vendor_risk_management,
            &mut self.data_retention_policy,
            &mut self.backup_strategy,
            &mut self.backup_testing,
            &mut self.patch_management,
            &mut self.endpoint_protection,
            &mut self.log_monitoring,
            &mut self.network_segmentation,
            &mut self.compliance_frameworks,
            &mut self.previous_audit,
            &mut self.audit_readiness,
            &mut self.compliance_tracking,
            &mut self.automation_interest,
            &mut self.timeline,
            &mut self.budget,
        ]
    }
}

impl FormSubmission for ComplianceSubmission {
    const KIND: FormKind = FormKind::Checkup;

    fn validate(&self) -> Result<(), InvalidSubmission> {
        if is_blank(&self.company_name) || is_blank(&self.work_email) {
            return Err(InvalidSubmission::MissingFields);
        }
        if !is_valid_email(self.work_email.trim()) {
            return Err(InvalidSubmission::InvalidEmail);
        }
        Ok(())
    }

    fn normalize(&mut self) {
        for field in self.short_fields_mut() {
            *field = normalize(field, SHORT_TEXT_MAX);
        }
        self.work_email = normalize_email(&self.work_email);
        self.notes = normalize(&self.notes, LONG_TEXT_MAX);
        self.certifications = self
            .certifications
            .iter()
            .map(|c| normalize(c, SHORT_TEXT_MAX))
            .filter(|c| !c.is_empty())
            .take(MAX_CERTIFICATIONS)
            .collect();
        self.timestamp = self.timestamp.as_deref().map(|t| normalize(t, 64));
    }
}
