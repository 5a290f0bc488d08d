//! Pipeline output models.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::request::AttachmentKind;

/// Structured fields pulled from the email body and attachments.
///
/// Always serializes all three keys; a field that was not found is `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    /// Deal identifier following a `deal name:` label.
    pub deal_name: Option<String>,

    /// Amount following an `amount:` label, without currency symbol.
    pub amount: Option<String>,

    /// `MM/DD/YYYY` date following an `expiration date:` label.
    pub expiration_date: Option<String>,
}

impl ExtractedFields {
    /// Field names in output order.
    pub const NAMES: [&'static str; 3] = ["deal_name", "amount", "expiration_date"];

    /// Fill fields that are still unset from a later source.
    ///
    /// Fields already set are never overwritten.
    pub fn merge_missing(&mut self, later: ExtractedFields) {
        if self.deal_name.is_none() {
            self.deal_name = later.deal_name;
        }
        if self.amount.is_none() {
            self.amount = later.amount;
        }
        if self.expiration_date.is_none() {
            self.expiration_date = later.expiration_date;
        }
    }

    /// Whether every field has a value.
    pub fn is_complete(&self) -> bool {
        self.deal_name.is_some() && self.amount.is_some() && self.expiration_date.is_some()
    }
}

/// Raw output of the classification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Trimmed response text, stored as returned.
    pub raw_text: String,
}

impl ClassificationResult {
    /// Whether the service returned nothing usable.
    pub fn is_empty(&self) -> bool {
        self.raw_text.trim().is_empty()
    }
}

/// What happened to one attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttachmentStatus {
    /// Text was extracted and scanned for fields.
    Extracted { chars: usize },
    /// Suffix not recognised; skipped.
    Unsupported,
    /// Extraction failed; the attachment contributed nothing.
    Failed { reason: String },
}

/// Per-attachment outcome, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentReport {
    /// Attachment location.
    pub path: PathBuf,
    /// Declared type.
    pub kind: AttachmentKind,
    /// Outcome.
    #[serde(flatten)]
    pub status: AttachmentStatus,
}

/// Terminal result of processing one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Classification output; `None` when the service failed.
    pub classification: Option<ClassificationResult>,

    /// Why classification failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification_error: Option<String>,

    /// Merged fields from body and attachments.
    pub fields: ExtractedFields,

    /// Whether the request looks like a duplicate of a past one.
    pub is_duplicate: bool,

    /// Human-readable duplicate decision.
    pub duplicate_reason: String,

    /// Highest similarity seen against the corpus.
    pub max_similarity: f64,

    /// Why the duplicate check could not run, if it could not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_error: Option<String>,

    /// Attachment outcomes in declaration order.
    pub attachments: Vec<AttachmentReport>,

    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl PipelineResult {
    /// Whether any stage degraded instead of completing.
    pub fn has_errors(&self) -> bool {
        self.classification_error.is_some()
            || self.duplicate_error.is_some()
            || self
                .attachments
                .iter()
                .any(|a| matches!(a.status, AttachmentStatus::Failed { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_keeps_first_found() {
        let mut fields = ExtractedFields {
            amount: Some("100,000".to_string()),
            ..Default::default()
        };

        fields.merge_missing(ExtractedFields {
            deal_name: Some("ABC123".to_string()),
            amount: Some("500".to_string()),
            expiration_date: None,
        });

        assert_eq!(
            fields,
            ExtractedFields {
                deal_name: Some("ABC123".to_string()),
                amount: Some("100,000".to_string()),
                expiration_date: None,
            }
        );
        assert!(!fields.is_complete());
    }

    #[test]
    fn test_fields_serialize_all_keys() {
        let fields = ExtractedFields {
            deal_name: Some("ABC123".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_value(&fields).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), 3);
        for name in ExtractedFields::NAMES {
            assert!(object.contains_key(name), "missing key {name}");
        }
        assert_eq!(json["deal_name"], "ABC123");
        assert!(json["amount"].is_null());
        assert!(json["expiration_date"].is_null());
    }

    #[test]
    fn test_attachment_report_serialization() {
        let report = AttachmentReport {
            path: PathBuf::from("terms.docx"),
            kind: AttachmentKind::Docx,
            status: AttachmentStatus::Failed {
                reason: "bad zip".to_string(),
            },
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "docx");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "bad zip");
    }
}
