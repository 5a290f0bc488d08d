//! Structured field extraction from email and attachment text.
//!
//! Each field is found by a labelled pattern. A value either matches its
//! pattern completely or the field is left unset; the extractor never
//! returns partial values and never fails.

pub mod patterns;

use chrono::NaiveDate;
use tracing::{debug, trace};

use crate::models::result::ExtractedFields;
use patterns::{AMOUNT, AMOUNT_VALUE, DEAL_NAME, EXPIRATION_DATE};

/// Pattern-based extractor for `deal_name`, `amount` and `expiration_date`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldExtractor;

impl FieldExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Fields found in a single text blob.
    pub fn extract(&self, text: &str) -> ExtractedFields {
        let fields = ExtractedFields {
            deal_name: extract_deal_name(text),
            amount: extract_amount(text),
            expiration_date: extract_expiration_date(text),
        };
        trace!("Fields from {} chars: {:?}", text.len(), fields);
        fields
    }

    /// Fields from the body, then each attachment text in order.
    ///
    /// A field set by an earlier source is kept.
    pub fn extract_merged<'a, I>(&self, body: &str, attachment_texts: I) -> ExtractedFields
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut fields = self.extract(body);

        for (index, text) in attachment_texts.into_iter().enumerate() {
            if fields.is_complete() {
                debug!("All fields set, skipping remaining attachments from #{}", index + 1);
                break;
            }
            fields.merge_missing(self.extract(text));
        }

        fields
    }
}

/// Shorthand for [`FieldExtractor::extract`].
pub fn extract_fields(text: &str) -> ExtractedFields {
    FieldExtractor.extract(text)
}

fn extract_deal_name(text: &str) -> Option<String> {
    DEAL_NAME.captures(text).map(|caps| caps[1].to_string())
}

fn extract_amount(text: &str) -> Option<String> {
    AMOUNT
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .find(|value| AMOUNT_VALUE.is_match(value))
}

fn extract_expiration_date(text: &str) -> Option<String> {
    EXPIRATION_DATE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .find(|value| NaiveDate::parse_from_str(value, "%m/%d/%Y").is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_all_fields_from_body() {
        let text = "Hi team, deal name: ABC123 needs closing. The amount: $100,000 \
                    is due and the expiration date: 12/31/2025 applies.";

        assert_eq!(
            extract_fields(text),
            ExtractedFields {
                deal_name: Some("ABC123".to_string()),
                amount: Some("100,000".to_string()),
                expiration_date: Some("12/31/2025".to_string()),
            }
        );
    }

    #[test]
    fn test_missing_labels_are_absent() {
        let text = "We would like to request a closing notice for deal ABC123, \
                    with an amount of $100,000 and an expiration date of 12/31/2025.";

        assert_eq!(extract_fields(text), ExtractedFields::default());
    }

    #[test]
    fn test_labels_case_insensitive() {
        let fields = extract_fields("Deal Name: XYZ9\nAmount: 2500\nExpiration Date: 01/15/2026");

        assert_eq!(fields.deal_name.as_deref(), Some("XYZ9"));
        assert_eq!(fields.amount.as_deref(), Some("2500"));
        assert_eq!(fields.expiration_date.as_deref(), Some("01/15/2026"));
    }

    #[test]
    fn test_deal_name_single_word() {
        let fields = extract_fields("deal name: Project Falcon");
        assert_eq!(fields.deal_name.as_deref(), Some("Project"));
    }

    #[test]
    fn test_amount_formats() {
        assert_eq!(extract_fields("amount: $500").amount.as_deref(), Some("500"));
        assert_eq!(extract_fields("amount: 1234567").amount.as_deref(), Some("1234567"));
        assert_eq!(extract_fields("amount: €1,234,567.89").amount.as_deref(), Some("1,234,567"));
        assert_eq!(extract_fields("amount: $100,000, payable").amount.as_deref(), Some("100,000"));
    }

    #[test]
    fn test_malformed_amount_is_absent() {
        assert_eq!(extract_fields("amount: 1,00").amount, None);
        assert_eq!(extract_fields("amount: 12,3456").amount, None);
        assert_eq!(extract_fields("amount: $").amount, None);
        assert_eq!(extract_fields("amount: TBD").amount, None);
    }

    #[test]
    fn test_first_valid_amount_wins() {
        let fields = extract_fields("amount: 1,00 (typo) corrected amount: 1,000");
        assert_eq!(fields.amount.as_deref(), Some("1,000"));
    }

    #[test]
    fn test_invalid_dates_are_absent() {
        assert_eq!(extract_fields("expiration date: 13/45/2025").expiration_date, None);
        assert_eq!(extract_fields("expiration date: 2025-12-31").expiration_date, None);
        assert_eq!(extract_fields("expiration date: 12/31/20251").expiration_date, None);
        assert_eq!(extract_fields("expiration date: 1/5/2025").expiration_date, None);
    }

    #[test]
    fn test_merge_body_takes_precedence() {
        let extractor = FieldExtractor::new();
        let fields = extractor.extract_merged(
            "amount: $100,000",
            ["amount: $500\ndeal name: FROMPDF", "deal name: FROMDOCX\nexpiration date: 06/30/2026"],
        );

        assert_eq!(
            fields,
            ExtractedFields {
                deal_name: Some("FROMPDF".to_string()),
                amount: Some("100,000".to_string()),
                expiration_date: Some("06/30/2026".to_string()),
            }
        );
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(extract_fields(""), ExtractedFields::default());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let text = "deal name: ABC123 amount: $100,000 expiration date: 12/31/2025";
        assert_eq!(extract_fields(text), extract_fields(text));
    }
}
