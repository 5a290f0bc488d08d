//! Label patterns for request field extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // "deal name: ABC123" - a single word after the label
    pub static ref DEAL_NAME: Regex = Regex::new(
        r"(?i)\bdeal\s+name\s*:\s*(\w+)"
    ).unwrap();

    // "amount: $100,000" - optional currency symbol, digits and commas ending in a digit
    pub static ref AMOUNT: Regex = Regex::new(
        r"(?i)\bamount\s*:\s*[$€£¥]?\s*(\d(?:[\d,]*\d)?)"
    ).unwrap();

    // Plain digits or well-formed thousands grouping
    pub static ref AMOUNT_VALUE: Regex = Regex::new(
        r"^(?:\d+|\d{1,3}(?:,\d{3})+)$"
    ).unwrap();

    // "expiration date: 12/31/2025"
    pub static ref EXPIRATION_DATE: Regex = Regex::new(
        r"(?i)\bexpiration\s+date\s*:\s*(\d{2}/\d{2}/\d{4})\b"
    ).unwrap();
}
