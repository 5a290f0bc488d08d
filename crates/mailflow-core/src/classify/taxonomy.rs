//! The fixed request-type taxonomy.

use serde::Serialize;

/// A request type and its subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequestType {
    pub name: &'static str,
    pub subtypes: &'static [&'static str],
}

/// Known request types, in prompt order.
pub const REQUEST_TYPES: &[RequestType] = &[
    RequestType {
        name: "Closing Notice",
        subtypes: &["Reallocation Fees", "Amendment Fees", "Reallocation Principal"],
    },
    RequestType {
        name: "Fee Payment",
        subtypes: &["Ongoing Fee", "Letter of Credit Fee"],
    },
    RequestType {
        name: "Money Movement - Outbound",
        subtypes: &["Timebound", "Foreign Currency"],
    },
];

/// A taxonomy entry mentioned in a free-form classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaxonomyMatch {
    pub request_type: &'static str,
    pub subtype: Option<&'static str>,
}

/// Render the taxonomy as an indented list for the prompt.
pub fn describe() -> String {
    REQUEST_TYPES
        .iter()
        .map(|t| format!("- {}: {}", t.name, t.subtypes.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Find the first known request type named in `text`, and a subtype of it
/// if one is named too. Case-insensitive.
///
/// Advisory only: the stored classification keeps the raw text.
pub fn suggest(text: &str) -> Option<TaxonomyMatch> {
    let lowered = text.to_lowercase();

    REQUEST_TYPES
        .iter()
        .filter_map(|t| lowered.find(&t.name.to_lowercase()).map(|pos| (pos, t)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, t)| TaxonomyMatch {
            request_type: t.name,
            subtype: t
                .subtypes
                .iter()
                .copied()
                .find(|s| lowered.contains(&s.to_lowercase())),
        })
}
