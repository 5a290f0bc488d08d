//! Inbound request models.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// An inbound request: email body, thread context, and attachments.
///
/// Built by the caller and never modified by the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomingRequest {
    /// Body of the email being processed.
    pub email_text: String,

    /// Earlier messages of the same thread.
    #[serde(default)]
    pub email_thread: String,

    /// Attachments in the order they were declared on the email.
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
}

impl IncomingRequest {
    /// Create a request with no thread context and no attachments.
    pub fn new(email_text: impl Into<String>) -> Self {
        Self {
            email_text: email_text.into(),
            ..Self::default()
        }
    }

    /// Set the thread context.
    pub fn with_thread(mut self, email_thread: impl Into<String>) -> Self {
        self.email_thread = email_thread.into();
        self
    }

    /// Append an attachment.
    pub fn with_attachment(mut self, attachment: AttachmentRef) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Body and thread joined the way the duplicate detector compares them.
    pub fn combined_content(&self) -> String {
        format!("{} {}", self.email_text, self.email_thread)
    }
}

/// Attachment type, decided from the file-name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    /// `.pdf`
    Pdf,
    /// `.docx`
    Docx,
    /// `.jpg`, `.jpeg`, `.png`
    Image,
    /// Anything else. Skipped without an extraction attempt.
    Unknown,
}

impl AttachmentKind {
    /// Infer the kind from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "jpg" | "jpeg" | "png" => Self::Image,
            _ => Self::Unknown,
        }
    }

    /// Whether text extraction is attempted for this kind.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => write!(f, "pdf"),
            Self::Docx => write!(f, "docx"),
            Self::Image => write!(f, "image"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Reference to an attachment on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Location of the attachment.
    pub path: PathBuf,

    /// Declared type.
    pub kind: AttachmentKind,
}

impl AttachmentRef {
    /// Reference an attachment, inferring its kind from the suffix.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = AttachmentKind::from_path(&path);
        Self { path, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_suffix() {
        assert_eq!(AttachmentRef::new("deal_details.pdf").kind, AttachmentKind::Pdf);
        assert_eq!(AttachmentRef::new("payment_terms.docx").kind, AttachmentKind::Docx);
        assert_eq!(AttachmentRef::new("scan.JPG").kind, AttachmentKind::Image);
        assert_eq!(AttachmentRef::new("scan.png").kind, AttachmentKind::Image);
        assert_eq!(AttachmentRef::new("notes.txt").kind, AttachmentKind::Unknown);
        assert_eq!(AttachmentRef::new("README").kind, AttachmentKind::Unknown);
        assert_eq!(AttachmentRef::new("legacy.doc").kind, AttachmentKind::Unknown);
    }

    #[test]
    fn test_combined_content() {
        let request = IncomingRequest::new("Please close deal ABC123")
            .with_thread("Re: Closing Notice Request");

        assert_eq!(
            request.combined_content(),
            "Please close deal ABC123 Re: Closing Notice Request"
        );
    }
}
