//! Attachment text extraction.

mod docx;
#[cfg(feature = "native")]
mod ocr;
mod pdf;

pub use docx::DocxTextExtractor;
#[cfg(feature = "native")]
pub use ocr::OcrTextExtractor;
pub use pdf::PdfTextExtractor;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{DocumentError, OcrError};
use crate::models::config::MailflowConfig;
use crate::models::request::{AttachmentKind, AttachmentRef};

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Turns the raw bytes of one document type into plain text.
pub trait TextExtractor: Send + Sync {
    /// Extract plain text. Fails on unreadable input.
    fn extract_text(&self, data: &[u8]) -> Result<String>;
}

/// Reads attachments from disk and dispatches on their declared kind.
#[derive(Clone)]
pub struct DocumentReader {
    pdf: Arc<dyn TextExtractor>,
    docx: Arc<dyn TextExtractor>,
    image: Option<Arc<dyn TextExtractor>>,
}

impl DocumentReader {
    /// Reader with PDF and DOCX support and no OCR.
    pub fn new() -> Self {
        Self {
            pdf: Arc::new(PdfTextExtractor::new()),
            docx: Arc::new(DocxTextExtractor::new()),
            image: None,
        }
    }

    /// Build a reader from configuration.
    ///
    /// OCR models that fail to load are logged and left out; image
    /// attachments then fail individually instead of failing the reader.
    pub fn from_config(config: &MailflowConfig) -> Self {
        let image = load_ocr(config);

        let mut pdf = PdfTextExtractor::new().with_min_text_length(config.pdf.min_text_length);
        if config.pdf.ocr_fallback {
            if let Some(ocr) = &image {
                pdf = pdf.with_ocr_fallback(Arc::clone(ocr));
            }
        }

        Self {
            pdf: Arc::new(pdf),
            docx: Arc::new(DocxTextExtractor::new()),
            image,
        }
    }

    /// Replace the PDF extractor.
    pub fn with_pdf(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.pdf = extractor;
        self
    }

    /// Replace the DOCX extractor.
    pub fn with_docx(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.docx = extractor;
        self
    }

    /// Set the image (OCR) extractor.
    pub fn with_image(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.image = Some(extractor);
        self
    }

    /// Whether image attachments can be read.
    pub fn has_ocr(&self) -> bool {
        self.image.is_some()
    }

    /// Extract text from an in-memory document of the given kind.
    pub fn extract_bytes(&self, kind: AttachmentKind, data: &[u8]) -> Result<String> {
        let extractor = match kind {
            AttachmentKind::Pdf => &self.pdf,
            AttachmentKind::Docx => &self.docx,
            AttachmentKind::Image => self.image.as_ref().ok_or(OcrError::Unavailable)?,
            AttachmentKind::Unknown => {
                return Err(DocumentError::Unsupported("unknown document type".to_string()));
            }
        };
        extractor.extract_text(data)
    }

    /// Read an attachment from disk and extract its text.
    pub fn read(&self, attachment: &AttachmentRef) -> Result<String> {
        if !attachment.kind.is_supported() {
            return Err(DocumentError::Unsupported(attachment.path.display().to_string()));
        }

        let data = std::fs::read(&attachment.path)?;
        debug!(
            "Read {} bytes from {} ({})",
            data.len(),
            attachment.path.display(),
            attachment.kind
        );

        self.extract_bytes(attachment.kind, &data)
    }
}

impl Default for DocumentReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "native")]
fn load_ocr(config: &MailflowConfig) -> Option<Arc<dyn TextExtractor>> {
    let model_dir = config.ocr.model_dir.as_ref()?;
    match OcrTextExtractor::from_dir(model_dir, &config.ocr) {
        Ok(engine) => Some(Arc::new(engine)),
        Err(e) => {
            warn!("OCR disabled: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "native"))]
fn load_ocr(config: &MailflowConfig) -> Option<Arc<dyn TextExtractor>> {
    if config.ocr.model_dir.is_some() {
        warn!("OCR disabled: built without the `native` feature");
    }
    None
}
