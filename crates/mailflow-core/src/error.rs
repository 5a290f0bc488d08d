//! Error types for the mailflow-core library.

use thiserror::Error;

/// Main error type for the mailflow library.
///
/// Attachment and corpus failures degrade into the result instead, so only
/// a classification failure under the strict policy aborts a request.
#[derive(Error, Debug)]
pub enum MailflowError {
    /// Request classification error.
    #[error("classification error: {0}")]
    Classification(#[from] ClassifierError),
}

/// Errors raised while turning an attachment into plain text.
///
/// None of these abort a request: the pipeline records them against the
/// attachment and moves on.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// File suffix is not one of the recognised attachment types.
    #[error("unsupported attachment: {0}")]
    Unsupported(String),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// DOCX processing error.
    #[error("DOCX error: {0}")]
    Docx(String),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Reading the attachment failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Extraction did not finish within the configured time.
    #[error("extraction timed out after {0}s")]
    Timeout(u64),

    /// The extraction task panicked or was cancelled.
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// No OCR engine is configured or the feature is disabled.
    #[error("OCR engine not available")]
    Unavailable,

    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text detection or recognition failed.
    #[error("recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors from the language-model classification service.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// HTTP transport failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("service returned status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Response did not match the expected schema.
    #[error("response parse error: {0}")]
    Parse(String),

    /// The service did not answer in time.
    #[error("classification timed out after {0}s")]
    Timeout(u64),

    /// No API key was available.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),
}

/// Errors reading the historical corpus.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// Corpus storage could not be read.
    #[error("corpus unavailable: {0}")]
    Io(#[from] std::io::Error),

    /// A corpus record was malformed.
    #[error("invalid corpus record on line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// A writer panicked while holding the corpus lock.
    #[error("corpus lock poisoned")]
    Poisoned,
}

/// Result type for the mailflow library.
pub type Result<T> = std::result::Result<T, MailflowError>;
