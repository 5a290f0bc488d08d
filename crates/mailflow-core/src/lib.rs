//! Core library for email request processing.
//!
//! This crate provides:
//! - Attachment text extraction (PDF with OCR fallback, DOCX, images)
//! - Deal field extraction (deal name, amount, expiration date)
//! - Request classification through a language model
//! - Duplicate detection against a historical corpus
//! - The pipeline that runs all of the above for one request

pub mod classify;
pub mod dedup;
pub mod document;
pub mod error;
pub mod fields;
pub mod models;
pub mod pipeline;

pub use classify::{LanguageModel, OpenAiClient, RequestClassifier};
pub use dedup::{
    CorpusSource, CosineSimilarity, DuplicateCheck, DuplicateDetector, HistoricalCorpus,
    JsonlCorpus, Similarity,
};
pub use document::{DocumentReader, DocxTextExtractor, PdfTextExtractor, TextExtractor};
#[cfg(feature = "native")]
pub use document::OcrTextExtractor;
pub use error::{MailflowError, Result};
pub use fields::{FieldExtractor, extract_fields};
pub use models::{
    AttachmentKind, AttachmentRef, AttachmentReport, AttachmentStatus, ClassificationResult,
    ExtractedFields, IncomingRequest, MailflowConfig, PipelineResult,
};
pub use pipeline::Pipeline;
