//! Request pipeline: classification, field extraction and duplicate detection.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::classify::{LanguageModel, RequestClassifier};
use crate::dedup::{CorpusSource, DuplicateCheck, DuplicateDetector, UNAVAILABLE_REASON};
use crate::document::DocumentReader;
use crate::error::{DocumentError, MailflowError, Result};
use crate::fields::FieldExtractor;
use crate::models::config::MailflowConfig;
use crate::models::request::{AttachmentRef, IncomingRequest};
use crate::models::result::{AttachmentReport, AttachmentStatus, ExtractedFields, PipelineResult};

/// Sequences the pipeline stages for one request at a time.
///
/// Holds no per-request state; one instance can serve concurrent requests.
#[derive(Clone)]
pub struct Pipeline {
    reader: DocumentReader,
    fields: FieldExtractor,
    classifier: RequestClassifier,
    detector: DuplicateDetector,
    attachment_timeout: Duration,
    fail_on_classification_error: bool,
}

impl Pipeline {
    /// Default upper bound for extracting one attachment.
    pub const DEFAULT_ATTACHMENT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Pipeline with default extractors and detector.
    pub fn new(classifier: RequestClassifier) -> Self {
        Self {
            reader: DocumentReader::new(),
            fields: FieldExtractor::new(),
            classifier,
            detector: DuplicateDetector::new(),
            attachment_timeout: Self::DEFAULT_ATTACHMENT_TIMEOUT,
            fail_on_classification_error: false,
        }
    }

    /// Pipeline configured from `config`, classifying with `model`.
    pub fn from_config(config: &MailflowConfig, model: Arc<dyn LanguageModel>) -> Self {
        let classifier = RequestClassifier::new(model)
            .with_timeout(Duration::from_secs(config.classifier.timeout_secs));

        Self::new(classifier)
            .with_reader(DocumentReader::from_config(config))
            .with_detector(DuplicateDetector::new().with_threshold(config.dedup.threshold))
            .with_attachment_timeout(Duration::from_secs(config.extraction.attachment_timeout_secs))
            .with_fail_on_classification_error(config.pipeline.fail_on_classification_error)
    }

    /// Replace the attachment reader.
    pub fn with_reader(mut self, reader: DocumentReader) -> Self {
        self.reader = reader;
        self
    }

    /// Replace the duplicate detector.
    pub fn with_detector(mut self, detector: DuplicateDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Set the per-attachment extraction timeout.
    pub fn with_attachment_timeout(mut self, timeout: Duration) -> Self {
        self.attachment_timeout = timeout;
        self
    }

    /// Fail the request when classification fails, instead of flagging it.
    pub fn with_fail_on_classification_error(mut self, fail: bool) -> Self {
        self.fail_on_classification_error = fail;
        self
    }

    /// Process a request from its parts.
    pub async fn process_parts(
        &self,
        email_text: &str,
        email_thread: &str,
        attachments: &[AttachmentRef],
        corpus: Arc<dyn CorpusSource>,
    ) -> Result<PipelineResult> {
        let request = IncomingRequest {
            email_text: email_text.to_string(),
            email_thread: email_thread.to_string(),
            attachments: attachments.to_vec(),
        };
        self.process(&request, corpus).await
    }

    /// Process one request.
    ///
    /// Classification and field extraction run concurrently. Attachment
    /// failures are recorded and skipped. A classification failure is
    /// flagged on the result unless the pipeline is set to fail on it. An
    /// unreadable corpus is flagged and reported as not duplicate.
    pub async fn process(
        &self,
        request: &IncomingRequest,
        corpus: Arc<dyn CorpusSource>,
    ) -> Result<PipelineResult> {
        let start = Instant::now();
        info!(
            "Processing request: {} chars body, {} chars thread, {} attachments",
            request.email_text.len(),
            request.email_thread.len(),
            request.attachments.len()
        );

        let (classified, (fields, attachments)) = tokio::join!(
            self.classifier.classify(&request.email_text),
            self.extract_fields(request)
        );

        let (classification, classification_error) = match classified {
            Ok(classification) => (Some(classification), None),
            Err(e) if self.fail_on_classification_error => {
                return Err(MailflowError::Classification(e));
            }
            Err(e) => {
                warn!("Continuing without classification: {}", e);
                (None, Some(e.to_string()))
            }
        };

        let content = request.combined_content();
        let (is_duplicate, duplicate_reason, max_similarity, duplicate_error) =
            match self.check_duplicate(content, corpus).await {
                Ok(check) => (check.is_duplicate, check.reason, check.max_similarity, None),
                Err(reason) => {
                    warn!("Skipping duplicate check: {}", reason);
                    (false, UNAVAILABLE_REASON.to_string(), 0.0, Some(reason))
                }
            };

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Request processed in {}ms (duplicate: {})",
            processing_time_ms, is_duplicate
        );

        Ok(PipelineResult {
            classification,
            classification_error,
            fields,
            is_duplicate,
            duplicate_reason,
            max_similarity,
            duplicate_error,
            attachments,
            processing_time_ms,
        })
    }

    /// Corpus read and scoring run on a blocking task.
    async fn check_duplicate(
        &self,
        content: String,
        corpus: Arc<dyn CorpusSource>,
    ) -> std::result::Result<DuplicateCheck, String> {
        let detector = self.detector.clone();
        match tokio::task::spawn_blocking(move || detector.check(&content, corpus.as_ref())).await {
            Ok(Ok(check)) => Ok(check),
            Ok(Err(e)) => Err(e.to_string()),
            Err(join_error) => Err(format!("duplicate check task failed: {}", join_error)),
        }
    }

    /// Fields from the body and every attachment, merged first-found-wins
    /// in declaration order, plus one report per attachment.
    pub async fn extract_fields(
        &self,
        request: &IncomingRequest,
    ) -> (ExtractedFields, Vec<AttachmentReport>) {
        let texts = self.read_attachments(&request.attachments).await;

        let mut reports = Vec::with_capacity(texts.len());
        let mut attachment_texts = Vec::new();
        for (attachment, outcome) in request.attachments.iter().zip(texts) {
            let status = match outcome {
                Ok(Some(text)) => {
                    let status = AttachmentStatus::Extracted { chars: text.len() };
                    attachment_texts.push(text);
                    status
                }
                Ok(None) => AttachmentStatus::Unsupported,
                Err(e) => {
                    warn!("Skipping attachment {}: {}", attachment.path.display(), e);
                    AttachmentStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            reports.push(AttachmentReport {
                path: attachment.path.clone(),
                kind: attachment.kind,
                status,
            });
        }

        let fields = self.fields.extract_merged(
            &request.email_text,
            attachment_texts.iter().map(String::as_str),
        );
        (fields, reports)
    }

    /// Extract every attachment in parallel; results keep declaration order.
    ///
    /// `Ok(None)` marks an unsupported attachment.
    async fn read_attachments(
        &self,
        attachments: &[AttachmentRef],
    ) -> Vec<std::result::Result<Option<String>, DocumentError>> {
        join_all(attachments.iter().map(|attachment| async move {
            if !attachment.kind.is_supported() {
                debug!("Unsupported attachment skipped: {}", attachment.path.display());
                return Ok(None);
            }
            self.read_attachment(attachment).await.map(Some)
        }))
        .await
    }

    async fn read_attachment(
        &self,
        attachment: &AttachmentRef,
    ) -> std::result::Result<String, DocumentError> {
        let reader = self.reader.clone();
        let owned = attachment.clone();
        let task = tokio::task::spawn_blocking(move || reader.read(&owned));

        match tokio::time::timeout(self.attachment_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(DocumentError::Task(join_error.to_string())),
            Err(_) => Err(DocumentError::Timeout(self.attachment_timeout.as_secs())),
        }
    }
}
