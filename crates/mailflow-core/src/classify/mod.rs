//! Request classification through a language-model service.

pub mod openai;
pub mod taxonomy;

pub use openai::{OpenAiClient, build_request, parse_response};
pub use taxonomy::{REQUEST_TYPES, RequestType, TaxonomyMatch};

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::ClassifierError;
use crate::models::result::ClassificationResult;

/// Result type for classification operations.
pub type Result<T> = std::result::Result<T, ClassifierError>;

/// A text completion service.
///
/// Implementations must be `Send + Sync`; the classifier shares one handle
/// across concurrent requests.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt` and return the generated text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logs.
    fn model_id(&self) -> &str;
}

/// Classifies an email body into the request taxonomy.
#[derive(Clone)]
pub struct RequestClassifier {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl RequestClassifier {
    /// Default upper bound for one classification call.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a classifier over an injected model handle.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Set the timeout for one classification call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Prompt sent for an email body.
    pub fn prompt(email_text: &str) -> String {
        format!(
            "Classify the following email into one of the predefined request types and sub request types. \
             Extract the relevant request type and sub request type.\n\n\
             Request types and their sub request types:\n{}\n\n\
             Email:\n{}\n\n\
             Request Type:",
            taxonomy::describe(),
            email_text
        )
    }

    /// Classify an email body.
    ///
    /// The response is stored trimmed but otherwise as returned; it is not
    /// checked against the taxonomy.
    pub async fn classify(&self, email_text: &str) -> Result<ClassificationResult> {
        let start = Instant::now();
        let prompt = Self::prompt(email_text);
        debug!(
            "Classifying {} chars with {}",
            email_text.len(),
            self.model.model_id()
        );

        let raw = match tokio::time::timeout(self.timeout, self.model.complete(&prompt)).await {
            Ok(reply) => reply,
            Err(_) => Err(ClassifierError::Timeout(self.timeout.as_secs())),
        }
        .inspect_err(|e| warn!("Classification failed: {}", e))?;

        let result = ClassificationResult {
            raw_text: raw.trim().to_string(),
        };

        info!(
            "Classified request in {}ms: {:?}",
            start.elapsed().as_millis(),
            result.raw_text
        );
        Ok(result)
    }
}

impl ClassificationResult {
    /// The taxonomy entry the raw text appears to name, if any.
    pub fn suggested_type(&self) -> Option<TaxonomyMatch> {
        taxonomy::suggest(&self.raw_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        reply: std::result::Result<String, u16>,
        prompts: Mutex<Vec<String>>,
    }

    impl Recording {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for Recording {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(ClassifierError::HttpStatus {
                    status: *status,
                    body: "quota exceeded".to_string(),
                }),
            }
        }

        fn model_id(&self) -> &str {
            "recording"
        }
    }

    struct Stalled;

    #[async_trait]
    impl LanguageModel for Stalled {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }

        fn model_id(&self) -> &str {
            "stalled"
        }
    }

    #[test]
    fn test_prompt_names_taxonomy() {
        let prompt = RequestClassifier::prompt("Please process the fee.");

        for request_type in REQUEST_TYPES {
            assert!(prompt.contains(request_type.name));
            for subtype in request_type.subtypes {
                assert!(prompt.contains(subtype));
            }
        }
        assert!(prompt.contains("Email:\nPlease process the fee."));
        assert!(prompt.ends_with("Request Type:"));
    }

    #[tokio::test]
    async fn test_classify_stores_raw_text() {
        let model = Arc::new(Recording::replying("  Something Unexpected\n"));
        let classifier = RequestClassifier::new(model.clone());

        let result = classifier.classify("body").await.unwrap();

        assert_eq!(result.raw_text, "Something Unexpected");
        assert_eq!(result.suggested_type(), None);
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_classify_empty_reply_is_success() {
        let classifier = RequestClassifier::new(Arc::new(Recording::replying("")));

        let result = classifier.classify("body").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_classify_propagates_failure() {
        let model = Recording {
            reply: Err(429),
            prompts: Mutex::new(Vec::new()),
        };
        let classifier = RequestClassifier::new(Arc::new(model));

        let err = classifier.classify("body").await.unwrap_err();
        assert!(matches!(err, ClassifierError::HttpStatus { status: 429, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_classify_timeout() {
        let classifier =
            RequestClassifier::new(Arc::new(Stalled)).with_timeout(Duration::from_secs(5));

        let err = classifier.classify("body").await.unwrap_err();
        assert!(matches!(err, ClassifierError::Timeout(5)));
    }

    /// Collects formatted log output.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_classify_timeout_is_logged_as_warning() {
        let logs = Captured::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let classifier =
            RequestClassifier::new(Arc::new(Stalled)).with_timeout(Duration::from_secs(5));
        classifier.classify("body").await.unwrap_err();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"), "no warning in {output:?}");
        assert!(output.contains("classification timed out after 5s"));
    }
}
