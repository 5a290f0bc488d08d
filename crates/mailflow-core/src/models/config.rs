//! Configuration structures for the request pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the mailflow pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MailflowConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Attachment extraction configuration.
    pub extraction: ExtractionConfig,

    /// Classification service configuration.
    pub classifier: ClassifierConfig,

    /// Duplicate detection configuration.
    pub dedup: DedupConfig,

    /// Failure policy.
    pub pipeline: PipelineConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory holding `det.onnx`, `latin_rec.onnx` and `latin_dict.txt`.
    /// Images are not OCR'd when unset.
    pub model_dir: Option<PathBuf>,

    /// Keep `[UNK]` markers in recognised text.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            keep_unk: false,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// OCR embedded page images when a PDF has too little text.
    pub ocr_fallback: bool,

    /// Minimum text length to consider PDF as text-based.
    pub min_text_length: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            ocr_fallback: true,
            min_text_length: 50,
        }
    }
}

/// Attachment extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Upper bound for extracting a single attachment, in seconds.
    pub attachment_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            attachment_timeout_secs: 60,
        }
    }
}

/// Classification service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Chat completions endpoint.
    pub api_base: String,

    /// Model identifier.
    pub model: String,

    /// Maximum completion tokens.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,

    /// Upper bound for one classification call, in seconds.
    pub timeout_secs: u64,

    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 150,
            temperature: 0.7,
            timeout_secs: 30,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// Duplicate detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// A request is a duplicate when its best similarity is strictly above this.
    pub threshold: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { threshold: 0.8 }
    }
}

/// Failure policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fail the whole request when classification fails instead of
    /// returning the remaining results with an error flag.
    pub fail_on_classification_error: bool,
}

impl MailflowConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: MailflowConfig =
            serde_json::from_str(r#"{ "dedup": { "threshold": 0.9 } }"#).unwrap();

        assert_eq!(config.dedup.threshold, 0.9);
        assert_eq!(config.classifier.max_tokens, 150);
        assert_eq!(config.extraction.attachment_timeout_secs, 60);
        assert!(!config.pipeline.fail_on_classification_error);
        assert!(config.ocr.model_dir.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = MailflowConfig::default();
        config.pipeline.fail_on_classification_error = true;
        config.save(&path).unwrap();

        let loaded = MailflowConfig::from_file(&path).unwrap();
        assert!(loaded.pipeline.fail_on_classification_error);
        assert_eq!(loaded.dedup.threshold, 0.8);
    }
}
