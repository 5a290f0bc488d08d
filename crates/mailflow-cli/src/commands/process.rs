//! Process command - run the pipeline on one email.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use mailflow_core::classify::Result as ClassifyResult;
use mailflow_core::error::ClassifierError;
use mailflow_core::{
    AttachmentRef, AttachmentStatus, CorpusSource, HistoricalCorpus, IncomingRequest, JsonlCorpus,
    LanguageModel, OpenAiClient, Pipeline, PipelineResult,
};

use super::config::load_config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// File holding the email body
    #[arg(short, long)]
    email: PathBuf,

    /// File holding earlier messages of the thread
    #[arg(short, long)]
    thread: Option<PathBuf>,

    /// Corpus file (JSON Lines) to check for duplicates
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Append this request to the corpus after processing
    #[arg(long, requires = "corpus")]
    record: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Attachment files (PDF, DOCX, JPG, PNG)
    attachments: Vec<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
    /// CSV output
    Csv,
}

/// Stands in for the classifier when no API key is configured.
struct Unconfigured(String);

#[async_trait]
impl LanguageModel for Unconfigured {
    async fn complete(&self, _prompt: &str) -> ClassifyResult<String> {
        Err(ClassifierError::MissingCredentials(self.0.clone()))
    }

    fn model_id(&self) -> &str {
        "unconfigured"
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let email_text = fs::read_to_string(&args.email)
        .with_context(|| format!("Failed to read email {}", args.email.display()))?;
    let email_thread = match &args.thread {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read thread {}", path.display()))?,
        None => String::new(),
    };

    let mut request = IncomingRequest::new(email_text).with_thread(email_thread);
    for path in &args.attachments {
        request = request.with_attachment(AttachmentRef::new(path));
    }

    let model: Arc<dyn LanguageModel> = match OpenAiClient::from_env(&config.classifier) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!("Classifier not configured: {}", e);
            let reason = match e {
                ClassifierError::MissingCredentials(reason) => reason,
                other => other.to_string(),
            };
            Arc::new(Unconfigured(reason))
        }
    };
    let pipeline = Pipeline::from_config(&config, model);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!(
        "Processing {} with {} attachments...",
        args.email.display(),
        request.attachments.len()
    ));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let corpus = args.corpus.as_ref().map(JsonlCorpus::new);
    let source: Arc<dyn CorpusSource> = match &corpus {
        Some(corpus) => Arc::new(corpus.clone()),
        None => Arc::new(HistoricalCorpus::new()),
    };
    let processed = pipeline.process(&request, source).await;
    pb.finish_and_clear();
    let result = processed?;

    if args.record {
        if let Some(corpus) = &corpus {
            corpus.append(&request.combined_content())?;
            info!("Recorded request in {}", corpus.path().display());
        }
    }

    let output = format_result(&result, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if result.has_errors() {
        eprintln!(
            "{} Some stages did not complete; see the result for details.",
            style("!").yellow()
        );
    }

    Ok(())
}

fn format_result(result: &PipelineResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Text => Ok(format_text(result)),
        OutputFormat::Csv => format_csv(result),
    }
}

fn format_csv(result: &PipelineResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "classification",
        "deal_name",
        "amount",
        "expiration_date",
        "is_duplicate",
        "duplicate_reason",
        "max_similarity",
        "processing_time_ms",
    ])?;

    wtr.write_record([
        result
            .classification
            .as_ref()
            .map(|c| c.raw_text.clone())
            .unwrap_or_default(),
        result.fields.deal_name.clone().unwrap_or_default(),
        result.fields.amount.clone().unwrap_or_default(),
        result.fields.expiration_date.clone().unwrap_or_default(),
        result.is_duplicate.to_string(),
        result.duplicate_reason.clone(),
        format!("{:.4}", result.max_similarity),
        result.processing_time_ms.to_string(),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(result: &PipelineResult) -> String {
    let mut output = String::new();

    match (&result.classification, &result.classification_error) {
        (Some(classification), _) => {
            output.push_str(&format!("Request type: {}\n", classification.raw_text));
            if let Some(suggested) = classification.suggested_type() {
                output.push_str(&format!(
                    "Taxonomy:     {}{}\n",
                    suggested.request_type,
                    suggested.subtype.map(|s| format!(" / {}", s)).unwrap_or_default()
                ));
            }
        }
        (None, Some(error)) => {
            output.push_str(&format!("Request type: unavailable ({})\n", error));
        }
        (None, None) => output.push_str("Request type: unavailable\n"),
    }
    output.push('\n');

    output.push_str("Fields:\n");
    for (name, value) in [
        ("Deal name", &result.fields.deal_name),
        ("Amount", &result.fields.amount),
        ("Expiration date", &result.fields.expiration_date),
    ] {
        output.push_str(&format!("  {:<16} {}\n", name, value.as_deref().unwrap_or("-")));
    }
    output.push('\n');

    output.push_str(&format!(
        "Duplicate: {} ({}, max similarity {:.2})\n",
        if result.is_duplicate { "yes" } else { "no" },
        result.duplicate_reason,
        result.max_similarity
    ));

    if !result.attachments.is_empty() {
        output.push_str("\nAttachments:\n");
        for report in &result.attachments {
            let status = match &report.status {
                AttachmentStatus::Extracted { chars } => format!("{} chars", chars),
                AttachmentStatus::Unsupported => "unsupported".to_string(),
                AttachmentStatus::Failed { reason } => format!("failed: {}", reason),
            };
            output.push_str(&format!("  {} [{}] {}\n", report.path.display(), report.kind, status));
        }
    }

    output.push_str(&format!("\nProcessed in {}ms\n", result.processing_time_ms));
    output
}
