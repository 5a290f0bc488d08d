//! Data models shared across the pipeline.

pub mod config;
pub mod request;
pub mod result;

pub use config::MailflowConfig;
pub use request::{AttachmentKind, AttachmentRef, IncomingRequest};
pub use result::{
    AttachmentReport, AttachmentStatus, ClassificationResult, ExtractedFields, PipelineResult,
};
