//! Batch orchestration: per-source document processing and watermark management.

pub mod artifacts;
pub mod batch;
pub mod orchestrator;

pub use artifacts::RunArtifacts;
pub use batch::{BatchReport, BatchRunner};
pub use orchestrator::{clean_rows, DocumentOutcome, Orchestrator, SourceReport};
