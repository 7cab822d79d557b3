//! Source phase: listing, download, watermark progress.

use super::phase_metric;

pub fn run_started(source_id: &str) {
    ::metrics::counter!(phase_metric!(counter, "sources", "runs"), "source" => source_id.to_string())
        .increment(1);
}

pub fn run_failed(source_id: &str) {
    ::metrics::counter!(phase_metric!(counter, "sources", "run_failures"), "source" => source_id.to_string())
        .increment(1);
}

pub fn documents_accepted(source_id: &str, count: usize) {
    ::metrics::counter!(phase_metric!(counter, "sources", "documents_accepted"), "source" => source_id.to_string())
        .increment(count as u64);
}

pub fn document_processed(source_id: &str, duration_secs: f64) {
    ::metrics::counter!(phase_metric!(counter, "sources", "documents_processed"), "source" => source_id.to_string())
        .increment(1);
    ::metrics::histogram!(phase_metric!(histogram, "sources", "document_duration_seconds"), "source" => source_id.to_string())
        .record(duration_secs);
}

pub fn download_bytes(source_id: &str, bytes: usize) {
    ::metrics::histogram!(phase_metric!(histogram, "sources", "download_bytes"), "source" => source_id.to_string())
        .record(bytes as f64);
}

/// Watermark as days since the Unix epoch.
pub fn watermark(source_id: &str, days_since_epoch: i64) {
    ::metrics::gauge!(phase_metric!(gauge, "sources", "watermark_days"), "source" => source_id.to_string())
        .set(days_since_epoch as f64);
}
