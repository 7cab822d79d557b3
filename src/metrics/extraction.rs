use super::phase_metric;

pub fn chunk_duration(duration_secs: f64) {
    ::metrics::counter!(phase_metric!(counter, "extraction", "chunks_succeeded")).increment(1);
    ::metrics::histogram!(phase_metric!(histogram, "extraction", "chunk_duration_seconds"))
        .record(duration_secs);
}

pub fn chunk_failed() {
    ::metrics::counter!(phase_metric!(counter, "extraction", "chunks_failed")).increment(1);
}

pub fn rows_extracted(count: usize) {
    ::metrics::counter!(phase_metric!(counter, "extraction", "rows")).increment(count as u64);
}
