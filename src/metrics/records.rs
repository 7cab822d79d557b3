//! Record phase: reconstruction, matching, delivery.

use super::phase_metric;

pub fn reconstructed(source_id: &str, records: usize, anomalies: usize) {
    ::metrics::counter!(phase_metric!(counter, "records", "reconstructed"), "source" => source_id.to_string())
        .increment(records as u64);
    ::metrics::counter!(phase_metric!(counter, "records", "anomalies"), "source" => source_id.to_string())
        .increment(anomalies as u64);
}

pub fn unmatched(source_id: &str) {
    ::metrics::counter!(phase_metric!(counter, "records", "unmatched"), "source" => source_id.to_string())
        .increment(1);
}

pub fn notifications_sent(count: usize) {
    ::metrics::counter!(phase_metric!(counter, "records", "notifications_sent")).increment(count as u64);
}

pub fn notifications_failed(count: usize) {
    ::metrics::counter!(phase_metric!(counter, "records", "notifications_failed")).increment(count as u64);
}
