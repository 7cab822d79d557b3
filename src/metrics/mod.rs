//! Pipeline metrics, organized by phase.
//!
//! Each phase owns its metric names in a submodule. Runs are short-lived, so
//! the recorder is rendered in-process and pushed to a Pushgateway at the end.

pub mod extraction;
pub mod records;
pub mod sources;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing::{info, warn};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names follow `causelist_{phase}_{name}[_total]`.
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("causelist_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("causelist_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("causelist_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;

/// Install the Prometheus recorder. Idempotent.
pub fn init_metrics() {
    if HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_err() {
                warn!("Metrics handle already stored");
            }
            info!("Prometheus recorder installed");
        }
        Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
    }
}

/// Current snapshot in Prometheus text format, if the recorder is installed.
pub fn render() -> Option<String> {
    HANDLE.get().map(PrometheusHandle::render)
}

/// Push the current snapshot to a Pushgateway under `job/causelist/instance/{instance}`.
pub async fn push_to_gateway(gateway_url: &str, instance: &str) -> crate::error::Result<()> {
    let Some(body) = render() else {
        warn!("Metrics recorder not installed, nothing to push");
        return Ok(());
    };

    let push_url = format!(
        "{}/metrics/job/causelist/instance/{}",
        gateway_url.trim_end_matches('/'),
        instance
    );
    reqwest::Client::new()
        .post(&push_url)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(body)
        .send()
        .await?
        .error_for_status()?;

    info!("Pushed metrics to Pushgateway for instance={}", instance);
    Ok(())
}
