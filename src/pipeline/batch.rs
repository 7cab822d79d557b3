use super::artifacts::RunArtifacts;
use super::orchestrator::{Orchestrator, SourceReport};
use crate::error::Result;
use crate::metrics;
use crate::storage::WatermarkStore;
use crate::types::CourtSource;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
}

impl BatchReport {
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.failed()).count()
    }
}

/// One batch invocation: every source once, then the run directory is removed.
pub struct BatchRunner {
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn WatermarkStore>,
    data_dir: PathBuf,
    keep_artifacts: bool,
}

impl BatchRunner {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        store: Arc<dyn WatermarkStore>,
        data_dir: PathBuf,
        keep_artifacts: bool,
    ) -> Self {
        Self {
            orchestrator,
            store,
            data_dir,
            keep_artifacts,
        }
    }

    /// Sources run concurrently, each in its own task; one source failing or
    /// panicking never stops the others.
    pub async fn run(&self, sources: Vec<Arc<dyn CourtSource>>) -> Result<BatchReport> {
        let started_at = Utc::now();
        let artifacts = Arc::new(RunArtifacts::create(&self.data_dir, self.keep_artifacts)?);
        let run_id = artifacts.run_id();
        info!("Batch {} starting with {} source(s)", run_id, sources.len());

        let handles: Vec<_> = sources
            .into_iter()
            .map(|source| {
                let orchestrator = self.orchestrator.clone();
                let store = self.store.clone();
                let artifacts = artifacts.clone();
                let fallback = SourceReport::new(source.as_ref(), None);
                let handle = tokio::spawn(async move {
                    run_one(orchestrator, store, source, artifacts).await
                });
                (fallback, handle)
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for (mut fallback, handle) in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(join_error) => {
                    error!("Source {} task aborted: {}", fallback.source_id, join_error);
                    fallback.failure = Some(format!("task aborted: {join_error}"));
                    reports.push(fallback);
                }
            }
        }

        match Arc::try_unwrap(artifacts) {
            Ok(artifacts) => artifacts.finish(),
            Err(_) => warn!("Run directory still in use, leaving it in place"),
        }

        let report = BatchReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            sources: reports,
        };
        info!(
            "Batch {} finished: {} source(s), {} failed",
            run_id,
            report.sources.len(),
            report.failed_sources()
        );
        Ok(report)
    }
}

/// Read the watermark, run the source, then persist an advanced watermark.
async fn run_one(
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn WatermarkStore>,
    source: Arc<dyn CourtSource>,
    artifacts: Arc<RunArtifacts>,
) -> SourceReport {
    let source_id = source.source_id().to_string();

    let watermark = match store.get_watermark(&source_id).await {
        Ok(watermark) => watermark,
        Err(e) => {
            error!("Cannot read watermark for {}: {}", source_id, e);
            let mut report = SourceReport::new(source.as_ref(), None);
            report.failure = Some(e.to_string());
            return report;
        }
    };

    let mut report = orchestrator.run_source(source, watermark, &artifacts).await;

    if let Some(advanced) = advanced_watermark(report.watermark_before, report.watermark_after) {
        match store.set_watermark(&source_id, advanced).await {
            Ok(()) => {
                info!("Watermark for {} advanced to {}", source_id, advanced);
                metrics::sources::watermark(&source_id, days_since_epoch(advanced));
            }
            Err(e) => {
                error!("Failed to persist watermark for {}: {}", source_id, e);
                report.watermark_after = report.watermark_before;
                report.failure.get_or_insert_with(|| e.to_string());
            }
        }
    }
    report
}

/// The new watermark to persist, if it moved forward.
fn advanced_watermark(before: Option<NaiveDate>, after: Option<NaiveDate>) -> Option<NaiveDate> {
    match (before, after) {
        (_, None) => None,
        (None, Some(after)) => Some(after),
        (Some(before), Some(after)) => (after > before).then_some(after),
    }
}

fn days_since_epoch(date: NaiveDate) -> i64 {
    // 1970-01-01 is day 719_163 of the common era
    i64::from(date.num_days_from_ce()) - 719_163
}
