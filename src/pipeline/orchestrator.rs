use super::artifacts::RunArtifacts;
use crate::error::{CauseListError, Result};
use crate::extract::{plan_chunks, ExtractionPool};
use crate::matcher::WatcherMatcher;
use crate::metrics;
use crate::normalize::{NormalizedRecord, RecordNormalizer};
use crate::notifier::{DeliveryTally, Notifier};
use crate::pdf;
use crate::reconstruct::{ReconstructionReport, RowReconstructor};
use crate::types::{CourtSource, RawDocument, RawRow};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of one source within a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceReport {
    pub source_id: String,
    pub display_name: String,
    pub documents_accepted: usize,
    pub documents_processed: usize,
    pub records: usize,
    pub unmatched: usize,
    pub anomalies: usize,
    pub chunk_failures: usize,
    pub notifications: DeliveryTally,
    pub watermark_before: Option<NaiveDate>,
    pub watermark_after: Option<NaiveDate>,
    /// Set when the source was aborted.
    pub failure: Option<String>,
}

impl SourceReport {
    pub fn new(source: &dyn CourtSource, watermark: Option<NaiveDate>) -> Self {
        Self {
            source_id: source.source_id().to_string(),
            display_name: source.display_name().to_string(),
            watermark_before: watermark,
            watermark_after: watermark,
            ..Self::default()
        }
    }

    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentOutcome {
    pub records: usize,
    pub unmatched: usize,
    pub anomalies: usize,
    pub chunk_failures: usize,
    pub notifications: DeliveryTally,
}

/// Column normalization, reconstruction and normalization of one document's rows.
pub fn clean_rows(
    source: &dyn CourtSource,
    rows: Vec<RawRow>,
) -> (Vec<NormalizedRecord>, ReconstructionReport) {
    let rows = source.normalize_columns(rows);
    let reconstruction =
        RowReconstructor::new(source.rules()).reconstruct(&rows, |row| source.classify_row(row));
    let normalizer =
        RecordNormalizer::new(source.case_pattern().clone(), source.rules().list_separator());
    (
        normalizer.normalize_all(reconstruction.records),
        reconstruction.report,
    )
}

/// Drives one source through fetch, extract, reconstruct, match and notify.
pub struct Orchestrator {
    pool: ExtractionPool,
    matcher: WatcherMatcher,
    notifier: Notifier,
    chunk_size: u32,
    first_page: u32,
}

impl Orchestrator {
    pub fn new(
        pool: ExtractionPool,
        matcher: WatcherMatcher,
        notifier: Notifier,
        chunk_size: u32,
        first_page: u32,
    ) -> Self {
        Self {
            pool,
            matcher,
            notifier,
            chunk_size,
            first_page,
        }
    }

    /// Process everything newer than `watermark`; the report carries the new watermark.
    ///
    /// An absent watermark is treated as today, so nothing stale is accepted.
    #[instrument(skip_all, fields(source_id = %source.source_id()))]
    pub async fn run_source(
        &self,
        source: Arc<dyn CourtSource>,
        watermark: Option<NaiveDate>,
        artifacts: &RunArtifacts,
    ) -> SourceReport {
        let mut report = SourceReport::new(source.as_ref(), watermark);
        metrics::sources::run_started(source.source_id());
        let since = watermark.unwrap_or_else(|| chrono::Local::now().date_naive());

        let documents = match self.fetch_documents(source.as_ref(), since, artifacts).await {
            Ok(documents) => documents,
            Err(e) => {
                error!("Source {} aborted: {}", source.source_id(), e);
                metrics::sources::run_failed(source.source_id());
                report.failure = Some(e.to_string());
                return report;
            }
        };
        report.documents_accepted = documents.len();
        metrics::sources::documents_accepted(source.source_id(), documents.len());

        // watermark only moves while every earlier document produced records
        let mut contiguous = true;
        for document in documents {
            let started = Instant::now();
            let outcome = match self.process_document(source.as_ref(), &document, artifacts).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Source {} aborted at {}: {}", source.source_id(), document.date, e);
                    metrics::sources::run_failed(source.source_id());
                    report.failure = Some(e.to_string());
                    break;
                }
            };
            metrics::sources::document_processed(source.source_id(), started.elapsed().as_secs_f64());

            report.documents_processed += 1;
            report.records += outcome.records;
            report.unmatched += outcome.unmatched;
            report.anomalies += outcome.anomalies;
            report.chunk_failures += outcome.chunk_failures;
            report.notifications.absorb(outcome.notifications);

            if outcome.records == 0 {
                if contiguous {
                    warn!(
                        "No records extracted from the {} list; watermark held for retry",
                        document.date
                    );
                }
                contiguous = false;
            } else if contiguous && report.watermark_after.map_or(true, |w| document.date > w) {
                report.watermark_after = Some(document.date);
            }
        }

        info!(
            "Source {} done: {} document(s), {} record(s), {} notification(s) sent, {} failed",
            source.source_id(),
            report.documents_processed,
            report.records,
            report.notifications.sent,
            report.notifications.failed
        );
        report
    }

    /// List and download every accepted document, oldest first.
    async fn fetch_documents(
        &self,
        source: &dyn CourtSource,
        since: NaiveDate,
        artifacts: &RunArtifacts,
    ) -> Result<Vec<RawDocument>> {
        let mut listings = source.list_documents(since).await?;
        listings.sort_by_key(|listing| listing.date);

        let mut documents = Vec::with_capacity(listings.len());
        for listing in listings {
            let bytes = source.download(&listing).await?;
            metrics::sources::download_bytes(source.source_id(), bytes.len());
            let path = artifacts
                .write_document(source.source_id(), listing.date, &bytes)
                .map_err(|e| CauseListError::navigation(source.source_id(), e))?;
            let page_count = match pdf::page_count(&bytes) {
                Ok(count) => count,
                Err(e) => {
                    warn!("Could not read page count of the {} list: {}", listing.date, e);
                    0
                }
            };
            debug!("Downloaded {} list: {} pages", listing.date, page_count);
            documents.push(RawDocument {
                source_id: source.source_id().to_string(),
                date: listing.date,
                path,
                page_count,
            });
        }
        Ok(documents)
    }

    /// Only a lookup failure is returned as an error; everything else is absorbed.
    #[instrument(skip_all, fields(date = %document.date, pages = document.page_count))]
    pub async fn process_document(
        &self,
        source: &dyn CourtSource,
        document: &RawDocument,
        artifacts: &RunArtifacts,
    ) -> Result<DocumentOutcome> {
        let mut outcome = DocumentOutcome::default();

        let ranges = plan_chunks(document.page_count, self.first_page, self.chunk_size);
        if ranges.is_empty() {
            warn!("The {} list has no pages past the cover page", document.date);
            return Ok(outcome);
        }

        let extraction = self.pool.extract_document(&document.path, &ranges).await;
        outcome.chunk_failures = extraction.failures.len();
        metrics::extraction::rows_extracted(extraction.rows.len());
        info!(
            "Extracted {} rows from {} chunk(s), {} failed",
            extraction.rows.len(),
            extraction.chunks,
            extraction.failures.len()
        );

        let (records, reconstruction) = clean_rows(source, extraction.rows);
        outcome.records = records.len();
        outcome.anomalies = reconstruction.anomalies.len();
        metrics::records::reconstructed(source.source_id(), records.len(), outcome.anomalies);

        if let Err(e) = artifacts.write_cleaned_table(source.source_id(), document.date, &records) {
            warn!("Failed to write cleaned table for {}: {}", document.date, e);
        }

        for record in &records {
            if record.is_unmatched() {
                outcome.unmatched += 1;
                metrics::records::unmatched(source.source_id());
                continue;
            }
            let watchers = self.matcher.resolve(record.lookup_key()).await?;
            if watchers.is_empty() {
                continue;
            }
            let tally = self.notifier.notify_all(&watchers, &record.record).await;
            metrics::records::notifications_sent(tally.sent);
            metrics::records::notifications_failed(tally.failed);
            outcome.notifications.absorb(tally);
        }

        Ok(outcome)
    }
}
