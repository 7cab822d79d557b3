use super::TableExtractor;
use crate::error::{CauseListError, Result};
use crate::metrics;
use crate::types::{PageRange, RawRow};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkFailure {
    pub pages: PageRange,
    pub message: String,
}

/// Rows of a whole document, reassembled in page order.
#[derive(Debug, Default)]
pub struct DocumentExtraction {
    pub rows: Vec<RawRow>,
    pub chunks: usize,
    pub failures: Vec<ChunkFailure>,
}

/// Bounded worker pool for page-range extraction.
#[derive(Clone)]
pub struct ExtractionPool {
    extractor: Arc<dyn TableExtractor>,
    permits: Arc<Semaphore>,
}

impl ExtractionPool {
    pub fn new(extractor: Arc<dyn TableExtractor>, workers: usize) -> Self {
        Self {
            extractor,
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Extract every range concurrently and wait for all of them.
    ///
    /// Output order follows range start, never completion order. A failed
    /// chunk contributes no rows and is listed in `failures`.
    pub async fn extract_document(&self, pdf: &Path, ranges: &[PageRange]) -> DocumentExtraction {
        let mut ordered: Vec<PageRange> = ranges.to_vec();
        ordered.sort();

        let handles: Vec<(PageRange, JoinHandle<Result<Vec<RawRow>>>)> = ordered
            .into_iter()
            .map(|pages| {
                let extractor = self.extractor.clone();
                let permits = self.permits.clone();
                let pdf: PathBuf = pdf.to_path_buf();
                let handle = tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.map_err(|e| {
                        CauseListError::Extraction {
                            pages: pages.to_string(),
                            message: e.to_string(),
                        }
                    })?;
                    let started = Instant::now();
                    let rows = extractor.extract_page_range(&pdf, pages).await?;
                    metrics::extraction::chunk_duration(started.elapsed().as_secs_f64());
                    Ok(rows)
                });
                (pages, handle)
            })
            .collect();

        // barrier: every chunk settles before anything is returned
        let mut result = DocumentExtraction {
            chunks: handles.len(),
            ..DocumentExtraction::default()
        };
        for (pages, handle) in handles {
            match handle.await {
                Ok(Ok(rows)) => {
                    debug!("Pages {} yielded {} rows", pages, rows.len());
                    result.rows.extend(rows);
                }
                Ok(Err(e)) => {
                    warn!("Extraction failed for pages {}: {}", pages, e);
                    metrics::extraction::chunk_failed();
                    result.failures.push(ChunkFailure {
                        pages,
                        message: e.to_string(),
                    });
                }
                Err(join_error) => {
                    warn!("Extraction task for pages {} aborted: {}", pages, join_error);
                    metrics::extraction::chunk_failed();
                    result.failures.push(ChunkFailure {
                        pages,
                        message: join_error.to_string(),
                    });
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Finishes later chunks first and tracks peak concurrency.
    struct SlowFirstExtractor {
        active: AtomicUsize,
        peak: AtomicUsize,
        fail_start: Option<u32>,
    }

    #[async_trait]
    impl TableExtractor for SlowFirstExtractor {
        async fn extract_page_range(&self, _pdf: &Path, pages: PageRange) -> Result<Vec<RawRow>> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let delay = 200u64.saturating_sub(pages.start as u64);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            if Some(pages.start) == self.fail_start {
                return Err(CauseListError::Extraction {
                    pages: pages.to_string(),
                    message: "corrupt page".into(),
                });
            }
            Ok(vec![RawRow::from(vec![pages.start.to_string()])])
        }
    }

    fn extractor(fail_start: Option<u32>) -> Arc<SlowFirstExtractor> {
        Arc::new(SlowFirstExtractor {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            fail_start,
        })
    }

    fn ranges() -> Vec<PageRange> {
        vec![
            PageRange { start: 101, end: 150 },
            PageRange { start: 2, end: 50 },
            PageRange { start: 51, end: 100 },
        ]
    }

    #[tokio::test]
    async fn test_rows_follow_page_order_not_completion_order() {
        let pool = ExtractionPool::new(extractor(None), 4);
        let out = pool.extract_document(Path::new("doc.pdf"), &ranges()).await;

        let firsts: Vec<&str> = out.rows.iter().map(|r| r.cell(0)).collect();
        assert_eq!(firsts, vec!["2", "51", "101"]);
        assert_eq!(out.chunks, 3);
        assert!(out.failures.is_empty());
    }

    #[tokio::test]
    async fn test_worker_bound_is_respected() {
        let ex = extractor(None);
        let pool = ExtractionPool::new(ex.clone(), 1);
        pool.extract_document(Path::new("doc.pdf"), &ranges()).await;
        assert_eq!(ex.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_chunk_is_reported_and_skipped() {
        let pool = ExtractionPool::new(extractor(Some(51)), 2);
        let out = pool.extract_document(Path::new("doc.pdf"), &ranges()).await;

        let firsts: Vec<&str> = out.rows.iter().map(|r| r.cell(0)).collect();
        assert_eq!(firsts, vec!["2", "101"]);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].pages, PageRange { start: 51, end: 100 });
    }
}
