//! Page-range table extraction. The PDF-to-table primitive itself is external;
//! this module plans chunks and runs them on a bounded pool.

pub mod command;
pub mod pool;

use crate::error::{CauseListError, Result};
use crate::types::{PageRange, RawRow};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

pub use command::CommandExtractor;
pub use pool::{ChunkFailure, DocumentExtraction, ExtractionPool};

/// Extracts table rows from one page range of a PDF. Rows come back in page order.
#[async_trait]
pub trait TableExtractor: Send + Sync {
    async fn extract_page_range(&self, pdf: &Path, pages: PageRange) -> Result<Vec<RawRow>>;
}

/// Split `first_page..=page_count` into ranges aligned to `chunk_size` blocks.
///
/// With 150 pages, size 50 and first page 2 this yields 2-50, 51-100, 101-150.
pub fn plan_chunks(page_count: u32, first_page: u32, chunk_size: u32) -> Vec<PageRange> {
    let chunk_size = chunk_size.max(1);
    let first_page = first_page.max(1);
    (1..=page_count)
        .step_by(chunk_size as usize)
        .filter_map(|block_start| {
            let start = block_start.max(first_page);
            let end = block_start.saturating_add(chunk_size - 1).min(page_count);
            (start <= end).then_some(PageRange { start, end })
        })
        .collect()
}

/// Parse extractor output: one JSON array of cells per line.
/// `origin` names the input in errors (a page range or a file).
pub fn parse_ndjson_rows(output: &str, origin: impl std::fmt::Display) -> Result<Vec<RawRow>> {
    let origin = origin.to_string();
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(n, line)| {
            let value: Value = serde_json::from_str(line).map_err(|e| CauseListError::Extraction {
                pages: origin.clone(),
                message: format!("line {}: {}", n + 1, e),
            })?;
            let Value::Array(cells) = value else {
                return Err(CauseListError::Extraction {
                    pages: origin.clone(),
                    message: format!("line {}: expected an array of cells", n + 1),
                });
            };
            Ok(RawRow::new(cells.into_iter().map(cell_text).collect()))
        })
        .collect()
}

fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u32, end: u32) -> PageRange {
        PageRange { start, end }
    }

    #[test]
    fn test_plan_skips_cover_page() {
        assert_eq!(
            plan_chunks(150, 2, 50),
            vec![range(2, 50), range(51, 100), range(101, 150)]
        );
    }

    #[test]
    fn test_plan_partial_last_chunk() {
        assert_eq!(plan_chunks(120, 2, 50), vec![range(2, 50), range(51, 100), range(101, 120)]);
        assert_eq!(plan_chunks(7, 2, 50), vec![range(2, 7)]);
    }

    #[test]
    fn test_plan_cover_only_document_is_empty() {
        assert!(plan_chunks(1, 2, 50).is_empty());
        assert!(plan_chunks(0, 2, 50).is_empty());
    }

    #[test]
    fn test_plan_first_page_beyond_first_block() {
        assert_eq!(plan_chunks(30, 12, 10), vec![range(12, 20), range(21, 30)]);
    }

    #[test]
    fn test_parse_ndjson_rows() {
        let out = "[\"1\", \"A/1/2024\", null, 3]\n\n[]\n";
        let rows = parse_ndjson_rows(out, range(2, 3)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], RawRow::from(vec!["1", "A/1/2024", "", "3"]));
        assert!(rows[1].is_empty());
    }

    #[test]
    fn test_parse_rejects_non_array_lines() {
        let err = parse_ndjson_rows("{\"a\":1}", range(2, 3)).unwrap_err();
        assert!(matches!(err, CauseListError::Extraction { .. }));
    }
}
