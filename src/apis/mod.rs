pub mod allahabad;
pub mod factory;
pub mod gauhati;

use crate::config::SourceConfig;
use crate::error::{CauseListError, Result};
use crate::reconstruct::rules::RuleTable;
use crate::reconstruct::{classify_leading_cell, CaseColumn, ColumnNormalizer, RowKind, StartMarker};
use crate::types::{DocumentListing, RawRow};
use chrono::NaiveDate;
use regex::Regex;
use reqwest::{Client, Url};
use tracing::debug;

pub use factory::create_source;

/// Layout hooks shared by every adapter, built from the source's config.
pub struct SourceLayout {
    rules: RuleTable,
    columns: ColumnNormalizer,
    start_marker: StartMarker,
    case_pattern: Regex,
}

impl SourceLayout {
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        let case_pattern = Regex::new(&config.case_pattern)?;
        let case_column = if config.layout.detect_case_column {
            CaseColumn::Detect
        } else {
            CaseColumn::Fixed(config.layout.case_column)
        };
        // Detection searches cells, so an anchored pattern must not be used as-is.
        let probe = Regex::new(
            config
                .case_pattern
                .trim_start_matches('^')
                .trim_end_matches('$'),
        )?;
        Ok(Self {
            rules: RuleTable::from_config(&config.rules)?,
            columns: ColumnNormalizer::new(case_column, config.layout.start_marker, probe),
            start_marker: config.layout.start_marker,
            case_pattern,
        })
    }

    pub fn normalize_columns(&self, rows: Vec<RawRow>) -> Vec<RawRow> {
        self.columns.normalize(rows, &self.rules)
    }

    pub fn classify_row(&self, row: &RawRow) -> RowKind {
        classify_leading_cell(row, self.start_marker)
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn case_pattern(&self) -> &Regex {
        &self.case_pattern
    }
}

/// Keep listings strictly newer than the watermark, stopping at the first that is not.
pub fn accept_newer(listings: Vec<DocumentListing>, watermark: NaiveDate) -> Vec<DocumentListing> {
    listings
        .into_iter()
        .take_while(|listing| listing.date > watermark)
        .collect()
}

pub(crate) async fn fetch_text(client: &Client, source_id: &str, url: &str) -> Result<String> {
    debug!("GET {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| CauseListError::navigation(source_id, e))?;
    response
        .text()
        .await
        .map_err(|e| CauseListError::navigation(source_id, e))
}

pub(crate) async fn fetch_bytes(client: &Client, source_id: &str, url: &str) -> Result<Vec<u8>> {
    debug!("GET {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| CauseListError::navigation(source_id, e))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| CauseListError::navigation(source_id, e))?;
    Ok(bytes.to_vec())
}

pub(crate) fn resolve_link(source_id: &str, base: &str, href: &str) -> Result<String> {
    let base = Url::parse(base).map_err(|e| CauseListError::navigation(source_id, e))?;
    base.join(href.trim())
        .map(|u| u.to_string())
        .map_err(|e| CauseListError::navigation(source_id, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(d: u32) -> DocumentListing {
        DocumentListing {
            date: NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
            reference: format!("ref-{d}"),
        }
    }

    #[test]
    fn test_accept_newer_short_circuits() {
        let watermark = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        // out-of-order stale entry after the cut-off is never reached
        let accepted = accept_newer(vec![listing(14), listing(12), listing(10), listing(13)], watermark);
        let refs: Vec<&str> = accepted.iter().map(|l| l.reference.as_str()).collect();
        assert_eq!(refs, vec!["ref-14", "ref-12"]);
    }

    #[test]
    fn test_resolve_relative_link() {
        let url = resolve_link("gauhati", "https://example.org/lists/index.php", "../pdf/a.pdf").unwrap();
        assert_eq!(url, "https://example.org/pdf/a.pdf");
    }

    #[test]
    fn test_layout_for_builtin_sources() {
        for kind in crate::constants::get_supported_sources() {
            let config = SourceConfig::builtin(kind).unwrap();
            let layout = SourceLayout::from_config(&config).unwrap();
            assert_eq!(
                layout.classify_row(&RawRow::from(vec!["12", "X/1/2024"])),
                RowKind::Start
            );
        }
    }
}
