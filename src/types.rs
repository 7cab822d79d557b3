use crate::constants::{ADVOCATE_FIELD_SEPARATOR, CLEANED_TABLE_HEADER, SCHEMA_WIDTH};
use crate::error::Result;
use crate::reconstruct::rules::RuleTable;
use crate::reconstruct::RowKind;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One row of cells as produced by table extraction. Variable length; cells may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow(Vec<String>);

impl RawRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self(cells)
    }

    /// Cell text at `index`, or "" past the end of a short row.
    pub fn cell(&self, index: usize) -> &str {
        self.0.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn into_cells(self) -> Vec<String> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every cell is empty after trimming.
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|c| c.trim().is_empty())
    }

    /// Non-empty cells joined by a single space.
    pub fn joined_text(&self) -> String {
        self.0
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<Vec<String>> for RawRow {
    fn from(cells: Vec<String>) -> Self {
        Self(cells)
    }
}

impl From<Vec<&str>> for RawRow {
    fn from(cells: Vec<&str>) -> Self {
        Self(cells.into_iter().map(str::to_string).collect())
    }
}

/// One case's hearing entry, rebuilt from one or more raw rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalRecord {
    pub sequence_number: String,
    pub case_number: Option<String>,
    pub parties: String,
    pub petitioner_advocates: Vec<String>,
    pub respondent_advocates: Vec<String>,
}

impl LogicalRecord {
    /// Render as a row of the cleaned table (advocate lists `;`-joined).
    pub fn to_table_row(&self) -> [String; SCHEMA_WIDTH] {
        [
            self.sequence_number.clone(),
            self.case_number.clone().unwrap_or_default(),
            self.parties.clone(),
            self.petitioner_advocates.join(ADVOCATE_FIELD_SEPARATOR),
            self.respondent_advocates.join(ADVOCATE_FIELD_SEPARATOR),
        ]
    }

    /// Cleaned table row keyed by the table header.
    pub fn to_table_object(&self) -> serde_json::Map<String, serde_json::Value> {
        CLEANED_TABLE_HEADER
            .iter()
            .zip(self.to_table_row())
            .map(|(header, value)| (header.to_string(), serde_json::Value::String(value)))
            .collect()
    }
}

/// A registered recipient interested in a case number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Watcher {
    pub name: String,
    pub email: String,
}

/// A cause list published by a source, as seen on its listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentListing {
    pub date: NaiveDate,
    /// Adapter-specific download reference (URL, or form value).
    pub reference: String,
}

/// A downloaded cause list, alive for one run.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub source_id: String,
    pub date: NaiveDate,
    pub path: PathBuf,
    pub page_count: u32,
}

/// Inclusive page range handed to the table extractor as one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Per-jurisdiction strategy: navigation plus the layout hooks that run
/// before the shared reconstruction state machine.
#[async_trait::async_trait]
pub trait CourtSource: Send + Sync {
    /// Unique identifier for this source (watermark key)
    fn source_id(&self) -> &str;

    fn display_name(&self) -> &str;

    /// Published documents, newest first.
    async fn list_documents(&self, watermark: NaiveDate) -> Result<Vec<DocumentListing>>;

    async fn download(&self, listing: &DocumentListing) -> Result<Vec<u8>>;

    /// Pad, drop empty columns, strip boilerplate, and fold onto the cleaned schema.
    fn normalize_columns(&self, rows: Vec<RawRow>) -> Vec<RawRow>;

    fn classify_row(&self, row: &RawRow) -> RowKind;

    fn rules(&self) -> &RuleTable;

    /// Jurisdiction-specific case number pattern.
    fn case_pattern(&self) -> &Regex;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_row_joins_advocates_with_field_separator() {
        let record = LogicalRecord {
            sequence_number: "1".into(),
            case_number: None,
            parties: "A vs B".into(),
            petitioner_advocates: vec!["Adv1".into(), "Adv2".into()],
            respondent_advocates: vec![],
        };
        assert_eq!(
            record.to_table_row(),
            ["1", "", "A vs B", "Adv1; Adv2", ""].map(String::from)
        );
    }
}
