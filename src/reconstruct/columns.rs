//! Column normalization: the per-source variation point that runs before the
//! shared merge state machine.
//!
//! Absorbs ragged extraction output by stripping boilerplate rows, padding to a
//! uniform width, dropping columns that are empty across the whole document,
//! and folding whatever remains onto the fixed five-column schema.

use super::rules::RuleTable;
use super::RowKind;
use crate::constants::{
    COL_CASE, COL_PARTIES, COL_PETITIONER, COL_RESPONDENT, COL_SEQUENCE, SCHEMA_WIDTH,
};
use crate::types::RawRow;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a row's leading cell marks the start of a new logical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StartMarker {
    /// Leading cell is a non-empty run of digits.
    #[default]
    Numeric,
    /// Any non-empty leading cell.
    NonEmpty,
}

/// Where the case number sits once empty columns are gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseColumn {
    Fixed(usize),
    /// Pick the column where most start rows carry a case-number-shaped token.
    Detect,
}

pub fn classify_leading_cell(row: &RawRow, marker: StartMarker) -> RowKind {
    let lead = row.cell(COL_SEQUENCE).trim();
    let is_start = match marker {
        StartMarker::Numeric => !lead.is_empty() && lead.chars().all(|c| c.is_ascii_digit()),
        StartMarker::NonEmpty => !lead.is_empty(),
    };
    if is_start {
        RowKind::Start
    } else {
        RowKind::Continuation
    }
}

#[derive(Debug, Clone)]
pub struct ColumnNormalizer {
    case_column: CaseColumn,
    start_marker: StartMarker,
    case_probe: Regex,
}

impl ColumnNormalizer {
    pub fn new(case_column: CaseColumn, start_marker: StartMarker, case_probe: Regex) -> Self {
        Self {
            case_column,
            start_marker,
            case_probe,
        }
    }

    pub fn normalize(&self, rows: Vec<RawRow>, rules: &RuleTable) -> Vec<RawRow> {
        let before = rows.len();
        let rows: Vec<RawRow> = rows.into_iter().filter(|r| !rules.is_boilerplate(r)).collect();
        if rows.len() != before {
            debug!("Stripped {} boilerplate rows", before - rows.len());
        }

        let width = rows.iter().map(RawRow::len).max().unwrap_or(0);
        if width == 0 {
            return rows;
        }

        let padded: Vec<Vec<String>> = rows
            .into_iter()
            .map(|row| {
                let mut cells = row.into_cells();
                cells.resize(width, String::new());
                cells
            })
            .collect();

        let populated: Vec<usize> = (0..width)
            .filter(|&col| padded.iter().any(|cells| !cells[col].trim().is_empty()))
            .collect();
        let kept = match self.case_column {
            CaseColumn::Fixed(col) => positional_columns(&populated, col.max(COL_CASE), width),
            CaseColumn::Detect => populated,
        };
        if kept.len() != width {
            debug!("Dropped {} empty columns", width - kept.len());
        }

        let compact: Vec<Vec<String>> = padded
            .into_iter()
            .map(|cells| kept.iter().map(|&col| cells[col].clone()).collect())
            .collect();

        let case_col = self.case_column_index(&compact);
        compact
            .into_iter()
            .map(|cells| RawRow::new(fold_to_schema(&cells, case_col)))
            .collect()
    }

    fn case_column_index(&self, rows: &[Vec<String>]) -> usize {
        match self.case_column {
            CaseColumn::Fixed(col) => col.max(COL_CASE),
            CaseColumn::Detect => {
                let width = rows.first().map(Vec::len).unwrap_or(0);
                let mut hits = vec![0usize; width];
                for cells in rows {
                    let row = RawRow::new(cells.clone());
                    if classify_leading_cell(&row, self.start_marker) != RowKind::Start {
                        continue;
                    }
                    for (col, cell) in cells.iter().enumerate().skip(COL_CASE) {
                        if self.case_probe.is_match(cell.trim()) {
                            hits[col] += 1;
                        }
                    }
                }
                // earliest column wins ties
                hits.iter()
                    .enumerate()
                    .skip(COL_CASE)
                    .fold((COL_CASE, 0), |best, (col, &n)| if n > best.1 { (col, n) } else { best })
                    .0
            }
        }
    }
}

/// Columns kept for a fixed layout: empty columns up to the case column are
/// dropped, everything after it keeps its schema slot even when empty.
fn positional_columns(populated: &[usize], case_column: usize, width: usize) -> Vec<usize> {
    match populated.get(case_column) {
        Some(&case_at) => populated
            .iter()
            .copied()
            .filter(|&col| col <= case_at)
            .chain(case_at + 1..width)
            .collect(),
        None => populated.to_vec(),
    }
}

/// Join the non-empty cells of `cells[from..to]` with a space.
fn fold(cells: &[String], from: usize, to: usize) -> String {
    let to = to.min(cells.len());
    if from >= to {
        return String::new();
    }
    cells[from..to]
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Map a compacted row onto `[seq, case, parties, petitioner, respondent]`.
///
/// Cells between the sequence column and the case column fold into the case
/// cell; cells past the respondent column fold into the respondent cell.
fn fold_to_schema(cells: &[String], case_col: usize) -> Vec<String> {
    let mut out = vec![String::new(); SCHEMA_WIDTH];
    out[COL_SEQUENCE] = cells.first().cloned().unwrap_or_default();
    out[COL_CASE] = fold(cells, COL_CASE, case_col + 1);
    out[COL_PARTIES] = fold(cells, case_col + 1, case_col + 2);
    out[COL_PETITIONER] = fold(cells, case_col + 2, case_col + 3);
    out[COL_RESPONDENT] = fold(cells, case_col + 3, cells.len());
    out
}
