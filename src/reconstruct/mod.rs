//! Row reconstruction: merges fragmented raw table rows into logical records.
//!
//! PDF table extraction splits one hearing entry over several rows whenever a
//! cell wraps. The state machine here walks the column-normalized rows of one
//! document in order and rebuilds one [`LogicalRecord`] per start row.

pub mod columns;
pub mod rules;

use crate::constants::{COL_CASE, COL_PARTIES, COL_PETITIONER, COL_RESPONDENT, COL_SEQUENCE};
use crate::types::{LogicalRecord, RawRow};
use rules::{CaseFragment, RuleTable};
use serde::Serialize;
use tracing::{debug, warn};

pub use columns::{classify_leading_cell, CaseColumn, ColumnNormalizer, StartMarker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Start,
    Continuation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowAnomaly {
    pub row_index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconstructionReport {
    pub rows_seen: usize,
    pub blank_rows: usize,
    /// Continuation rows seen before the first start row.
    pub preamble_rows: usize,
    /// "WITH" grouping annotations that carry no field content.
    pub group_annotations: usize,
    pub anomalies: Vec<RowAnomaly>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub records: Vec<LogicalRecord>,
    pub report: ReconstructionReport,
}

enum State {
    Idle,
    RecordOpen(LogicalRecord),
}

pub struct RowReconstructor<'a> {
    rules: &'a RuleTable,
}

impl<'a> RowReconstructor<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self { rules }
    }

    /// Rebuild logical records from one document's rows.
    ///
    /// Pure: the same rows and classifier always give the same output.
    pub fn reconstruct<F>(&self, rows: &[RawRow], classify: F) -> Reconstruction
    where
        F: Fn(&RawRow) -> RowKind,
    {
        let mut records = Vec::new();
        let mut report = ReconstructionReport::default();
        let mut state = State::Idle;

        for (row_index, row) in rows.iter().enumerate() {
            report.rows_seen += 1;
            if row.is_blank() {
                report.blank_rows += 1;
                continue;
            }

            state = match (classify(row), state) {
                (RowKind::Start, State::RecordOpen(open)) => {
                    records.push(open);
                    State::RecordOpen(Self::open_record(row))
                }
                (RowKind::Start, State::Idle) => State::RecordOpen(Self::open_record(row)),
                (RowKind::Continuation, State::Idle) => {
                    report.preamble_rows += 1;
                    report.anomalies.push(RowAnomaly {
                        row_index,
                        reason: "content before the first record ignored".to_string(),
                    });
                    State::Idle
                }
                (RowKind::Continuation, State::RecordOpen(mut open)) => {
                    self.merge_continuation(&mut open, row_index, row, &mut report);
                    State::RecordOpen(open)
                }
            };
        }

        // flush on end
        if let State::RecordOpen(open) = state {
            records.push(open);
        }

        for anomaly in &report.anomalies {
            debug!(row = anomaly.row_index, "Reconstruction anomaly: {}", anomaly.reason);
        }
        if report.preamble_rows > 0 {
            warn!("Ignored {} pre-amble rows before the first record", report.preamble_rows);
        }

        Reconstruction { records, report }
    }

    fn open_record(row: &RawRow) -> LogicalRecord {
        let case = row.cell(COL_CASE).trim();
        LogicalRecord {
            sequence_number: row.cell(COL_SEQUENCE).trim().to_string(),
            case_number: (!case.is_empty()).then(|| case.to_string()),
            parties: row.cell(COL_PARTIES).trim().to_string(),
            petitioner_advocates: non_empty(row.cell(COL_PETITIONER)).into_iter().collect(),
            respondent_advocates: Self::respondent_cells(row),
        }
    }

    fn respondent_cells(row: &RawRow) -> Vec<String> {
        row.cells()
            .iter()
            .skip(COL_RESPONDENT)
            .filter_map(|c| non_empty(c))
            .collect()
    }

    fn merge_continuation(
        &self,
        open: &mut LogicalRecord,
        row_index: usize,
        row: &RawRow,
        report: &mut ReconstructionReport,
    ) {
        // A stray non-numeric leading cell is party text that wrapped left.
        if let Some(lead) = non_empty(row.cell(COL_SEQUENCE)) {
            open.parties = self.rules.join_parties(&open.parties, &lead);
        }

        if let Some(fragment) = non_empty(row.cell(COL_CASE)) {
            match self.rules.classify_case_fragment(&fragment) {
                CaseFragment::GroupAnnotation => {
                    report.group_annotations += 1;
                    report.anomalies.push(RowAnomaly {
                        row_index,
                        reason: format!("grouping annotation '{fragment}' dropped"),
                    });
                }
                kind => {
                    open.case_number =
                        Some(self.rules.join_case(open.case_number.as_deref(), &fragment, kind));
                }
            }
        }

        if let Some(fragment) = non_empty(row.cell(COL_PARTIES)) {
            open.parties = self.rules.join_parties(&open.parties, &fragment);
        }

        if let Some(name) = non_empty(row.cell(COL_PETITIONER)) {
            open.petitioner_advocates.push(name);
        }
        open.respondent_advocates.extend(Self::respondent_cells(row));
    }
}

fn non_empty(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulesConfig;

    fn rules() -> RuleTable {
        RuleTable::from_config(&RulesConfig::default()).unwrap()
    }

    fn rows(raw: &[&[&str]]) -> Vec<RawRow> {
        raw.iter().map(|cells| RawRow::from(cells.to_vec())).collect()
    }

    fn numeric(row: &RawRow) -> RowKind {
        classify_leading_cell(row, StartMarker::Numeric)
    }

    #[test]
    fn test_merges_advocate_continuations() {
        let rules = rules();
        let input = rows(&[
            &["1", "ABC/12/2024", "X Versus Y", "Adv1", ""],
            &["", "", "", "Adv2", ""],
            &["2", "DEF/13/2024", "P vs Q", "Adv3", "Adv4"],
        ]);

        let out = RowReconstructor::new(&rules).reconstruct(&input, numeric);

        assert_eq!(out.records.len(), 2);
        let first = &out.records[0];
        assert_eq!(first.case_number.as_deref(), Some("ABC/12/2024"));
        assert_eq!(first.parties, "X Versus Y");
        assert_eq!(first.petitioner_advocates, vec!["Adv1", "Adv2"]);
        assert!(first.respondent_advocates.is_empty());

        let second = &out.records[1];
        assert_eq!(second.case_number.as_deref(), Some("DEF/13/2024"));
        assert_eq!(second.parties, "P vs Q");
        assert_eq!(second.petitioner_advocates, vec!["Adv3"]);
        assert_eq!(second.respondent_advocates, vec!["Adv4"]);
    }

    #[test]
    fn test_flushes_trailing_open_record() {
        let rules = rules();
        let input = rows(&[&["7", "WP(C)/1/2024", "A", "", ""], &["", "", "THE STATE", "", "GA"]]);

        let out = RowReconstructor::new(&rules).reconstruct(&input, numeric);

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].parties, "A vs THE STATE");
        assert_eq!(out.records[0].respondent_advocates, vec!["GA"]);
    }

    #[test]
    fn test_preamble_rows_are_ignored_and_reported() {
        let rules = rules();
        let input = rows(&[
            &["", "DAILY CAUSE LIST", "", "", ""],
            &["", "", "", "", ""],
            &["1", "A/1/2024", "P", "", ""],
        ]);

        let out = RowReconstructor::new(&rules).reconstruct(&input, numeric);

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.report.preamble_rows, 1);
        assert_eq!(out.report.blank_rows, 1);
        assert_eq!(out.report.anomalies.len(), 1);
        assert_eq!(out.report.anomalies[0].row_index, 0);
    }

    #[test]
    fn test_case_column_references_and_group_annotations() {
        let rules = rules();
        let input = rows(&[
            &["1", "WP(C)/10/2024", "A", "", ""],
            &["", "in IA(C)/3/2024", "", "", ""],
            &["", "WITH", "", "", ""],
        ]);

        let out = RowReconstructor::new(&rules).reconstruct(&input, numeric);

        assert_eq!(
            out.records[0].case_number.as_deref(),
            Some("WP(C)/10/2024; in IA(C)/3/2024")
        );
        assert_eq!(out.report.group_annotations, 1);
        assert_eq!(
            out.report.anomalies,
            vec![RowAnomaly {
                row_index: 2,
                reason: "grouping annotation 'WITH' dropped".to_string(),
            }]
        );
    }

    #[test]
    fn test_empty_case_cell_yields_absent_case_number() {
        let rules = rules();
        let input = rows(&[&["3", "  ", "LOST CASE", "", ""]]);
        let out = RowReconstructor::new(&rules).reconstruct(&input, numeric);
        assert_eq!(out.records[0].case_number, None);
    }

    #[test]
    fn test_reconstruction_is_idempotent_and_order_preserving() {
        let rules = rules();
        let input = rows(&[
            &["3", "C/3/2024", "third", "", ""],
            &["1", "A/1/2024", "first", "", ""],
            &["", "", "cont", "", ""],
            &["2", "B/2/2024", "second", "", ""],
        ]);
        let reconstructor = RowReconstructor::new(&rules);

        let a = reconstructor.reconstruct(&input, numeric);
        let b = reconstructor.reconstruct(&input, numeric);

        assert_eq!(a, b);
        let order: Vec<&str> = a.records.iter().map(|r| r.sequence_number.as_str()).collect();
        assert_eq!(order, vec!["3", "1", "2"]);
        assert_eq!(a.records[1].parties, "first cont");
    }

    #[test]
    fn test_every_non_empty_cell_lands_in_a_record() {
        let rules = rules();
        let input = rows(&[
            &["1", "A/1/2024", "ALPHA", "PA", "RA"],
            &["", "", "BETA", "PB", ""],
            &["", "", "", "", "RB"],
            &["2", "B/2/2024", "GAMMA", "", ""],
        ]);

        let out = RowReconstructor::new(&rules).reconstruct(&input, numeric);

        let rendered: Vec<String> = out
            .records
            .iter()
            .map(|r| r.to_table_row().join("|"))
            .collect();
        for cell in ["A/1/2024", "ALPHA", "PA", "RA", "BETA", "PB", "RB", "B/2/2024", "GAMMA"] {
            let hits = rendered.iter().filter(|line| line.contains(cell)).count();
            assert_eq!(hits, 1, "cell {cell} should land in exactly one record");
        }
    }
}
