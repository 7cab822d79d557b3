//! Record normalization: canonical field shape plus case number validation.

use crate::types::LogicalRecord;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseStatus {
    /// Case number passed validation; `lookup_key` is the matched token.
    Valid { lookup_key: String },
    /// Absent or malformed case number. Retained, but never matched.
    Unmatched,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    pub record: LogicalRecord,
    pub status: CaseStatus,
}

impl NormalizedRecord {
    pub fn lookup_key(&self) -> Option<&str> {
        match &self.status {
            CaseStatus::Valid { lookup_key } => Some(lookup_key),
            CaseStatus::Unmatched => None,
        }
    }

    pub fn is_unmatched(&self) -> bool {
        matches!(self.status, CaseStatus::Unmatched)
    }
}

pub struct RecordNormalizer {
    case_pattern: Regex,
    list_separator: String,
}

impl RecordNormalizer {
    pub fn new(case_pattern: Regex, list_separator: &str) -> Self {
        Self {
            case_pattern,
            list_separator: list_separator.trim().to_string(),
        }
    }

    pub fn normalize(&self, record: LogicalRecord) -> NormalizedRecord {
        let record = LogicalRecord {
            sequence_number: record.sequence_number.trim().to_string(),
            case_number: record
                .case_number
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            parties: record.parties.trim().to_string(),
            petitioner_advocates: trim_list(record.petitioner_advocates),
            respondent_advocates: trim_list(record.respondent_advocates),
        };

        let status = match record.case_number.as_deref().and_then(|c| self.validate(c)) {
            Some(lookup_key) => CaseStatus::Valid { lookup_key },
            None => {
                debug!(
                    sequence = %record.sequence_number,
                    case = ?record.case_number,
                    "Case number failed validation, record left unmatched"
                );
                CaseStatus::Unmatched
            }
        };

        NormalizedRecord { record, status }
    }

    pub fn normalize_all(&self, records: Vec<LogicalRecord>) -> Vec<NormalizedRecord> {
        records.into_iter().map(|r| self.normalize(r)).collect()
    }

    /// Validate the primary case token (before any "; in ..." references).
    ///
    /// The whole primary text is tried first, then each whitespace-separated
    /// token, so wrapped annotations such as "[Defective]" do not hide the case.
    fn validate(&self, case_number: &str) -> Option<String> {
        let primary = if self.list_separator.is_empty() {
            case_number
        } else {
            case_number
                .split(self.list_separator.as_str())
                .next()
                .unwrap_or(case_number)
        };
        let primary = primary.trim();
        std::iter::once(primary)
            .chain(primary.split_whitespace())
            .find_map(|candidate| self.case_pattern.find(candidate))
            .map(|m| m.as_str().to_string())
    }
}

fn trim_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
