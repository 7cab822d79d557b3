use crate::error::Result;
use crate::normalize::NormalizedRecord;
use chrono::NaiveDate;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-invocation scratch directory: `data_dir/tmp/<run-id>/`.
#[derive(Debug)]
pub struct RunArtifacts {
    run_id: Uuid,
    dir: PathBuf,
    keep: bool,
}

impl RunArtifacts {
    pub fn create(data_dir: &Path, keep: bool) -> Result<Self> {
        let run_id = Uuid::new_v4();
        let dir = data_dir.join("tmp").join(run_id.to_string());
        fs::create_dir_all(&dir)?;
        debug!("Run directory {}", dir.display());
        Ok(Self { run_id, dir, keep })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(source_id: &str, date: NaiveDate, extension: &str) -> String {
        format!("{}_{}.{}", source_id, date.format("%Y-%m-%d"), extension)
    }

    pub fn write_document(&self, source_id: &str, date: NaiveDate, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join(Self::file_name(source_id, date, "pdf"));
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Cleaned table for one document: one JSON object per record, keyed by the table header.
    pub fn write_cleaned_table(
        &self,
        source_id: &str,
        date: NaiveDate,
        records: &[NormalizedRecord],
    ) -> Result<PathBuf> {
        let path = self.dir.join(Self::file_name(source_id, date, "ndjson"));
        let mut file = fs::File::create(&path)?;
        for record in records {
            serde_json::to_writer(&mut file, &record.record.to_table_object())?;
            file.write_all(b"\n")?;
        }
        file.flush()?;
        Ok(path)
    }

    /// Remove the run directory unless artifacts are kept.
    pub fn finish(self) {
        if self.keep {
            info!("Keeping run artifacts in {}", self.dir.display());
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            warn!("Failed to remove run directory {}: {}", self.dir.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::CaseStatus;
    use crate::types::LogicalRecord;

    fn record() -> NormalizedRecord {
        NormalizedRecord {
            record: LogicalRecord {
                sequence_number: "1".into(),
                case_number: Some("ABC/12/2024".into()),
                parties: "X Versus Y".into(),
                petitioner_advocates: vec!["Adv1".into(), "Adv2".into()],
                respondent_advocates: vec![],
            },
            status: CaseStatus::Valid {
                lookup_key: "ABC/12/2024".into(),
            },
        }
    }

    #[test]
    fn test_cleaned_table_lines() {
        let data = tempfile::tempdir().unwrap();
        let artifacts = RunArtifacts::create(data.path(), false).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();

        let path = artifacts.write_cleaned_table("gauhati", date, &[record()]).unwrap();

        assert!(path.ends_with("gauhati_2024-05-02.ndjson"));
        let content = fs::read_to_string(&path).unwrap();
        let line: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(line["Case Number"], "ABC/12/2024");
        assert_eq!(line["Petitioner Advocate"], "Adv1; Adv2");
        assert_eq!(line["Respondent Advocate"], "");
    }

    #[test]
    fn test_finish_removes_run_directory_unless_kept() {
        let data = tempfile::tempdir().unwrap();

        let dropped = RunArtifacts::create(data.path(), false).unwrap();
        let dropped_dir = dropped.dir().to_path_buf();
        dropped.finish();
        assert!(!dropped_dir.exists());

        let kept = RunArtifacts::create(data.path(), true).unwrap();
        let kept_dir = kept.dir().to_path_buf();
        kept.finish();
        assert!(kept_dir.exists());
    }
}
