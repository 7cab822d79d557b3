use super::{parse_ndjson_rows, TableExtractor};
use crate::config::ExtractorConfig;
use crate::error::{CauseListError, Result};
use crate::types::{PageRange, RawRow};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Runs an external table extractor per page range.
///
/// `{pdf}` and `{pages}` in the configured arguments are replaced with the
/// document path and the range (`2-50`). The program must print one JSON
/// array of cell strings per table row on stdout.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    fn render_args(&self, pdf: &Path, pages: PageRange) -> Vec<String> {
        let pdf = pdf.to_string_lossy();
        let pages = pages.to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{pdf}", &pdf).replace("{pages}", &pages))
            .collect()
    }
}

#[async_trait]
impl TableExtractor for CommandExtractor {
    async fn extract_page_range(&self, pdf: &Path, pages: PageRange) -> Result<Vec<RawRow>> {
        let args = self.render_args(pdf, pages);
        debug!("Running {} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CauseListError::Extraction {
                pages: pages.to_string(),
                message: format!("failed to start {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            return Err(CauseListError::Extraction {
                pages: pages.to_string(),
                message: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        parse_ndjson_rows(&String::from_utf8_lossy(&output.stdout), pages)
    }
}
