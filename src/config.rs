use crate::constants::{
    ALLAHABAD_CASE_PATTERN, ALLAHABAD_DATE_FORMAT, ALLAHABAD_DISPLAY_NAME, ALLAHABAD_FORM_URL,
    ALLAHABAD_LISTING_URL, ALLAHABAD_SOURCE, DEFAULT_CHUNK_SIZE, DEFAULT_FIRST_PAGE,
    DEFAULT_SUBJECT, GAUHATI_CASE_PATTERN, GAUHATI_DATE_FORMAT, GAUHATI_DISPLAY_NAME,
    GAUHATI_LISTING_URL, GAUHATI_SOURCE,
};
use crate::error::{CauseListError, Result};
use crate::reconstruct::StartMarker;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub extractor: ExtractorConfig,
    pub mail: MailConfig,
    pub storage: StorageConfig,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub chunk_size: u32,
    pub first_page: u32,
    /// Extraction workers; 0 means one per available CPU.
    pub workers: usize,
    pub data_dir: PathBuf,
    pub keep_artifacts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            first_page: DEFAULT_FIRST_PAGE,
            workers: 0,
            data_dir: PathBuf::from("data"),
            keep_artifacts: false,
        }
    }
}

impl PipelineConfig {
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// External table extraction command. `{pdf}` and `{pages}` are substituted
/// in each argument; stdout is one JSON array of cell strings per line.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            program: "causelist-extract".to_string(),
            args: vec!["--pages".to_string(), "{pages}".to_string(), "{pdf}".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MailConfig {
    pub api_url: String,
    pub from: String,
    pub subject: String,
    /// Bearer key; normally supplied through MAIL_API_KEY.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.resend.com/emails".to_string(),
            from: String::new(),
            subject: DEFAULT_SUBJECT.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database: PathBuf,
    pub pushgateway_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("data/causelist.db"),
            pushgateway_url: None,
        }
    }
}

/// Continuation markers that drive row merges for one source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Words that join the two sides of a case title (case-insensitive, whole words).
    pub join_markers: Vec<String>,
    /// Substrings that mark a fragment as the opposing side ("THE STATE ...").
    pub join_keywords: Vec<String>,
    pub party_separator: String,
    pub with_group_marker: String,
    pub in_reference_marker: String,
    pub list_separator: String,
    /// Row patterns dropped before reconstruction, matched on the joined row text.
    pub boilerplate: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            join_markers: vec!["Versus".to_string(), "vs".to_string(), "V.".to_string()],
            join_keywords: vec!["THE ".to_string()],
            party_separator: " vs ".to_string(),
            with_group_marker: "WITH".to_string(),
            in_reference_marker: "in ".to_string(),
            list_separator: "; ".to_string(),
            boilerplate: vec![
                r"(?i)^\s*s(?:r)?\.?\s*no\b".to_string(),
                r"(?i)^\s*page\s+\d+(?:\s+of\s+\d+)?\s*$".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Case number column after empty columns are dropped.
    pub case_column: usize,
    /// Detect the case column from the document instead of using `case_column`.
    pub detect_case_column: bool,
    pub start_marker: StartMarker,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            case_column: 1,
            detect_case_column: false,
            start_marker: StartMarker::Numeric,
        }
    }
}

/// Form submission used by sources that hand out documents per selected date.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FormConfig {
    pub url: String,
    pub date_field: String,
    pub extra_fields: Vec<(String, String)>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            url: ALLAHABAD_FORM_URL.to_string(),
            date_field: "causelistdate".to_string(),
            extra_fields: vec![("listtype".to_string(), "C".to_string())],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    /// Adapter implementation: "gauhati" or "allahabad".
    pub kind: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub listing_url: String,
    pub date_format: String,
    pub case_pattern: String,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub form: FormConfig,
}

fn enabled_by_default() -> bool {
    true
}

impl SourceConfig {
    /// Built-in configuration for a known jurisdiction.
    pub fn builtin(kind: &str) -> Option<Self> {
        match kind {
            GAUHATI_SOURCE => Some(Self {
                id: GAUHATI_SOURCE.to_string(),
                name: GAUHATI_DISPLAY_NAME.to_string(),
                kind: GAUHATI_SOURCE.to_string(),
                enabled: true,
                listing_url: GAUHATI_LISTING_URL.to_string(),
                date_format: GAUHATI_DATE_FORMAT.to_string(),
                case_pattern: GAUHATI_CASE_PATTERN.to_string(),
                rules: RulesConfig::default(),
                layout: LayoutConfig::default(),
                form: FormConfig::default(),
            }),
            ALLAHABAD_SOURCE => Some(Self {
                id: ALLAHABAD_SOURCE.to_string(),
                name: ALLAHABAD_DISPLAY_NAME.to_string(),
                kind: ALLAHABAD_SOURCE.to_string(),
                enabled: true,
                listing_url: ALLAHABAD_LISTING_URL.to_string(),
                date_format: ALLAHABAD_DATE_FORMAT.to_string(),
                case_pattern: ALLAHABAD_CASE_PATTERN.to_string(),
                rules: RulesConfig::default(),
                layout: LayoutConfig {
                    detect_case_column: true,
                    ..LayoutConfig::default()
                },
                form: FormConfig::default(),
            }),
            _ => None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path).map_err(|e| {
            CauseListError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&config_content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.fill_builtin_sources();
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise run with built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            return Self::load(path);
        }
        warn!("No config file at {}, using built-in defaults", path.display());
        let mut config = Self::default();
        config.fill_builtin_sources();
        Ok(config)
    }

    fn fill_builtin_sources(&mut self) {
        if self.sources.is_empty() {
            self.sources = crate::constants::get_supported_sources()
                .into_iter()
                .filter_map(SourceConfig::builtin)
                .collect();
        }
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline.chunk_size == 0 {
            return Err(CauseListError::Config("pipeline.chunk_size must be at least 1".into()));
        }
        if self.pipeline.first_page == 0 {
            return Err(CauseListError::Config("pipeline.first_page is 1-based".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.id.as_str()) {
                return Err(CauseListError::Config(format!("duplicate source id '{}'", source.id)));
            }
        }
        Ok(())
    }

    /// Environment overrides (after dotenv has loaded `.env`). Env wins over file.
    pub fn apply_env(&mut self) {
        if let Ok(db) = std::env::var("CAUSELIST_DB") {
            self.storage.database = PathBuf::from(db);
        }
        if let Ok(url) = std::env::var("CAUSELIST_PUSHGATEWAY_URL") {
            if !url.trim().is_empty() {
                self.storage.pushgateway_url = Some(url);
            }
        }
        if let Ok(key) = std::env::var("MAIL_API_KEY") {
            self.mail.api_key = Some(key);
        }
        if let Ok(from) = std::env::var("MAIL_FROM") {
            self.mail.from = from;
        }
        if let Ok(url) = std::env::var("MAIL_API_URL") {
            self.mail.api_url = url;
        }
    }

    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_builtin_sources() {
        let config = Config::from_toml("").unwrap();
        let ids: Vec<&str> = config.sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["gauhati", "allahabad"]);
        assert_eq!(config.pipeline.chunk_size, 50);
        assert_eq!(config.pipeline.first_page, 2);
        assert_eq!(config.mail.subject, "Case Notification");
    }

    #[test]
    fn test_source_rule_table_overrides() {
        let config = Config::from_toml(
            r#"
            [pipeline]
            chunk_size = 25
            workers = 3

            [[sources]]
            id = "ghc"
            name = "Gauhati"
            kind = "gauhati"
            listing_url = "https://example.test/list"
            date_format = "%d/%m/%Y"
            case_pattern = '^[A-Z()]+/\d+/\d{4}$'

            [sources.rules]
            join_markers = ["Versus"]
            party_separator = " v. "
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.chunk_size, 25);
        assert_eq!(config.pipeline.worker_count(), 3);
        assert_eq!(config.sources.len(), 1);
        let source = &config.sources[0];
        assert!(source.enabled);
        assert_eq!(source.rules.join_markers, vec!["Versus"]);
        assert_eq!(source.rules.party_separator, " v. ");
        // untouched rule fields keep their defaults
        assert_eq!(source.rules.with_group_marker, "WITH");
        assert_eq!(source.layout.start_marker, StartMarker::Numeric);
    }

    #[test]
    fn test_rejects_zero_chunk_size_and_duplicate_ids() {
        assert!(Config::from_toml("[pipeline]\nchunk_size = 0\n").is_err());

        let dup = r#"
            [[sources]]
            id = "a"
            name = "A"
            kind = "gauhati"
            listing_url = "u"
            date_format = "%d/%m/%Y"
            case_pattern = "x"

            [[sources]]
            id = "a"
            name = "B"
            kind = "gauhati"
            listing_url = "u"
            date_format = "%d/%m/%Y"
            case_pattern = "x"
        "#;
        assert!(Config::from_toml(dup).is_err());
    }
}
