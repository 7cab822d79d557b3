use thiserror::Error;

#[derive(Error, Debug)]
pub enum CauseListError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Date parse error: {0}")]
    Date(#[from] chrono::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Listing or download failed for a source; aborts that source for the run.
    #[error("Navigation failed for source {source_id}: {message}")]
    Navigation { source_id: String, message: String },

    /// One page-range chunk could not be extracted.
    #[error("Extraction failed for pages {pages}: {message}")]
    Extraction { pages: String, message: String },

    /// Persistence unreachable while reading watermarks or watchers.
    #[error("Lookup failed: {0}")]
    Lookup(String),

    #[error("Delivery to {address} failed: {message}")]
    Delivery { address: String, message: String },
}

impl CauseListError {
    pub fn navigation(source_id: &str, message: impl std::fmt::Display) -> Self {
        CauseListError::Navigation {
            source_id: source_id.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CauseListError>;
