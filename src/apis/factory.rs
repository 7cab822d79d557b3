use super::allahabad::AllahabadCourt;
use super::gauhati::GauhatiCourt;
use crate::config::SourceConfig;
use crate::constants;
use crate::error::{CauseListError, Result};
use crate::types::CourtSource;
use std::sync::Arc;

/// Build the adapter for a configured source, chosen by `kind`.
pub fn create_source(config: &SourceConfig, client: reqwest::Client) -> Result<Arc<dyn CourtSource>> {
    match config.kind.as_str() {
        constants::GAUHATI_SOURCE => Ok(Arc::new(GauhatiCourt::new(config, client)?)),
        constants::ALLAHABAD_SOURCE => Ok(Arc::new(AllahabadCourt::new(config, client)?)),
        other => Err(CauseListError::Config(format!(
            "unknown source kind '{}' for source '{}' (supported: {})",
            other,
            config.id,
            constants::get_supported_sources().join(", ")
        ))),
    }
}
