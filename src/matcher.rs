use crate::error::{CauseListError, Result};
use crate::storage::WatcherDirectory;
use crate::types::Watcher;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Resolves a validated case number to the set of watchers to notify.
#[derive(Clone)]
pub struct WatcherMatcher {
    directory: Arc<dyn WatcherDirectory>,
}

impl WatcherMatcher {
    pub fn new(directory: Arc<dyn WatcherDirectory>) -> Self {
        Self { directory }
    }

    /// Unmatched records (no lookup key) resolve to nobody without touching the
    /// directory. A directory failure is a `Lookup` error for the caller to abort on.
    pub async fn resolve(&self, lookup_key: Option<&str>) -> Result<BTreeSet<Watcher>> {
        let Some(case_number) = lookup_key else {
            return Ok(BTreeSet::new());
        };

        let watchers = self
            .directory
            .find_watchers(case_number)
            .await
            .map_err(|e| match e {
                CauseListError::Lookup(_) => e,
                other => CauseListError::Lookup(other.to_string()),
            })?;

        let set: BTreeSet<Watcher> = watchers.into_iter().collect();
        debug!("Case {} has {} watcher(s)", case_number, set.len());
        Ok(set)
    }
}
