use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::backend::{Backend, LoadError};
use crate::domain::{Language, RuntimeHandle};

/// Single-flight warm-up of language runtimes.
///
/// Showing N questions of one language in quick succession triggers N
/// `ensure_ready` calls; all of them must share one underlying load. A
/// failed load leaves the cell empty so a later call can retry.
#[derive(Debug, Default)]
pub struct RuntimeLoader {
    runtimes: DashMap<Language, Arc<OnceCell<RuntimeHandle>>>,
}

impl RuntimeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    #[tracing::instrument(skip(backend), fields(language = %backend.language()))]
    pub async fn ensure_ready(&self, backend: &dyn Backend) -> Result<RuntimeHandle, LoadError> {
        // Clone the cell out so the map shard lock is not held across await.
        let cell = self
            .runtimes
            .entry(backend.language())
            .or_default()
            .clone();

        let handle = cell.get_or_try_init(|| backend.warm_up()).await?;
        Ok(handle.clone())
    }

    pub fn is_ready(&self, language: Language) -> bool {
        self.runtimes
            .get(&language)
            .map(|cell| cell.initialized())
            .unwrap_or(false)
    }

    pub fn handle(&self, language: Language) -> Option<RuntimeHandle> {
        self.runtimes
            .get(&language)
            .and_then(|cell| cell.get().cloned())
    }
}
