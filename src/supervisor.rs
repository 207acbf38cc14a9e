use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{Duration, Instant, timeout};

use crate::backend::{Backend, LoadError};
use crate::domain::{ExecutionResult, Language, RuntimeHandle, StandardInput};
use crate::loader::RuntimeLoader;

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Owns one execution end to end: backend lookup, lazy warm-up, the
/// timeout race, and normalization of every outcome into exactly one
/// `ExecutionResult`. Grading must never hang on an infinite loop.
#[derive(Clone, Debug)]
pub struct Supervisor {
    backends: HashMap<Language, Arc<dyn Backend>>,
    loader: Arc<RuntimeLoader>,
}

impl Supervisor {
    pub fn new(backends: impl IntoIterator<Item = Arc<dyn Backend>>) -> Self {
        Self {
            backends: backends
                .into_iter()
                .map(|backend| (backend.language(), backend))
                .collect(),
            loader: Arc::new(RuntimeLoader::new()),
        }
    }

    pub async fn ensure_ready(&self, language: Language) -> Result<RuntimeHandle, LoadError> {
        let backend = self
            .backends
            .get(&language)
            .ok_or(LoadError::Unsupported { language })?;
        self.loader.ensure_ready(backend.as_ref()).await
    }

    pub fn is_ready(&self, language: Language) -> bool {
        self.loader.is_ready(language)
    }

    pub fn runtime_handle(&self, language: Language) -> Option<RuntimeHandle> {
        self.loader.handle(language)
    }

    #[tracing::instrument(skip(source, input))]
    pub async fn run(
        &self,
        language: Language,
        source: &str,
        input: &StandardInput,
        timeout_ms: u64,
    ) -> ExecutionResult {
        if source.trim().is_empty() {
            return ExecutionResult::empty_program();
        }

        let Some(backend) = self.backends.get(&language) else {
            return ExecutionResult::setup_error(format!("unsupported language: {language}"));
        };

        // Warm-up is amortized across executions and therefore sits outside
        // the per-execution timeout budget.
        if let Err(e) = self.loader.ensure_ready(backend.as_ref()).await {
            return ExecutionResult::setup_error(e.to_string());
        }

        let started_at = Utc::now();
        let started = Instant::now();

        match timeout(
            Duration::from_millis(timeout_ms),
            backend.execute(source, input),
        )
        .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!("Backend internal failure: {e}");
                ExecutionResult::failed(
                    e.to_string(),
                    String::new(),
                    String::new(),
                    started.elapsed().as_millis() as u64,
                    started_at,
                )
            }
            // The losing execute future is dropped here; kill_on_drop reaps
            // its child, so nothing bleeds into a later call.
            Err(_) => {
                tracing::warn!("Execution exceeded {timeout_ms}ms, abandoned");
                ExecutionResult::timed_out(timeout_ms, started_at)
            }
        }
    }
}
