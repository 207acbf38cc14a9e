use std::time::Duration;

use chrono::Utc;

use crate::backend::traits::{Backend, ExecuteError, LoadError};
use crate::domain::{ExecutionResult, Language, RuntimeHandle, StandardInput};

/// Canned backend for service and supervisor tests: fixed results, fixed
/// execution delay, no real interpreter. Warm-up answers immediately so a
/// slow-execution stub never stalls the caller before the timed part.
#[derive(Debug, Clone)]
pub struct BackendStub {
    language: Language,
    warm_up_result: Result<RuntimeHandle, LoadError>,
    execute_result: Result<ExecutionResult, ExecuteError>,
    delay: Duration,
}

impl BackendStub {
    pub fn new(
        language: Language,
        execute_result: Result<ExecutionResult, ExecuteError>,
        delay: Duration,
    ) -> Self {
        Self {
            language,
            warm_up_result: Ok(ready_handle(language)),
            execute_result,
            delay,
        }
    }

    pub fn with_warm_up(mut self, result: Result<RuntimeHandle, LoadError>) -> Self {
        self.warm_up_result = result;
        self
    }
}

pub fn ready_handle(language: Language) -> RuntimeHandle {
    RuntimeHandle {
        language,
        interpreter_version: "0.0.0-stub".to_string(),
        warmed_at: Utc::now(),
    }
}

#[async_trait::async_trait]
impl Backend for BackendStub {
    fn language(&self) -> Language {
        self.language
    }

    #[tracing::instrument]
    async fn warm_up(&self) -> Result<RuntimeHandle, LoadError> {
        tracing::debug!("Warm-up result: {:?}", self.warm_up_result);
        self.warm_up_result.clone()
    }

    #[tracing::instrument(skip(source, input))]
    async fn execute(
        &self,
        source: &str,
        input: &StandardInput,
    ) -> Result<ExecutionResult, ExecuteError> {
        tracing::debug!(
            "Start execution: source={:?}, input={:?}, delay={:?}",
            source,
            input,
            self.delay
        );
        tokio::time::sleep(self.delay).await;
        tracing::debug!("Execution result: {:?}", self.execute_result);
        self.execute_result.clone()
    }
}
