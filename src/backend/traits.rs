use crate::domain::{ExecutionResult, Language, RuntimeHandle, StandardInput};

#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error("no backend registered for language: {language}")]
    Unsupported { language: Language },
    #[error("interpreter not available: {msg}")]
    InterpreterUnavailable { msg: String },
    #[error("runtime probe failed: {msg}")]
    ProbeFailed { msg: String },
}

/// The sandbox machinery itself broke (scratch dir, spawn, pipe I/O).
/// Distinct from a program that ran and failed, which is still a captured
/// `ExecutionResult`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecuteError {
    #[error("sandbox setup failed: {msg}")]
    Sandbox { msg: String },
    #[error("failed to launch interpreter: {msg}")]
    FailedToLaunch { msg: String },
}

#[mockall::automock]
#[async_trait::async_trait]
pub trait Backend: std::fmt::Debug + Send + Sync {
    fn language(&self) -> Language;

    /// One-time runtime initialization. Called through the loader, which
    /// guarantees single-flight per language.
    async fn warm_up(&self) -> Result<RuntimeHandle, LoadError>;

    /// Runs a program to completion against a fresh capture channel.
    /// Only called after `warm_up` has resolved for this language.
    async fn execute(
        &self,
        source: &str,
        input: &StandardInput,
    ) -> Result<ExecutionResult, ExecuteError>;
}
