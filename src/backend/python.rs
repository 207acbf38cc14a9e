use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::Utc;
use tokio::time::Instant;
use tokio::{fs, process::Command};

use crate::backend::sandbox;
use crate::backend::scratch::ScratchDir;
use crate::backend::traits::{Backend, ExecuteError, LoadError};
use crate::capture;
use crate::domain::{ExecutionResult, Language, RuntimeHandle, StandardInput};

/// Interpreted-dynamic backend: one CPython subprocess per execution.
///
/// Containment: isolated interpreter mode (`-I`), cleared environment, a
/// throwaway scratch directory as cwd, rlimits, and SIGKILL on drop so an
/// abandoned (timed-out) execution cannot outlive its supervisor.
#[derive(Clone, Debug)]
pub struct PythonBackend {
    interpreter: PathBuf,
    scratch_root: PathBuf,
}

impl PythonBackend {
    pub fn new<I, S>(interpreter: I, scratch_root: S) -> Self
    where
        I: AsRef<Path>,
        S: AsRef<Path>,
    {
        Self {
            interpreter: interpreter.as_ref().into(),
            scratch_root: scratch_root.as_ref().into(),
        }
    }
}

/// The last non-empty traceback line carries the exception, e.g.
/// `NameError: name 'x' is not defined`.
fn diagnostic(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(str::to_string)
}

#[async_trait::async_trait]
impl Backend for PythonBackend {
    fn language(&self) -> Language {
        Language::Python
    }

    #[tracing::instrument]
    async fn warm_up(&self) -> Result<RuntimeHandle, LoadError> {
        let out = Command::new(&self.interpreter)
            .arg("-I")
            .arg("-c")
            .arg("import sys; print(sys.version.split()[0])")
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| LoadError::InterpreterUnavailable { msg: e.to_string() })?;

        if !out.status.success() {
            return Err(LoadError::ProbeFailed {
                msg: String::from_utf8_lossy(&out.stderr).to_string(),
            });
        }

        let handle = RuntimeHandle {
            language: Language::Python,
            interpreter_version: String::from_utf8_lossy(&out.stdout).trim().to_string(),
            warmed_at: Utc::now(),
        };
        tracing::info!("Python runtime ready: {}", handle.interpreter_version);
        Ok(handle)
    }

    #[tracing::instrument(skip(source, input))]
    async fn execute(
        &self,
        source: &str,
        input: &StandardInput,
    ) -> Result<ExecutionResult, ExecuteError> {
        // The guard removes the directory on drop, so an execution the
        // supervisor abandons on timeout still reclaims its scratch space.
        let scratch = ScratchDir::create(&self.scratch_root)
            .await
            .map_err(|e| ExecuteError::Sandbox { msg: e.to_string() })?;
        let source_path = scratch.join("main.py");

        fs::write(&source_path, source)
            .await
            .map_err(|e| ExecuteError::Sandbox { msg: e.to_string() })?;

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("-I")
            .arg("-B")
            .arg(&source_path)
            .env_clear()
            .current_dir(scratch.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        sandbox::apply_rlimits(&mut cmd);

        let started_at = Utc::now();
        let started = Instant::now();

        let child = cmd
            .spawn()
            .map_err(|e| ExecuteError::FailedToLaunch { msg: e.to_string() })?;

        let captured = capture::drive(child, input).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let captured = captured.map_err(|e| ExecuteError::Sandbox { msg: e.to_string() })?;
        tracing::debug!("Execution finished: status={:?}", captured.status);

        if captured.status.success() {
            Ok(ExecutionResult::completed(
                captured.stdout,
                captured.stderr,
                duration_ms,
                started_at,
            ))
        } else {
            let error = diagnostic(&captured.stderr).unwrap_or_else(|| match captured.status.code()
            {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".to_string(),
            });
            Ok(ExecutionResult::failed(
                error,
                captured.stdout,
                captured.stderr,
                duration_ms,
                started_at,
            ))
        }
    }
}
