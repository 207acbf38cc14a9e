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

/// Sandboxed-script backend: one Node.js subprocess per execution.
///
/// Same containment as the Python backend: cleared environment, throwaway
/// scratch cwd, rlimits, SIGKILL on drop. The script is materialized as a
/// file so the interpreter, not this process, owns parsing.
#[derive(Clone, Debug)]
pub struct ScriptBackend {
    interpreter: PathBuf,
    scratch_root: PathBuf,
}

impl ScriptBackend {
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

/// Node prints the frame context first and a version footer last; the
/// useful line is the first `SomethingError: message` one.
fn diagnostic(stderr: &str) -> Option<String> {
    let named_error = stderr.lines().find(|line| {
        let head = line.trim_start();
        head.split_once(':')
            .is_some_and(|(name, _)| !name.is_empty() && name.chars().all(char::is_alphanumeric) && name.ends_with("Error"))
    });
    if let Some(line) = named_error {
        return Some(line.trim().to_string());
    }

    stderr
        .lines()
        .rev()
        .find(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with("Node.js v") && !line.starts_with("at ")
        })
        .map(|line| line.trim().to_string())
}

#[async_trait::async_trait]
impl Backend for ScriptBackend {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    #[tracing::instrument]
    async fn warm_up(&self) -> Result<RuntimeHandle, LoadError> {
        let out = Command::new(&self.interpreter)
            .arg("--version")
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

        let version = String::from_utf8_lossy(&out.stdout)
            .trim()
            .trim_start_matches('v')
            .to_string();
        let handle = RuntimeHandle {
            language: Language::JavaScript,
            interpreter_version: version,
            warmed_at: Utc::now(),
        };
        tracing::info!("JavaScript runtime ready: {}", handle.interpreter_version);
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
        let source_path = scratch.join("main.js");

        fs::write(&source_path, source)
            .await
            .map_err(|e| ExecuteError::Sandbox { msg: e.to_string() })?;

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("--no-warnings")
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

#[cfg(test)]
mod tests {
    use std::path::Path;

    use uuid::Uuid;

    use super::*;

    fn node_path() -> String {
        std::env::var("NODEJS_PATH").unwrap_or_else(|_| "/usr/bin/node".to_string())
    }

    fn backend() -> ScriptBackend {
        let scratch = format!("/tmp/autograder_test_{}", Uuid::new_v4());
        ScriptBackend::new(node_path(), Path::new(&scratch))
    }

    #[test]
    fn test_diagnostic_picks_named_error_line() {
        let stderr = "/tmp/main.js:1\nthrow new Error(\"boom\");\n^\n\nError: boom\n    at Object.<anonymous>\n\nNode.js v20.11.0\n";
        assert_eq!(diagnostic(stderr).as_deref(), Some("Error: boom"));
    }

    #[tokio::test]
    async fn test_warm_up_reports_version() {
        let handle = backend().warm_up().await.expect("warm_up should succeed");
        assert_eq!(handle.language, Language::JavaScript);
        assert!(!handle.interpreter_version.starts_with('v'));
        assert!(!handle.interpreter_version.is_empty());
    }

    #[tokio::test]
    async fn test_execute_reads_stdin_and_prints_uppercase() {
        let source = r#"
const text = require('fs').readFileSync(0, 'utf8');
process.stdout.write(text.trim().toUpperCase() + "\n");
"#;
        let result = backend()
            .execute(source, &StandardInput::from_text("hello"))
            .await
            .unwrap();

        assert!(result.success, "stderr: {}", result.stderr);
        assert_eq!(result.stdout, "HELLO\n");
    }

    #[tokio::test]
    async fn test_execute_preserves_partial_output_on_throw() {
        let source = r#"console.log("before"); throw new Error("boom");"#;
        let result = backend()
            .execute(source, &StandardInput::empty())
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.stdout, "before\n");
        assert!(result.error.as_deref().unwrap().contains("Error"));
    }

    #[tokio::test]
    async fn test_execute_hides_host_environment() {
        let source = r#"console.log(process.env.HOME === undefined, process.env.PATH === undefined);"#;
        let result = backend()
            .execute(source, &StandardInput::empty())
            .await
            .unwrap();

        assert!(result.success, "stderr: {}", result.stderr);
        assert_eq!(result.stdout, "true true\n");
    }
}
