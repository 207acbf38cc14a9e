use chrono::{DateTime, Utc};
use itertools::Itertools;

use crate::constants::{EMPTY_PROGRAM, EXECUTION_TIMED_OUT};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered lines a program may consume through its line-read primitives.
/// Each execution renders its own text copy, so one input can back any
/// number of executions without a shared cursor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StandardInput {
    lines: Vec<String>,
}

impl StandardInput {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            return Self::empty();
        }
        Self {
            lines: text
                .trim_end_matches('\n')
                .split('\n')
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Text as the program sees it on stdin: newline-terminated lines.
    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            String::new()
        } else {
            format!("{}\n", self.lines.iter().join("\n"))
        }
    }
}

impl From<&str> for StandardInput {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

/// Outcome of a single execution attempt. Exactly one of these is produced
/// per attempt, timeouts and internal failures included.
#[derive(Clone, Debug)]
pub struct ExecutionResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn completed(
        stdout: String,
        stderr: String,
        duration_ms: u64,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            success: true,
            stdout,
            stderr,
            duration_ms,
            error: None,
            started_at,
        }
    }

    pub fn failed(
        error: impl Into<String>,
        stdout: String,
        stderr: String,
        duration_ms: u64,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            success: false,
            stdout,
            stderr,
            duration_ms,
            error: Some(error.into()),
            started_at,
        }
    }

    /// Invalid input rejected before the backend was ever invoked.
    pub fn setup_error(error: impl Into<String>) -> Self {
        Self::failed(error, String::new(), String::new(), 0, Utc::now())
    }

    pub fn empty_program() -> Self {
        Self::setup_error(EMPTY_PROGRAM)
    }

    pub fn timed_out(timeout_ms: u64, started_at: DateTime<Utc>) -> Self {
        Self::failed(
            EXECUTION_TIMED_OUT,
            String::new(),
            String::new(),
            timeout_ms,
            started_at,
        )
    }
}

#[derive(Clone, Debug)]
pub struct TestCase {
    pub input: StandardInput,
    pub expected_stdout: String,
}

#[derive(Clone, Debug)]
pub struct TestCaseResult {
    pub passed: bool,
    pub input: StandardInput,
    pub expected: String,
    pub actual: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Per-language singleton describing an initialized runtime. Lives for the
/// process lifetime once ready.
#[derive(Clone, Debug)]
pub struct RuntimeHandle {
    pub language: Language,
    pub interpreter_version: String,
    pub warmed_at: DateTime<Utc>,
}
