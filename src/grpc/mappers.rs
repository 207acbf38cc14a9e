use crate::domain;
use crate::grpc::models;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConversionError {
    #[error("language is unspecified or unknown")]
    UnknownLanguage,
}

impl TryFrom<models::Language> for domain::Language {
    type Error = ConversionError;

    fn try_from(value: models::Language) -> Result<Self, Self::Error> {
        match value {
            models::Language::Python => Ok(domain::Language::Python),
            models::Language::Javascript => Ok(domain::Language::JavaScript),
            models::Language::Unspecified => Err(ConversionError::UnknownLanguage),
        }
    }
}

impl From<domain::Language> for models::Language {
    fn from(value: domain::Language) -> Self {
        match value {
            domain::Language::Python => models::Language::Python,
            domain::Language::JavaScript => models::Language::Javascript,
        }
    }
}

/// Raw enum tag from the wire, as prost hands it to us.
pub fn language_from_raw(raw: i32) -> Result<domain::Language, ConversionError> {
    models::Language::try_from(raw)
        .map_err(|_| ConversionError::UnknownLanguage)?
        .try_into()
}

impl From<domain::ExecutionResult> for models::ExecutionResult {
    fn from(result: domain::ExecutionResult) -> Self {
        models::ExecutionResult {
            success: result.success,
            stdout: result.stdout,
            stderr: result.stderr,
            duration_ms: result.duration_ms,
            error: result.error,
            started_at: Some(models::chrono_to_prost(result.started_at)),
        }
    }
}

impl From<models::TestCase> for domain::TestCase {
    fn from(case: models::TestCase) -> Self {
        domain::TestCase {
            input: domain::StandardInput::new(case.stdin_lines),
            expected_stdout: case.expected_stdout,
        }
    }
}

pub fn test_case_result_to_proto(
    case_index: u32,
    result: domain::TestCaseResult,
) -> models::TestCaseResult {
    models::TestCaseResult {
        case_index,
        passed: result.passed,
        stdin_lines: result.input.lines().to_vec(),
        expected: result.expected,
        actual: result.actual,
        duration_ms: result.duration_ms,
        error: result.error,
    }
}
