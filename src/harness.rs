use crate::domain::{ExecutionResult, Language, TestCase, TestCaseResult};
use crate::supervisor::Supervisor;

/// Grades one program against N test cases through the supervisor. Cases
/// run independently and in input order; a failing or timed-out case never
/// aborts the rest, so authors always get full diagnostic coverage.
#[derive(Clone, Debug)]
pub struct Harness {
    supervisor: Supervisor,
}

impl Harness {
    pub fn new(supervisor: Supervisor) -> Self {
        Self { supervisor }
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    #[tracing::instrument(skip(self, source, cases))]
    pub async fn run_tests(
        &self,
        language: Language,
        source: &str,
        cases: &[TestCase],
        timeout_ms: u64,
    ) -> Vec<TestCaseResult> {
        let mut results = Vec::with_capacity(cases.len());
        for case in cases {
            results.push(self.run_case(language, source, case, timeout_ms).await);
        }
        results
    }

    pub async fn run_case(
        &self,
        language: Language,
        source: &str,
        case: &TestCase,
        timeout_ms: u64,
    ) -> TestCaseResult {
        let run = self
            .supervisor
            .run(language, source, &case.input, timeout_ms)
            .await;
        grade(case, run)
    }
}

/// Comparison rule: trailing-whitespace-insensitive, case-sensitive, no
/// other normalization. This is a grading-semantics contract visible to
/// teachers; do not "improve" it.
pub fn grade(case: &TestCase, run: ExecutionResult) -> TestCaseResult {
    let passed = run.success && run.stdout.trim_end() == case.expected_stdout.trim_end();
    TestCaseResult {
        passed,
        input: case.input.clone(),
        expected: case.expected_stdout.clone(),
        actual: run.stdout,
        duration_ms: run.duration_ms,
        error: run.error,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use itertools::Itertools;

    use super::*;
    use crate::backend::stubs::BackendStub;
    use crate::backend::{Backend, ExecuteError};
    use crate::constants::EMPTY_PROGRAM;
    use crate::domain::StandardInput;

    /// Pretends the graded program uppercases its entire stdin.
    #[derive(Debug)]
    struct UppercaseBackend;

    #[async_trait::async_trait]
    impl Backend for UppercaseBackend {
        fn language(&self) -> Language {
            Language::Python
        }

        async fn warm_up(
            &self,
        ) -> Result<crate::domain::RuntimeHandle, crate::backend::LoadError> {
            Ok(crate::backend::stubs::ready_handle(Language::Python))
        }

        async fn execute(
            &self,
            _source: &str,
            input: &StandardInput,
        ) -> Result<ExecutionResult, ExecuteError> {
            Ok(ExecutionResult::completed(
                input.render().to_uppercase(),
                String::new(),
                3,
                Utc::now(),
            ))
        }
    }

    fn case(input: &str, expected: &str) -> TestCase {
        TestCase {
            input: StandardInput::from_text(input),
            expected_stdout: expected.to_string(),
        }
    }

    fn uppercase_harness() -> Harness {
        Harness::new(Supervisor::new(vec![
            Arc::new(UppercaseBackend) as Arc<dyn Backend>
        ]))
    }

    #[tokio::test]
    async fn test_empty_case_list_yields_empty_results() {
        let harness = uppercase_harness();
        let results = harness
            .run_tests(Language::Python, "whatever", &[], 1000)
            .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_trailing_newline_is_ignored_in_comparison() {
        // The program prints "42\n"; the teacher typed "42" with no newline.
        let stub = BackendStub::new(
            Language::Python,
            Ok(ExecutionResult::completed(
                "42\n".to_string(),
                String::new(),
                2,
                Utc::now(),
            )),
            Duration::from_millis(1),
        );
        let harness = Harness::new(Supervisor::new(vec![Arc::new(stub) as Arc<dyn Backend>]));

        let results = harness
            .run_tests(Language::Python, "print(42)", &[case("", "42")], 1000)
            .await;

        assert_eq!(results.len(), 1);
        assert!(results[0].passed);
        assert_eq!(results[0].actual, "42\n");
    }

    #[tokio::test]
    async fn test_comparison_stays_case_sensitive() {
        let harness = uppercase_harness();
        let results = harness
            .run_tests(Language::Python, "src", &[case("hello", "hello")], 1000)
            .await;

        assert!(!results[0].passed);
        assert_eq!(results[0].actual, "HELLO\n");
    }

    #[tokio::test]
    async fn test_results_keep_input_order_and_independence() {
        let harness = uppercase_harness();
        let cases = vec![
            case("hello", "HELLO"),
            case("world", "deliberately wrong"),
            case("again", "AGAIN"),
        ];

        let results = harness
            .run_tests(Language::Python, "src", &cases, 1000)
            .await;

        assert_eq!(results.len(), cases.len());
        for (case, result) in cases.iter().zip_eq(&results) {
            assert_eq!(result.expected, case.expected_stdout);
            assert_eq!(result.input, case.input);
        }
        assert!(results[0].passed);
        assert!(!results[1].passed);
        assert!(results[2].passed, "a wrong case must not abort later cases");
        assert_eq!(results[1].actual, "WORLD\n");
    }

    #[tokio::test]
    async fn test_broken_program_fails_every_case_with_same_error() {
        let stub = BackendStub::new(
            Language::Python,
            Ok(ExecutionResult::failed(
                "SyntaxError: invalid syntax",
                String::new(),
                String::new(),
                2,
                Utc::now(),
            )),
            Duration::from_millis(1),
        );
        let harness = Harness::new(Supervisor::new(vec![Arc::new(stub) as Arc<dyn Backend>]));

        let cases = vec![case("1", "1"), case("2", "2")];
        let results = harness
            .run_tests(Language::Python, "def broken(:", &cases, 1000)
            .await;

        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(!result.passed);
            assert_eq!(result.error.as_deref(), Some("SyntaxError: invalid syntax"));
        }
    }

    #[tokio::test]
    async fn test_blank_source_fails_cases_without_reaching_backend() {
        let harness = uppercase_harness();
        let results = harness
            .run_tests(Language::Python, "  ", &[case("x", "X")], 1000)
            .await;

        assert!(!results[0].passed);
        assert_eq!(results[0].error.as_deref(), Some(EMPTY_PROGRAM));
    }
}
