use std::sync::Arc;

use tokio::sync::mpsc::{Sender, channel};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

use crate::domain::{Language, StandardInput, TestCase};
use crate::grpc::mappers;
use crate::grpc::models::{
    EnsureReadyRequest, ExecuteRequest, IsReadyRequest, ReadyState, RunTestsRequest,
    grader_service_server::GraderService,
};
use crate::grpc::models as proto;
use crate::harness::Harness;
use crate::supervisor::DEFAULT_TIMEOUT_MS;

#[derive(Clone, Debug)]
pub struct GraderServiceImpl {
    harness: Arc<Harness>,
}

impl GraderServiceImpl {
    pub fn new(harness: Arc<Harness>) -> Self {
        Self { harness }
    }
}

#[tonic::async_trait]
impl GraderService for GraderServiceImpl {
    type RunTestsStream = ReceiverStream<Result<proto::TestCaseResult, Status>>;

    #[tracing::instrument]
    async fn ensure_ready(
        &self,
        request: Request<EnsureReadyRequest>,
    ) -> Result<Response<ReadyState>, Status> {
        let language = mappers::language_from_raw(request.into_inner().language)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        match self.harness.supervisor().ensure_ready(language).await {
            Ok(handle) => Ok(Response::new(ReadyState {
                ready: true,
                interpreter_version: handle.interpreter_version,
            })),
            Err(e) => Err(Status::unavailable(e.to_string())),
        }
    }

    #[tracing::instrument]
    async fn is_ready(
        &self,
        request: Request<IsReadyRequest>,
    ) -> Result<Response<ReadyState>, Status> {
        let language = mappers::language_from_raw(request.into_inner().language)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        let supervisor = self.harness.supervisor();
        Ok(Response::new(ReadyState {
            ready: supervisor.is_ready(language),
            interpreter_version: supervisor
                .runtime_handle(language)
                .map(|handle| handle.interpreter_version)
                .unwrap_or_default(),
        }))
    }

    #[tracing::instrument]
    async fn execute(
        &self,
        request: Request<ExecuteRequest>,
    ) -> Result<Response<proto::ExecutionResult>, Status> {
        let req = request.into_inner();
        let language = mappers::language_from_raw(req.language)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;
        let input = StandardInput::new(req.stdin_lines);
        let timeout_ms = req.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);

        let result = self
            .harness
            .supervisor()
            .run(language, &req.source, &input, timeout_ms)
            .await;

        Ok(Response::new(result.into()))
    }

    #[tracing::instrument]
    async fn run_tests(
        &self,
        request: Request<RunTestsRequest>,
    ) -> Result<Response<Self::RunTestsStream>, Status> {
        let req = request.into_inner();
        let language = mappers::language_from_raw(req.language)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;
        let timeout_ms = req.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
        let cases: Vec<TestCase> = req.test_cases.into_iter().map(Into::into).collect();

        let (stream_tx, stream_rx) = channel::<Result<proto::TestCaseResult, Status>>(128);
        let harness = self.harness.clone();

        tokio::spawn(stream_verdicts(
            harness, language, req.source, cases, timeout_ms, stream_tx,
        ));

        Ok(Response::new(ReceiverStream::new(stream_rx)))
    }
}

async fn stream_verdicts(
    harness: Arc<Harness>,
    language: Language,
    source: String,
    cases: Vec<TestCase>,
    timeout_ms: u64,
    stream_tx: Sender<Result<proto::TestCaseResult, Status>>,
) {
    for (case_index, case) in cases.iter().enumerate() {
        let graded = harness.run_case(language, &source, case, timeout_ms).await;
        tracing::debug!("Case {} graded: passed={}", case_index, graded.passed);
        let verdict = mappers::test_case_result_to_proto(case_index as u32, graded);
        // A failed send means the client hung up; stop grading the
        // remaining cases instead of panicking the task.
        if stream_tx.send(Ok(verdict)).await.is_err() {
            tracing::debug!("Client disconnected after case {}", case_index);
            break;
        }
    }
}
