use std::panic;
use std::sync::Arc;

use tonic::transport::Server;
use tracing_subscriber::EnvFilter;

use crate::backend::Backend;
use crate::backend::python::PythonBackend;
use crate::backend::script::ScriptBackend;
use crate::grpc::models::grader_service_server::GraderServiceServer;
use crate::grpc::services::GraderServiceImpl;
use crate::harness::Harness;
use crate::supervisor::Supervisor;

mod backend;
mod capture;
mod constants;
mod domain;
mod grpc;
mod harness;
mod loader;
mod supervisor;


#[tokio::main]
#[tracing::instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    set_panic_hook();

    let scratch_root = std::env::temp_dir().join("autograder");
    let python_path =
        std::env::var("PYTHON_PATH").unwrap_or_else(|_| "/usr/bin/python3".to_string());
    let node_path = std::env::var("NODEJS_PATH").unwrap_or_else(|_| "/usr/bin/node".to_string());

    let backends: Vec<Arc<dyn Backend>> = vec![
        Arc::new(PythonBackend::new(&python_path, &scratch_root)),
        Arc::new(ScriptBackend::new(&node_path, &scratch_root)),
    ];
    let harness = Arc::new(Harness::new(Supervisor::new(backends)));
    let service = GraderServiceServer::new(GraderServiceImpl::new(harness));

    let addr = "[::1]:50051".parse()?;
    tracing::info!("gRPC server listening on port 50051");
    Server::builder().add_service(service).serve(addr).await?;

    Ok(())
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
