use std::io;
use std::process::ExitStatus;

use futures::future::try_join3;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;

use crate::domain::StandardInput;

/// Hard cap per captured stream. Anything beyond it is discarded so a
/// print-spamming program cannot exhaust the supervisor's memory.
pub const MAX_CAPTURE_BYTES: u64 = 1024 * 1024;

#[derive(Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Drives one child's stdio to completion: feeds the rendered input to its
/// stdin, concurrently drains stdout and stderr, then reaps the exit status.
/// The pipes are exclusively owned by this call; nothing leaks into a later
/// execution.
pub async fn drive(mut child: Child, input: &StandardInput) -> io::Result<CapturedOutput> {
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let text = input.render();

    let feed = async move {
        if let Some(mut pipe) = stdin {
            match pipe.write_all(text.as_bytes()).await {
                Ok(()) => {
                    // EOF so line-reads past the last input line fail in the
                    // program instead of blocking forever.
                    let _ = pipe.shutdown().await;
                }
                // The program exited (or closed stdin) without reading
                // everything; that is its business, not a capture failure.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    };

    let (_, stdout, stderr) = try_join3(feed, drain(stdout), drain(stderr)).await?;
    let status = child.wait().await?;

    Ok(CapturedOutput {
        status,
        stdout,
        stderr,
    })
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<String> {
    let Some(pipe) = pipe else {
        return Ok(String::new());
    };

    let mut limited = pipe.take(MAX_CAPTURE_BYTES);
    let mut buf = Vec::new();
    limited.read_to_end(&mut buf).await?;

    // Keep consuming past the cap so the child never blocks on a full pipe.
    let mut rest = limited.into_inner();
    tokio::io::copy(&mut rest, &mut tokio::io::sink()).await?;

    Ok(String::from_utf8_lossy(&buf).into_owned())
}
