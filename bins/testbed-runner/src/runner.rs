/// Process Runner - Candidate Execution
///
/// **Responsibility:**
/// Feed one input file to the candidate program and capture its stdout
/// into the matching output file.
///
/// **Rules:**
/// - Output file is touched (created, never truncated) before launch, so it
///   exists even if the candidate writes nothing or fails to start
/// - Captured bytes are written verbatim (binary-safe)
/// - Exit status and stderr are not part of the contract; they are only logged

use crate::pool::WorkHandler;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use testbed_common::types::{WorkItem, WorkKind};
use testbed_common::{HarnessError, HarnessResult};
use tokio::process::{Child, Command};
use tracing::debug;

/// What phase 1 produced for a single test case
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub output: PathBuf,
    pub stdout_bytes: usize,
    pub exit_code: Option<i32>,
    pub execution_time_ms: u64,
}

/// Runs the candidate executable, one child process per work item
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Run `executable` with stdin from `input`, writing stdout to `output`.
    pub async fn run(
        &self,
        executable: &Path,
        input: &Path,
        output: &Path,
    ) -> HarnessResult<RunOutcome> {
        let program = executable.display().to_string();

        let stdin = tokio::fs::File::open(input)
            .await
            .map_err(|source| HarnessError::InputUnavailable {
                path: input.to_path_buf(),
                source,
            })?
            .into_std()
            .await;

        // Create without truncating: `output` may be the same file as `input`.
        tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(output)
            .await
            .map_err(|source| HarnessError::OutputWrite {
                path: output.to_path_buf(),
                source,
            })?;

        let start = Instant::now();
        let child = Command::new(executable)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HarnessError::Launch {
                program: program.clone(),
                source,
            })?;

        let result = wait_for(child, &program, input, self.timeout).await?;
        let execution_time_ms = start.elapsed().as_millis() as u64;

        tokio::fs::write(output, &result.stdout)
            .await
            .map_err(|source| HarnessError::OutputWrite {
                path: output.to_path_buf(),
                source,
            })?;

        if !result.status.success() {
            debug!(
                input = %input.display(),
                status = %result.status,
                stderr_bytes = result.stderr.len(),
                "Candidate exited with non-zero status"
            );
        }

        Ok(RunOutcome {
            output: output.to_path_buf(),
            stdout_bytes: result.stdout.len(),
            exit_code: result.status.code(),
            execution_time_ms,
        })
    }
}

#[async_trait]
impl WorkHandler for ProcessRunner {
    type Item = WorkItem;
    type Output = RunOutcome;

    async fn execute(&self, item: WorkItem) -> HarnessResult<RunOutcome> {
        if item.kind != WorkKind::Run {
            return Err(HarnessError::Worker(format!(
                "process runner received a {} item",
                item.kind
            )));
        }
        self.run(&item.program, &item.input, &item.output).await
    }
}

/// Wait for a child to exit and collect its output, honouring an optional limit.
///
/// On timeout the child is dropped, which kills it.
pub(crate) async fn wait_for(
    child: Child,
    program: &str,
    input: &Path,
    timeout: Option<Duration>,
) -> HarnessResult<Output> {
    let waiting = child.wait_with_output();
    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, waiting)
            .await
            .map_err(|_| HarnessError::Timeout {
                program: program.to_string(),
                input: input.to_path_buf(),
                limit_ms: limit.as_millis() as u64,
            })?,
        None => waiting.await,
    };

    output.map_err(|source| HarnessError::ProcessIo {
        program: program.to_string(),
        source,
    })
}
