/// Evaluator - External Scoring Tool Invocation
///
/// **Core Responsibility:**
/// Ask the scoring tool for the score of one (input, output) pair.
///
/// **Invocation Rules:**
/// - Command = configured prefix + input path + output path
/// - Working directory = tool directory
/// - Paths are made absolute first, because the tool does not run in our cwd
/// - Score = last whitespace-separated token of stdout, base-10 integer
/// - Everything else the tool prints is ignored

use crate::pool::WorkHandler;
use crate::runner::wait_for;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use testbed_common::config::ToolConfig;
use testbed_common::types::{WorkItem, WorkKind};
use testbed_common::{HarnessError, HarnessResult};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Extract the score from raw tool output
pub fn parse_score(input: &Path, stdout: &str) -> HarnessResult<i64> {
    stdout
        .split_whitespace()
        .last()
        .and_then(|token| token.parse::<i64>().ok())
        .ok_or_else(|| HarnessError::ScoreParse {
            input: input.to_path_buf(),
            raw: stdout.to_string(),
        })
}

#[derive(Debug, Clone)]
pub struct Evaluator {
    tool: ToolConfig,
    timeout: Option<Duration>,
}

impl Evaluator {
    pub fn new(tool: ToolConfig, timeout: Option<Duration>) -> Self {
        Self { tool, timeout }
    }

    /// Score `output` against `input` by running the tool inside `tool_dir`.
    pub async fn evaluate(
        &self,
        tool_dir: &Path,
        input: &Path,
        output: &Path,
    ) -> HarnessResult<i64> {
        self.tool.validate()?;
        let program = self.tool.program().to_string();

        let input_abs = absolute(input).map_err(|source| HarnessError::InputUnavailable {
            path: input.to_path_buf(),
            source,
        })?;
        let output_abs = absolute(output).map_err(|source| HarnessError::OutputWrite {
            path: output.to_path_buf(),
            source,
        })?;

        let child = Command::new(&program)
            .args(&self.tool.command[1..])
            .arg(&input_abs)
            .arg(&output_abs)
            .current_dir(tool_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HarnessError::Launch {
                program: program.clone(),
                source,
            })?;

        let result = wait_for(child, &program, input, self.timeout).await?;
        let stdout = String::from_utf8_lossy(&result.stdout);
        let stderr = String::from_utf8_lossy(&result.stderr);

        match parse_score(input, &stdout) {
            Ok(score) => {
                if !stderr.trim().is_empty() {
                    debug!(input = %input.display(), stderr = %stderr.trim(), "Scoring tool stderr");
                }
                Ok(score)
            }
            Err(e) => {
                warn!(
                    input = %input.display(),
                    status = %result.status,
                    stderr = %stderr.trim(),
                    "Scoring tool produced no score"
                );
                Err(e)
            }
        }
    }
}

#[async_trait]
impl WorkHandler for Evaluator {
    type Item = WorkItem;
    type Output = i64;

    async fn execute(&self, item: WorkItem) -> HarnessResult<i64> {
        if item.kind != WorkKind::Eval {
            return Err(HarnessError::Worker(format!(
                "evaluator received a {} item",
                item.kind
            )));
        }
        self.evaluate(&item.program, &item.input, &item.output).await
    }
}

/// Run the tool's one-off build step in `tool_dir`.
///
/// Must finish before any evaluation starts; a non-zero exit aborts the run.
/// Runs without the per-process timeout.
pub async fn prepare_tool(tool_dir: &Path, prepare: &[String]) -> HarnessResult<()> {
    let Some(program) = prepare.first() else {
        return Err(HarnessError::Config("prepare command is empty".to_string()));
    };

    info!(command = %prepare.join(" "), "Preparing scoring tool...");

    let child = Command::new(program)
        .args(&prepare[1..])
        .current_dir(tool_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| HarnessError::Launch {
            program: program.clone(),
            source,
        })?;

    let result = wait_for(child, program, tool_dir, None).await?;
    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        warn!(status = %result.status, stderr = %stderr.trim(), "Tool preparation failed");
        return Err(HarnessError::Prepare {
            command: prepare.join(" "),
            status: result.status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(())
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
