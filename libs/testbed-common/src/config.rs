// Run configuration shared by the runner and its tests
use crate::error::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Cores left free for unrelated host activity so scores stay stable.
pub const CPU_RESERVE: usize = 4;

/// How the external scoring tool is invoked.
///
/// The tool receives `command` followed by the input and output paths,
/// with its working directory set to the tool directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub command: Vec<String>,
    /// Run once in the tool directory before the first evaluation
    #[serde(default)]
    pub prepare: Option<Vec<String>>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            command: ["cargo", "run", "--release", "--bin", "vis"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            prepare: None,
        }
    }
}

impl ToolConfig {
    /// Build a command prefix from a whitespace separated string
    pub fn from_command_line(line: &str) -> HarnessResult<Self> {
        let config = Self {
            command: line.split_whitespace().map(str::to_string).collect(),
            prepare: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> HarnessResult<()> {
        if self.command.is_empty() {
            return Err(HarnessError::Config("tool command is empty".to_string()));
        }
        if let Some(prepare) = &self.prepare {
            if prepare.is_empty() {
                return Err(HarnessError::Config("prepare command is empty".to_string()));
            }
        }
        Ok(())
    }

    pub fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or_default()
    }
}

/// Everything one pipeline run needs
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub executable: PathBuf,
    pub tool_dir: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub verbose: bool,
    pub workers: usize,
    pub timeout: Option<Duration>,
    pub tool: ToolConfig,
}

/// `max(available - CPU_RESERVE, 1)`
pub fn worker_count(available: usize) -> usize {
    available.saturating_sub(CPU_RESERVE).max(1)
}

/// Pool size for this host
pub fn default_worker_count() -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    worker_count(available)
}
