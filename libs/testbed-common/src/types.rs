use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One input file and the output file derived from it.
///
/// Ordering is by input path first, which is also the discovery order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TestCase {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl TestCase {
    /// Output lives in `output_dir` under the input's file name.
    pub fn from_input(input: PathBuf, output_dir: &Path) -> Self {
        let output = match input.file_name() {
            Some(name) => output_dir.join(name),
            None => output_dir.join(&input),
        };
        Self { input, output }
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` => `{}`", self.input.display(), self.output.display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkKind {
    /// Feed the input to the candidate, capture stdout into the output file
    Run,
    /// Score an (input, output) pair with the external tool
    Eval,
}

impl fmt::Display for WorkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkKind::Run => write!(f, "run"),
            WorkKind::Eval => write!(f, "eval"),
        }
    }
}

/// A single unit of work submitted to the pool.
///
/// `program` is the candidate executable for `Run` items and the tool
/// directory for `Eval` items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub kind: WorkKind,
    pub program: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl WorkItem {
    pub fn run(executable: &Path, case: &TestCase) -> Self {
        Self {
            kind: WorkKind::Run,
            program: executable.to_path_buf(),
            input: case.input.clone(),
            output: case.output.clone(),
        }
    }

    pub fn eval(tool_dir: &Path, case: &TestCase) -> Self {
        Self {
            kind: WorkKind::Eval,
            program: tool_dir.to_path_buf(),
            input: case.input.clone(),
            output: case.output.clone(),
        }
    }
}

/// Score of one test case.
///
/// Field order matters: the derived ordering compares `score` first and
/// falls back to the test case, so max/min selection never depends on
/// completion order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: i64,
    pub case: TestCase,
}

impl ScoreResult {
    pub fn new(case: TestCase, score: i64) -> Self {
        Self { score, case }
    }
}

/// Aggregate statistics over a whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub count: usize,
    pub total: i128,
    pub average: f64,
    pub max: ScoreResult,
    pub min: ScoreResult,
}
