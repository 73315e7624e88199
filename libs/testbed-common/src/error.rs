use std::io;
use std::path::PathBuf;

/// Errors that abort a harness run.
///
/// Every variant is fatal: a phase either completes for all test cases or
/// the whole run stops with one of these.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("input file `{}` is unavailable: {source}", .path.display())]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write output file `{}`: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no integer score in scoring tool output for `{}`: {raw:?}", .input.display())]
    ScoreParse { input: PathBuf, raw: String },

    #[error("input directory `{}` contains no test cases", .dir.display())]
    EmptyInputSet { dir: PathBuf },

    #[error("`{program}` timed out after {limit_ms}ms on `{}`", .input.display())]
    Timeout {
        program: String,
        input: PathBuf,
        limit_ms: u64,
    },

    #[error("directory `{}` is not usable: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("i/o error while waiting on `{program}`: {source}")]
    ProcessIo {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("tool prepare step `{command}` failed with {status}: {stderr}")]
    Prepare {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("worker task failed: {0}")]
    Worker(String),

    #[error("invalid tool configuration: {0}")]
    Config(String),
}

pub type HarnessResult<T> = std::result::Result<T, HarnessError>;
