mod aggregator;
mod config;
mod evaluator;
mod pipeline;
mod pool;
mod report;
mod runner;


use anyhow::{bail, Context};
use clap::Parser;
use report::TracingReporter;
use std::path::PathBuf;
use std::time::Duration;
use testbed_common::config::{default_worker_count, RunConfig};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "testbed")]
#[command(about = "Run a program over a directory of inputs and score every output", long_about = None)]
struct Cli {
    /// Executable under test (reads stdin, writes stdout)
    executable: PathBuf,

    /// Directory the scoring tool runs in
    tool_dir: PathBuf,

    /// Directory of input files, one test case per file
    input_dir: PathBuf,

    /// Directory for captured outputs (created if missing)
    output_dir: PathBuf,

    /// Show detailed test result
    #[arg(long)]
    verbose: bool,

    /// Number of parallel workers (default: available cores minus 4, at least 1)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Per-process timeout in milliseconds
    #[arg(long, env = "TESTBED_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// JSON file describing the scoring tool command and prepare step
    #[arg(long, env = "TESTBED_TOOL_CONFIG")]
    tool_config: Option<PathBuf>,

    /// Scoring tool command prefix, e.g. "./target/release/vis"
    #[arg(long, env = "TESTBED_TOOL_COMMAND")]
    tool_command: Option<String>,
}

fn build_run_config(cli: Cli) -> anyhow::Result<RunConfig> {
    let workers = match cli.workers {
        Some(0) => bail!("--workers must be at least 1"),
        Some(n) => n,
        None => default_worker_count(),
    };

    let tool = config::resolve_tool_config(cli.tool_config.as_deref(), cli.tool_command.as_deref())?;

    let tool_dir = cli
        .tool_dir
        .canonicalize()
        .with_context(|| format!("Tool directory not found: {}", cli.tool_dir.display()))?;

    Ok(RunConfig {
        executable: cli.executable,
        tool_dir,
        input_dir: cli.input_dir,
        output_dir: cli.output_dir,
        verbose: cli.verbose,
        workers,
        timeout: cli.timeout_ms.map(Duration::from_millis),
        tool,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_run_config(cli).map_err(|e| {
        error!("Invalid configuration: {:#}", e);
        e
    })?;

    info!(
        executable = %config.executable.display(),
        tool_dir = %config.tool_dir.display(),
        tool_command = %config.tool.command.join(" "),
        "Testbed starting"
    );

    let mut reporter = TracingReporter::new();
    let report = pipeline::run(&config, &mut reporter)
        .await
        .map_err(|e| {
            error!(error = %e, "Run aborted");
            e
        })
        .context("Test run failed")?;

    info!(
        cases = report.results.len(),
        total = %report.summary.total,
        "Run complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_positionals_and_flags() {
        let cli = Cli::try_parse_from([
            "testbed", "./a.out", ".", "in", "out", "--verbose", "--workers", "2",
        ])
        .unwrap();
        assert_eq!(cli.executable, PathBuf::from("./a.out"));
        assert_eq!(cli.input_dir, PathBuf::from("in"));
        assert_eq!(cli.output_dir, PathBuf::from("out"));
        assert!(cli.verbose);
        assert_eq!(cli.workers, Some(2));
    }

    #[test]
    fn test_cli_requires_all_positionals() {
        assert!(Cli::try_parse_from(["testbed", "./a.out", ".", "in"]).is_err());
    }

    #[test]
    fn test_build_run_config() {
        let cli = Cli::try_parse_from([
            "testbed",
            "./a.out",
            ".",
            "in",
            "out",
            "--workers",
            "3",
            "--timeout-ms",
            "1500",
            "--tool-command",
            "./vis",
        ])
        .unwrap();
        let config = build_run_config(cli).unwrap();

        assert_eq!(config.workers, 3);
        assert_eq!(config.timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.tool.command, vec!["./vis"]);
        assert!(config.tool_dir.is_absolute());
        assert!(!config.verbose);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let cli =
            Cli::try_parse_from(["testbed", "./a.out", ".", "in", "out", "--workers", "0"]).unwrap();
        assert!(build_run_config(cli).is_err());
    }

    #[test]
    fn test_missing_tool_dir_rejected() {
        let cli = Cli::try_parse_from([
            "testbed",
            "./a.out",
            "/nonexistent/tool/dir",
            "in",
            "out",
        ])
        .unwrap();
        assert!(build_run_config(cli).is_err());
    }
}
