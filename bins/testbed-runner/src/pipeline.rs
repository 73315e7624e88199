/// Pipeline - Two-Phase Run Orchestration
///
/// 1. Discover test cases (sorted by input path)
/// 2. Run phase: candidate over every input, via the worker pool
/// 3. Optional one-off tool preparation
/// 4. Eval phase: scoring tool over every (input, output) pair
/// 5. Aggregate
///
/// Phase 2 is only scheduled after phase 1's results are fully collected,
/// so every evaluation sees a completely written output file.

use crate::aggregator;
use crate::evaluator::{self, Evaluator};
use crate::pool::WorkerPool;
use crate::report::Reporter;
use crate::runner::ProcessRunner;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use testbed_common::config::RunConfig;
use testbed_common::types::{RunSummary, ScoreResult, TestCase, WorkItem, WorkKind};
use testbed_common::{HarnessError, HarnessResult};
use tracing::{debug, info, instrument, warn};

/// Final product of one pipeline run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub results: Vec<ScoreResult>,
    pub summary: RunSummary,
}

/// List regular files in `input_dir`, sorted, paired with their output paths
pub async fn discover_cases(input_dir: &Path, output_dir: &Path) -> HarnessResult<Vec<TestCase>> {
    let directory_error = |source: std::io::Error| HarnessError::Directory {
        path: input_dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(input_dir)
        .await
        .map_err(directory_error)?;

    let mut inputs = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(directory_error)? {
        let path = entry.path();
        let mut file_type = entry.file_type().await.map_err(directory_error)?;
        if file_type.is_symlink() {
            // Dangling links stay in the set and fail when opened.
            if let Ok(target) = tokio::fs::metadata(&path).await {
                file_type = target.file_type();
            }
        }
        if file_type.is_dir() {
            warn!(path = %path.display(), "Skipping directory in input set");
            continue;
        }
        inputs.push(path);
    }
    inputs.sort();

    Ok(inputs
        .into_iter()
        .map(|input| TestCase::from_input(input, output_dir))
        .collect())
}

/// Execute the whole run described by `config`
#[instrument(skip_all, fields(input_dir = %config.input_dir.display()))]
pub async fn run(config: &RunConfig, reporter: &mut dyn Reporter) -> HarnessResult<RunReport> {
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|source| HarnessError::Directory {
            path: config.output_dir.clone(),
            source,
        })?;

    let cases = discover_cases(&config.input_dir, &config.output_dir).await?;
    if cases.is_empty() {
        return Err(HarnessError::EmptyInputSet {
            dir: config.input_dir.clone(),
        });
    }

    let pool = WorkerPool::new(config.workers);
    reporter.cases_discovered(cases.len());

    // Phase 1: run
    reporter.running(pool.workers());
    let run_items: Vec<WorkItem> = cases
        .iter()
        .map(|case| WorkItem::run(&config.executable, case))
        .collect();
    let start = Instant::now();
    let outcomes = pool
        .map_parallel(Arc::new(ProcessRunner::new(config.timeout)), run_items)
        .await?;
    for outcome in &outcomes {
        debug!(
            output = %outcome.output.display(),
            exit_code = ?outcome.exit_code,
            execution_ms = outcome.execution_time_ms,
            "Candidate finished"
        );
    }
    let stdout_bytes: usize = outcomes.iter().map(|o| o.stdout_bytes).sum();
    info!(
        phase = %WorkKind::Run,
        cases = outcomes.len(),
        stdout_bytes,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Phase complete"
    );

    if let Some(prepare) = &config.tool.prepare {
        evaluator::prepare_tool(&config.tool_dir, prepare).await?;
    }

    // Phase 2: evaluate
    reporter.evaluating();
    let eval_items: Vec<WorkItem> = cases
        .iter()
        .map(|case| WorkItem::eval(&config.tool_dir, case))
        .collect();
    let evaluator = Evaluator::new(config.tool.clone(), config.timeout);
    let start = Instant::now();
    let scores = pool.map_parallel(Arc::new(evaluator), eval_items).await?;
    info!(
        phase = %WorkKind::Eval,
        cases = scores.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Phase complete"
    );

    let results: Vec<ScoreResult> = cases
        .into_iter()
        .zip(scores)
        .map(|(case, score)| ScoreResult::new(case, score))
        .collect();

    if config.verbose {
        for result in &results {
            reporter.case_scored(result);
        }
    }

    let summary = aggregator::summarize(&results).ok_or_else(|| HarnessError::EmptyInputSet {
        dir: config.input_dir.clone(),
    })?;
    reporter.summary(&summary);
    reporter.finish();

    Ok(RunReport { results, summary })
}
