// Reduce per-case scores into a run summary
use testbed_common::types::{RunSummary, ScoreResult};

/// Compute sum, average, max and min over `results`.
///
/// Returns `None` for an empty slice. Max and min use the natural ordering
/// of [`ScoreResult`] (score, then test case), so ties resolve the same way
/// on every run: the later path wins MAX, the earlier path wins MIN.
pub fn summarize(results: &[ScoreResult]) -> Option<RunSummary> {
    let max = results.iter().max()?.clone();
    let min = results.iter().min()?.clone();

    let count = results.len();
    let total: i128 = results.iter().map(|r| i128::from(r.score)).sum();
    let average = total as f64 / count as f64;

    Some(RunSummary {
        count,
        total,
        average,
        max,
        min,
    })
}
