// Run reporting
//
// The pipeline talks to a Reporter instead of a global logger. Line
// formats live here so every sink prints the same thing.

use std::io::Write;
use testbed_common::types::{RunSummary, ScoreResult};
use tracing::info;

pub trait Reporter: Send {
    fn emit(&mut self, line: String);

    /// Called once after the summary
    fn finish(&mut self) {}

    fn cases_discovered(&mut self, count: usize) {
        self.emit(format!("#test_cases = {}", count));
    }

    fn running(&mut self, workers: usize) {
        self.emit(format!("Running tests... (#processes = {})", workers));
    }

    fn evaluating(&mut self) {
        self.emit("Evaluating results...".to_string());
    }

    fn case_scored(&mut self, result: &ScoreResult) {
        self.emit(case_line(result));
    }

    fn summary(&mut self, summary: &RunSummary) {
        for line in summary_lines(summary) {
            self.emit(line);
        }
    }
}

pub fn case_line(result: &ScoreResult) -> String {
    format!("{}: score = {}", result.case, result.score)
}

pub fn summary_lines(summary: &RunSummary) -> Vec<String> {
    vec![
        "----- TEST SUMMARY -----".to_string(),
        format!("SUM = {}", summary.total),
        format!("AVG = {:?}", summary.average),
        format!("MAX = {} ({})", summary.max.score, summary.max.case),
        format!("MIN = {} ({})", summary.min.score, summary.min.case),
    ]
}

/// Writes every report line through `tracing` at info level
#[derive(Debug, Default)]
pub struct TracingReporter;

impl TracingReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for TracingReporter {
    fn emit(&mut self, line: String) {
        info!("{}", line);
    }

    fn finish(&mut self) {
        let _ = std::io::stderr().flush();
    }
}

/// Keeps report lines in memory
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryReporter {
    pub lines: Vec<String>,
    pub finished: bool,
}

#[cfg(test)]
impl Reporter for MemoryReporter {
    fn emit(&mut self, line: String) {
        self.lines.push(line);
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use testbed_common::types::TestCase;

    fn result(name: &str, score: i64) -> ScoreResult {
        ScoreResult::new(
            TestCase::from_input(Path::new("in").join(name), Path::new("out")),
            score,
        )
    }

    #[test]
    fn test_case_line_format() {
        assert_eq!(
            case_line(&result("0001.txt", 120)),
            "`in/0001.txt` => `out/0001.txt`: score = 120"
        );
    }

    #[test]
    fn test_summary_block_order() {
        let summary = RunSummary {
            count: 2,
            total: 30,
            average: 15.0,
            max: result("b", 20),
            min: result("a", 10),
        };
        assert_eq!(
            summary_lines(&summary),
            vec![
                "----- TEST SUMMARY -----",
                "SUM = 30",
                "AVG = 15.0",
                "MAX = 20 (`in/b` => `out/b`)",
                "MIN = 10 (`in/a` => `out/a`)",
            ]
        );
    }

    #[test]
    fn test_average_always_shows_a_decimal_point() {
        let mut summary = RunSummary {
            count: 3,
            total: 22,
            average: 22.0 / 3.0,
            max: result("c", 14),
            min: result("b", 3),
        };
        assert_eq!(summary_lines(&summary)[2], "AVG = 7.333333333333333");

        summary.total = 21;
        summary.average = 7.0;
        assert_eq!(summary_lines(&summary)[2], "AVG = 7.0");
    }

    #[test]
    fn test_default_methods_route_through_emit() {
        let mut reporter = MemoryReporter::default();
        reporter.cases_discovered(3);
        reporter.running(2);
        reporter.evaluating();
        reporter.finish();

        assert_eq!(
            reporter.lines,
            vec![
                "#test_cases = 3",
                "Running tests... (#processes = 2)",
                "Evaluating results...",
            ]
        );
        assert!(reporter.finished);
    }
}
