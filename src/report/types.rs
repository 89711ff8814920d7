use crate::runner::state::{ResultLog, TestOutcome};
use serde::{Deserialize, Serialize};

/// Derived run-level counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_tests: u32,
    pub passed_tests: u32,
    /// Percentage with one decimal, e.g. `"87.5%"`
    pub success_rate: String,
    pub timestamp: String,
    pub base_url: String,
}

impl RunSummary {
    pub fn from_log(log: &ResultLog, base_url: &str, timestamp: String) -> Self {
        Self {
            total_tests: log.attempted(),
            passed_tests: log.passed(),
            success_rate: format!("{:.1}%", success_rate(log.passed(), log.attempted())),
            timestamp,
            base_url: base_url.to_string(),
        }
    }

    pub fn all_passed(&self) -> bool {
        self.passed_tests == self.total_tests
    }
}

/// `passed / total * 100`, or `0.0` for an empty run
pub fn success_rate(passed: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (passed.min(total) as f64 / total as f64) * 100.0
}

/// Persisted document for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: RunSummary,
    pub test_results: Vec<TestOutcome>,
}

impl Report {
    pub fn new(log: ResultLog, base_url: &str, timestamp: String) -> Self {
        let summary = RunSummary::from_log(&log, base_url, timestamp);
        Self {
            summary,
            test_results: log.into_outcomes(),
        }
    }
}
