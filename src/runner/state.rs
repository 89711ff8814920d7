use crate::probe::{ProbeResult, ResponseBody};
use serde::{Deserialize, Serialize};

/// One counted result. Retries of a probe share a single outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(
        rename = "response",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub response_body: Option<ResponseBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TestOutcome {
    pub fn from_probe(result: &ProbeResult) -> Self {
        Self {
            name: result.name.clone(),
            success: result.success(),
            status_code: result.status_code(),
            response_body: result.body().cloned(),
            error: result.error(),
            notes: None,
        }
    }

    /// Probe that matched its status but failed a body assertion
    pub fn from_failed_assertion(result: &ProbeResult, reason: String) -> Self {
        Self {
            success: false,
            error: Some(reason),
            ..Self::from_probe(result)
        }
    }

    /// Scenario-level summary whose verdict is weaker than full verification
    pub fn observation(name: &str, success: bool, notes: String) -> Self {
        Self {
            name: name.to_string(),
            success,
            status_code: None,
            response_body: None,
            error: None,
            notes: Some(notes),
        }
    }
}

/// Ordered, append-only record of a run
#[derive(Debug, Default, Clone)]
pub struct ResultLog {
    outcomes: Vec<TestOutcome>,
    attempted: u32,
    passed: u32,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: TestOutcome) {
        self.attempted += 1;
        if outcome.success {
            self.passed += 1;
        }
        self.outcomes.push(outcome);
    }

    pub fn attempted(&self) -> u32 {
        self.attempted
    }

    pub fn passed(&self) -> u32 {
        self.passed
    }

    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.outcomes
    }

    pub fn last(&self) -> Option<&TestOutcome> {
        self.outcomes.last()
    }

    pub fn into_outcomes(self) -> Vec<TestOutcome> {
        self.outcomes
    }
}
