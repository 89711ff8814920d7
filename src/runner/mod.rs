pub mod assertions;
pub mod events;
pub mod scenarios;
pub mod state;

use crate::probe::{
    AttemptOutcome, HttpMethod, Pause, ProbeError, ProbeRequest, Prober, ResponseBody,
    RetryPolicy,
};
use crate::report::{self, Report};
use crate::utils::config::HarnessConfig;
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use events::*;
pub use scenarios::{Scenario, ScenarioKind};
pub use state::*;

/// Runs probes against one target and keeps the result log
pub struct Harness {
    config: HarnessConfig,
    prober: Prober,
    pause: Arc<dyn Pause>,
    log: ResultLog,
    emitter: EventEmitter,
}

impl Harness {
    pub fn new(
        config: HarnessConfig,
        pause: Arc<dyn Pause>,
        emitter: EventEmitter,
    ) -> Result<Self, ProbeError> {
        let prober = Prober::new(
            &config.base_url,
            config.request_timeout,
            RetryPolicy::new(config.max_attempts, config.retry_delay),
        )?;

        Ok(Self {
            config,
            prober,
            pause,
            log: ResultLog::new(),
            emitter,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn log(&self) -> &ResultLog {
        &self.log
    }

    pub fn into_parts(self) -> (ResultLog, EventEmitter) {
        (self.log, self.emitter)
    }

    /// Execute a probe and record exactly one outcome for it.
    /// Returns the HTTP-level verdict and the last decoded body.
    pub async fn probe(
        &mut self,
        request: ProbeRequest,
    ) -> Result<(bool, Option<ResponseBody>), ProbeError> {
        self.probe_with(request, |_| Ok(())).await
    }

    /// Like [`Harness::probe`], but a status match is only a pass if `check`
    /// also accepts the body. The single recorded outcome carries the
    /// combined verdict.
    pub async fn probe_with<C>(
        &mut self,
        request: ProbeRequest,
        check: C,
    ) -> Result<(bool, Option<ResponseBody>), ProbeError>
    where
        C: FnOnce(&ResponseBody) -> Result<(), String>,
    {
        self.emitter.emit(HarnessEvent::ProbeStarted {
            name: request.name.clone(),
        });

        let emitter = &self.emitter;
        let result = self
            .prober
            .execute(&request, self.pause.as_ref(), |attempt, max_attempts, reason| {
                emitter.emit(HarnessEvent::ProbeRetrying {
                    name: request.name.clone(),
                    attempt,
                    max_attempts,
                    reason,
                })
            })
            .await?;

        let outcome = match result.body() {
            Some(body) if result.success() => match check(body) {
                Ok(()) => TestOutcome::from_probe(&result),
                Err(reason) => TestOutcome::from_failed_assertion(&result, reason),
            },
            _ => TestOutcome::from_probe(&result),
        };

        if outcome.success {
            self.emitter.emit(HarnessEvent::ProbePassed {
                name: outcome.name.clone(),
                status: outcome.status_code.unwrap_or(request.expected_status),
            });
        } else {
            let error = outcome.error.clone().unwrap_or_default();
            log::debug!("{} failed after {} attempt(s): {}", outcome.name, result.attempts, error);
            self.emitter.emit(HarnessEvent::ProbeFailed {
                name: outcome.name.clone(),
                error,
            });
        }

        let success = outcome.success;
        self.log.record(outcome);
        Ok((success, result.body().cloned()))
    }

    /// Record the scenario-level verdict of an observational scenario
    pub fn record_observation(&mut self, name: &str, success: bool, notes: String) {
        self.observe(format!("{}: {}", name, notes));
        self.log.record(TestOutcome::observation(name, success, notes));
    }

    pub fn observe(&self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        self.emitter.emit(HarnessEvent::Observation { message });
    }

    pub async fn pause_for(&self, duration: Duration) {
        self.pause.pause(duration).await;
    }

    /// Request that is neither retried nor recorded
    pub async fn send_unrecorded(
        &self,
        method: HttpMethod,
        path: &str,
        timeout: Duration,
    ) -> Result<AttemptOutcome, ProbeError> {
        self.prober.send(method, path, timeout).await
    }

    /// Run every scenario in catalog order
    pub async fn run_all(&mut self) -> Result<(), ProbeError> {
        self.emitter.emit(HarnessEvent::RunStarted {
            base_url: self.prober.base_url().to_string(),
        });

        for scenario in Scenario::ALL {
            self.emitter.emit(HarnessEvent::ScenarioStarted {
                name: scenario.name().to_string(),
                observational: scenario.kind() == ScenarioKind::Observational,
            });
            let passed = scenario.run(self).await?;
            log::debug!("scenario {} finished: passed={}", scenario.name(), passed);
        }

        Ok(())
    }
}

/// Run the full scenario catalog, write the report(s) and return the report
pub async fn run_suite(
    config: HarnessConfig,
    pause: Arc<dyn Pause>,
    emitter: EventEmitter,
) -> Result<Report> {
    let started = Instant::now();
    let report_path = config.report_path.clone();
    let junit_path = config.junit_path.clone();

    let mut harness = Harness::new(config, pause, emitter)?;
    let base_url = harness.prober.base_url().to_string();
    harness.run_all().await?;

    let (log, emitter) = harness.into_parts();
    let timestamp = chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string();
    let report = Report::new(log, &base_url, timestamp);

    emitter.emit(HarnessEvent::RunFinished {
        summary: report.summary.clone(),
        duration_ms: started.elapsed().as_millis() as u64,
    });

    report::json::write(&report, &report_path)?;
    emitter.emit(HarnessEvent::ReportWritten {
        path: report_path.display().to_string(),
    });

    if let Some(path) = junit_path {
        report::junit::write_report(&report, &path)?;
        emitter.emit(HarnessEvent::ReportWritten {
            path: path.display().to_string(),
        });
    }

    Ok(report)
}
