//! The fixed scenario catalog
//!
//! Verified scenarios derive their verdict from the status code plus a body
//! assertion. Observational scenarios probe server-side reliability features
//! (circuit breaking, degraded mode, caching) that can only be inferred from
//! the outside; they record a scenario-level outcome whose notes state what
//! was and was not verified.

use super::assertions::{
    display_value, reject_error_object, require_keys, require_success_flag, string_list,
};
use super::Harness;
use crate::probe::{HttpMethod, ProbeError, ProbeRequest, ResponseBody};
use serde_json::{json, Value};
use std::time::Instant;

const HEALTH_FIELDS: [&str; 5] = ["status", "timestamp", "services", "features", "performance"];
const METRICS_FIELDS: [&str; 6] = ["timestamp", "system", "services", "cache", "network", "summary"];
const AGENT_FIELDS: [&str; 5] = ["status", "message", "services", "features", "timestamp"];

const DEGRADED_SERVICE: &str = "blockchain";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    Verified,
    Observational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    HealthCheck,
    Metrics,
    AgentHealth,
    AgentGetBalance,
    AgentAnalyzePerformance,
    UserGroups,
    CircuitBreaker,
    GracefulDegradation,
    Caching,
}

impl Scenario {
    /// Execution order
    pub const ALL: [Scenario; 9] = [
        Scenario::HealthCheck,
        Scenario::Metrics,
        Scenario::AgentHealth,
        Scenario::AgentGetBalance,
        Scenario::AgentAnalyzePerformance,
        Scenario::UserGroups,
        Scenario::CircuitBreaker,
        Scenario::GracefulDegradation,
        Scenario::Caching,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::HealthCheck => "Health Check",
            Scenario::Metrics => "Metrics",
            Scenario::AgentHealth => "Agent Health",
            Scenario::AgentGetBalance => "Agent getBalance",
            Scenario::AgentAnalyzePerformance => "Agent analyzePerformance",
            Scenario::UserGroups => "User Groups",
            Scenario::CircuitBreaker => "Circuit Breaker",
            Scenario::GracefulDegradation => "Graceful Degradation",
            Scenario::Caching => "Caching",
        }
    }

    pub fn kind(&self) -> ScenarioKind {
        match self {
            Scenario::CircuitBreaker | Scenario::GracefulDegradation | Scenario::Caching => {
                ScenarioKind::Observational
            }
            _ => ScenarioKind::Verified,
        }
    }

    /// Run the scenario. `Ok(false)` is a recorded failure, not an error.
    pub async fn run(self, h: &mut Harness) -> Result<bool, ProbeError> {
        match self {
            Scenario::HealthCheck => health_check(h).await,
            Scenario::Metrics => metrics(h).await,
            Scenario::AgentHealth => agent_health(h).await,
            Scenario::AgentGetBalance => agent_get_balance(h).await,
            Scenario::AgentAnalyzePerformance => agent_analyze_performance(h).await,
            Scenario::UserGroups => user_groups(h).await,
            Scenario::CircuitBreaker => circuit_breaker(h).await,
            Scenario::GracefulDegradation => graceful_degradation(h).await,
            Scenario::Caching => caching(h).await,
        }
    }
}

fn field_or(body: &ResponseBody, key: &str, default: &str) -> String {
    body.get(key)
        .map(display_value)
        .unwrap_or_else(|| default.to_string())
}

async fn health_check(h: &mut Harness) -> Result<bool, ProbeError> {
    let (success, body) = h
        .probe_with(ProbeRequest::get("Health Check Endpoint", "health"), |b| {
            require_keys(b, &HEALTH_FIELDS)
        })
        .await?;

    if let Some(body) = body.filter(|b| b.as_json().is_some()) {
        h.observe(format!("Health status: {}", field_or(&body, "status", "unknown")));
        h.observe(format!(
            "Healthy services: {:?}",
            string_list(&body, "/services/healthy")
        ));
    }
    Ok(success)
}

async fn metrics(h: &mut Harness) -> Result<bool, ProbeError> {
    let (success, body) = h
        .probe_with(ProbeRequest::get("Metrics Endpoint", "metrics"), |b| {
            require_keys(b, &METRICS_FIELDS)
        })
        .await?;

    if let Some(Value::Object(summary)) = body.as_ref().and_then(|b| b.get("summary")) {
        h.observe("Metrics summary:");
        for (key, value) in summary {
            h.observe(format!("- {}: {}", key, display_value(value)));
        }
    }
    Ok(success)
}

async fn agent_health(h: &mut Harness) -> Result<bool, ProbeError> {
    let (success, body) = h
        .probe_with(ProbeRequest::get("Agent Health Check", "agent"), |b| {
            require_keys(b, &AGENT_FIELDS)
        })
        .await?;

    if let Some(body) = body.filter(|b| b.as_json().is_some()) {
        h.observe(format!("Agent status: {}", field_or(&body, "status", "unknown")));
        h.observe(format!("Agent message: {}", field_or(&body, "message", "No message")));
    }
    Ok(success)
}

async fn agent_get_balance(h: &mut Harness) -> Result<bool, ProbeError> {
    let request = ProbeRequest::post(
        "Agent getBalance Action",
        "agent",
        json!({"action": "getBalance"}),
    );
    let (success, body) = h.probe_with(request, require_success_flag).await?;

    if let Some(body) = body.filter(|b| b.as_json().is_some()) {
        if success {
            h.observe(format!(
                "Wallet address: {}",
                body.pointer("/data/address")
                    .map(display_value)
                    .unwrap_or_else(|| "unknown".to_string())
            ));
            h.observe(format!(
                "Balance: {} {}",
                body.pointer("/data/balance")
                    .map(display_value)
                    .unwrap_or_else(|| "unknown".to_string()),
                body.pointer("/data/currency")
                    .map(display_value)
                    .unwrap_or_default()
            ));
        } else {
            h.observe(format!("Error: {}", field_or(&body, "error", "Unknown error")));
        }
    }
    Ok(success)
}

async fn agent_analyze_performance(h: &mut Harness) -> Result<bool, ProbeError> {
    let request = ProbeRequest::post(
        "Agent analyzePerformance Action",
        "agent",
        json!({"action": "analyzePerformance", "params": {"timeframe": "7d"}}),
    );
    let (success, body) = h.probe_with(request, require_success_flag).await?;

    if let Some(body) = body.filter(|b| b.as_json().is_some()) {
        if success {
            let analysis = field_or(&body, "data", "");
            h.observe("Analysis summary:");
            for line in analysis.lines().take(5) {
                h.observe(format!("  {}", line));
            }
            h.observe("  ...");
        } else {
            h.observe(format!("Error: {}", field_or(&body, "error", "Unknown error")));
        }
    }
    Ok(success)
}

async fn user_groups(h: &mut Harness) -> Result<bool, ProbeError> {
    let path = format!("user-groups?address={}", h.config().user_groups_address);
    let (success, body) = h
        .probe_with(
            ProbeRequest::get("User Groups Endpoint", &path),
            reject_error_object,
        )
        .await?;

    if let Some(Value::Array(groups)) = body.as_ref().and_then(|b| b.as_json()) {
        h.observe(format!("Found {} user groups", groups.len()));
    }
    Ok(success)
}

/// Names of `network` entries that report `circuitBreakerOpen: true`
fn open_circuit_breakers(body: &ResponseBody) -> Vec<String> {
    body.get("network")
        .and_then(Value::as_object)
        .map(|network| {
            network
                .iter()
                .filter(|(_, metrics)| {
                    metrics
                        .get("circuitBreakerOpen")
                        .and_then(Value::as_bool)
                        .unwrap_or(false)
                })
                .map(|(name, _)| name.clone())
                .collect()
        })
        .unwrap_or_default()
}

/// Fire failing requests, then check the server still answers health checks.
///
/// Whether a breaker actually opened cannot be observed reliably, so the
/// verdict only reflects the health re-check.
async fn circuit_breaker(h: &mut Harness) -> Result<bool, ProbeError> {
    const NAME: &str = "Circuit Breaker Test";

    let count = h.config().breaker_probe_count;
    let timeout = h.config().breaker_probe_timeout;
    let spacing = h.config().breaker_probe_spacing;

    h.observe("Making repeated requests to trigger circuit breaker...");
    for i in 1..=count {
        let outcome = h
            .send_unrecorded(HttpMethod::Get, "non-existent-endpoint", timeout)
            .await?;
        match outcome.status() {
            Some(status) => h.observe(format!("Request {}/{}: status {}", i, count, status)),
            None => h.observe(format!(
                "Request {}/{}: error {}",
                i,
                count,
                outcome.failure_reason(0).unwrap_or_default()
            )),
        }
        h.pause_for(spacing).await;
    }

    let (healthy, body) = h
        .probe(ProbeRequest::get(
            "Health Check After Circuit Breaker Test",
            "health",
        ))
        .await?;

    let mut notes = Vec::new();
    if healthy {
        notes.push(
            "Circuit breaker test completed, but actual circuit breaker state could not be definitively verified"
                .to_string(),
        );
        if let Some(body) = &body {
            h.observe(format!(
                "Degraded services: {:?}",
                string_list(body, "/services/degraded")
            ));
            let open = open_circuit_breakers(body);
            for service in &open {
                h.observe(format!("Circuit breaker open for {}", service));
            }
            if !open.is_empty() {
                notes.push(format!("open circuit breakers reported: {}", open.join(", ")));
            }
        }
    } else {
        notes.push(
            "Health check after the failure burst did not succeed; circuit breaker state could not be verified"
                .to_string(),
        );
    }

    let (reset, _) = h
        .probe(ProbeRequest::post(
            "Reset Circuit Breaker",
            "health",
            json!({"action": "reset_circuit_breaker", "service": "all"}),
        ))
        .await?;
    if reset {
        h.observe("Circuit breaker reset request sent");
    }

    h.record_observation(NAME, healthy, notes.join("; "));
    Ok(healthy)
}

/// Keeps track of an enabled degraded mode until it is switched off again.
#[must_use = "degraded mode stays enabled unless the guard is released"]
struct DegradedModeGuard {
    service: &'static str,
    released: bool,
}

impl DegradedModeGuard {
    fn arm(service: &'static str) -> Self {
        Self {
            service,
            released: false,
        }
    }

    /// Ask the server to leave degraded mode. Returns whether it accepted.
    async fn release(mut self, h: &mut Harness) -> Result<bool, ProbeError> {
        self.released = true;
        let (disabled, _) = h
            .probe(ProbeRequest::post(
                "Disable Degraded Mode",
                "health",
                json!({"action": "disable_degraded_mode", "service": self.service}),
            ))
            .await?;

        if disabled {
            h.observe("Degraded mode disabled");
        } else {
            log::warn!("Failed to disable degraded mode for {}", self.service);
            h.observe(format!("Failed to disable degraded mode for {}", self.service));
        }
        Ok(disabled)
    }
}

impl Drop for DegradedModeGuard {
    fn drop(&mut self) {
        if !self.released {
            log::warn!("Degraded mode for {} was left enabled", self.service);
        }
    }
}

/// `Some(listed)` when the interim health check answered, `None` otherwise
async fn verify_degraded(h: &mut Harness) -> Result<Option<bool>, ProbeError> {
    h.probe(ProbeRequest::post(
        "Get Balance in Degraded Mode",
        "agent",
        json!({"action": "getBalance"}),
    ))
    .await?;

    let (health_ok, body) = h
        .probe(ProbeRequest::get("Health Check in Degraded Mode", "health"))
        .await?;
    if !health_ok {
        return Ok(None);
    }

    let degraded = body
        .map(|b| string_list(&b, "/services/degraded"))
        .unwrap_or_default();
    let listed = degraded.iter().any(|s| s == DEGRADED_SERVICE);
    h.observe(format!("Degraded services: {:?}", degraded));
    h.observe(format!("Blockchain service degraded: {}", listed));
    Ok(Some(listed))
}

/// enable -> verify -> disable. The disable step runs whatever the
/// enable and verification steps found and never changes the verdict.
async fn graceful_degradation(h: &mut Harness) -> Result<bool, ProbeError> {
    const NAME: &str = "Graceful Degradation Test";

    // A failed enable may still have switched the service over
    let guard = DegradedModeGuard::arm(DEGRADED_SERVICE);
    let (enabled, _) = h
        .probe(ProbeRequest::post(
            "Enable Degraded Mode",
            "health",
            json!({
                "action": "enable_degraded_mode",
                "service": DEGRADED_SERVICE,
                "config": {"fallbackMode": "cache"}
            }),
        ))
        .await?;

    if !enabled {
        let disabled = guard.release(h).await?;
        let mut notes = format!("Degraded mode could not be enabled for {}", DEGRADED_SERVICE);
        if !disabled {
            notes.push_str("; degraded mode could not be disabled afterwards");
        }
        h.record_observation(NAME, false, notes);
        return Ok(false);
    }
    h.observe(format!("Degraded mode enabled for {} service", DEGRADED_SERVICE));

    let verdict = verify_degraded(h).await;
    let disabled = guard.release(h).await?;
    let verdict = verdict?;

    let success = verdict == Some(true);
    let mut notes = match verdict {
        Some(true) => "Verified service could be put in degraded mode and still function".to_string(),
        Some(false) => format!(
            "{} was not listed among degraded services",
            DEGRADED_SERVICE
        ),
        None => "Health check in degraded mode failed".to_string(),
    };
    if !disabled {
        notes.push_str("; degraded mode could not be disabled afterwards");
    }

    h.record_observation(NAME, success, notes);
    Ok(success)
}

/// Two timed health requests followed by a cache statistics lookup.
/// Timings are reported, never asserted.
async fn caching(h: &mut Harness) -> Result<bool, ProbeError> {
    const NAME: &str = "Caching Test";

    let started = Instant::now();
    let (first, _) = h
        .probe(ProbeRequest::get("First Request (Uncached)", "health"))
        .await?;
    let first_time = started.elapsed();
    if !first {
        h.record_observation(NAME, false, "First health request failed".to_string());
        return Ok(false);
    }
    h.observe(format!(
        "First request time: {:.3} seconds",
        first_time.as_secs_f64()
    ));

    h.pause_for(h.config().cache_pause).await;

    let started = Instant::now();
    let (second, _) = h
        .probe(ProbeRequest::get(
            "Second Request (Potentially Cached)",
            "health",
        ))
        .await?;
    let second_time = started.elapsed();
    if !second {
        h.record_observation(NAME, false, "Second health request failed".to_string());
        return Ok(false);
    }
    h.observe(format!(
        "Second request time: {:.3} seconds",
        second_time.as_secs_f64()
    ));

    let (stats_ok, body) = h
        .probe(ProbeRequest::get("Cache Statistics", "metrics"))
        .await?;
    let cache = body
        .filter(|_| stats_ok)
        .and_then(|b| b.get("cache").filter(|c| c.is_object()).cloned());

    match cache {
        Some(cache) => {
            let hit_rate = cache
                .get("hitRate")
                .map(display_value)
                .unwrap_or_else(|| "0".to_string());
            let entries = cache
                .get("totalEntries")
                .map(display_value)
                .unwrap_or_else(|| "0".to_string());
            h.observe(format!("Cache hit rate: {}%", hit_rate));
            h.observe(format!("Cache entries: {}", entries));
            h.record_observation(
                NAME,
                true,
                format!("Cache hit rate: {}%, Entries: {}", hit_rate, entries),
            );
            Ok(true)
        }
        None => {
            h.record_observation(
                NAME,
                false,
                "Metrics response did not contain cache statistics".to_string(),
            );
            Ok(false)
        }
    }
}
