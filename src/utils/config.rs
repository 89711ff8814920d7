use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_REPORT_FILE: &str = "network_resilience_test_report.json";

/// Harness configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Target server, without the `/api` suffix
    pub base_url: String,

    /// Per-attempt request timeout
    pub request_timeout: Duration,

    /// Attempt budget for every probe
    pub max_attempts: u32,

    /// Delay between attempts of one probe
    pub retry_delay: Duration,

    /// JSON report destination, overwritten each run
    pub report_path: PathBuf,

    /// Optional JUnit XML destination
    pub junit_path: Option<PathBuf>,

    /// Requests fired at a missing endpoint to provoke the circuit breaker
    pub breaker_probe_count: u32,
    pub breaker_probe_timeout: Duration,
    pub breaker_probe_spacing: Duration,

    /// Pause between the two cache-warming requests
    pub cache_pause: Duration,

    /// Wallet address used for the user-groups lookup
    pub user_groups_address: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            max_attempts: 1,
            retry_delay: Duration::from_secs(2),
            report_path: PathBuf::from(DEFAULT_REPORT_FILE),
            junit_path: None,
            breaker_probe_count: 6,
            breaker_probe_timeout: Duration::from_secs(2),
            breaker_probe_spacing: Duration::from_secs(1),
            cache_pause: Duration::from_secs(1),
            user_groups_address: "0x25A40049c13Edf6DcBbcd51Ca0De2C055D3885B5".to_string(),
        }
    }
}

impl HarnessConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }
}
