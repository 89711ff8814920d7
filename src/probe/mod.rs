//! HTTP probe primitive
//!
//! A probe is one logical request against `<base_url>/api/<path>`, retried
//! up to a fixed attempt budget, and classified solely by comparing the
//! received status code with the expected one.

pub mod retry;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use retry::{run_with_retry, NoPause, Pause, RecordingPause, Retried, RetryPolicy, TokioPause};

/// Precondition violations. These abort the run instead of being recorded.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("unsupported HTTP method: {0} (only GET and POST are supported)")]
    UnsupportedMethod(String),

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("failed to encode request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl FromStr for HttpMethod {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            _ => Err(ProbeError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// Decoded response body: JSON when it parses, the raw text otherwise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn decode(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(text),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }

    /// Field of a JSON object body. Raw text and non-object JSON have no fields.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_json()?.as_object()?.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Look up a nested field with a JSON pointer such as `/services/degraded`
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.as_json()?.pointer(pointer)
    }
}

/// A single logical probe as requested by a scenario
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub name: String,
    pub method: HttpMethod,
    pub path: String,
    pub expected_status: u16,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub max_attempts: Option<u32>,
    pub retry_delay: Option<Duration>,
}

impl ProbeRequest {
    pub fn new(name: &str, method: HttpMethod, path: &str) -> Self {
        Self {
            name: name.to_string(),
            method,
            path: path.to_string(),
            expected_status: 200,
            body: None,
            headers: Vec::new(),
            max_attempts: None,
            retry_delay: None,
        }
    }

    pub fn get(name: &str, path: &str) -> Self {
        Self::new(name, HttpMethod::Get, path)
    }

    pub fn post(name: &str, path: &str, body: Value) -> Self {
        let mut request = Self::new(name, HttpMethod::Post, path);
        request.body = Some(body);
        request
    }

    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// `Content-Type: application/json` merged with the caller's headers.
    /// Caller values win on conflict.
    pub fn merged_headers(&self) -> Result<HeaderMap, ProbeError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in &self.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| ProbeError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| ProbeError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

/// Result of one attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Response { status: u16, body: ResponseBody },
    Transport { error: String },
}

impl AttemptOutcome {
    pub fn matches(&self, expected_status: u16) -> bool {
        matches!(self, AttemptOutcome::Response { status, .. } if *status == expected_status)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            AttemptOutcome::Response { status, .. } => Some(*status),
            AttemptOutcome::Transport { .. } => None,
        }
    }

    pub fn body(&self) -> Option<&ResponseBody> {
        match self {
            AttemptOutcome::Response { body, .. } => Some(body),
            AttemptOutcome::Transport { .. } => None,
        }
    }

    /// Why the attempt failed when `expected_status` was required
    pub fn failure_reason(&self, expected_status: u16) -> Option<String> {
        match self {
            AttemptOutcome::Response { status, .. } if *status == expected_status => None,
            AttemptOutcome::Response { status, .. } => Some(format!(
                "Expected status {}, got {}",
                expected_status, status
            )),
            AttemptOutcome::Transport { error } => Some(error.clone()),
        }
    }
}

/// Final classification of a probe after all retries
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub name: String,
    pub expected_status: u16,
    pub outcome: AttemptOutcome,
    pub attempts: u32,
}

impl ProbeResult {
    pub fn success(&self) -> bool {
        self.outcome.matches(self.expected_status)
    }

    pub fn status_code(&self) -> Option<u16> {
        self.outcome.status()
    }

    pub fn body(&self) -> Option<&ResponseBody> {
        self.outcome.body()
    }

    pub fn error(&self) -> Option<String> {
        self.outcome.failure_reason(self.expected_status)
    }
}

/// Issues probes against one base URL
pub struct Prober {
    client: reqwest::Client,
    base_url: String,
    default_policy: RetryPolicy,
}

impl Prober {
    pub fn new(base_url: &str, timeout: Duration, default_policy: RetryPolicy) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_policy,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `<base_url>/api/<path>`; `path` may carry a query string
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn policy_for(&self, request: &ProbeRequest) -> RetryPolicy {
        RetryPolicy::new(
            request.max_attempts.unwrap_or(self.default_policy.max_attempts),
            request.retry_delay.unwrap_or(self.default_policy.delay),
        )
    }

    /// One attempt, no retries. Transport failures become
    /// [`AttemptOutcome::Transport`].
    pub async fn attempt(
        &self,
        request: &ProbeRequest,
        timeout: Option<Duration>,
    ) -> Result<AttemptOutcome, ProbeError> {
        let url = self.url_for(&request.path);
        let headers = request.merged_headers()?;

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        }
        .headers(headers);

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        if request.method == HttpMethod::Post {
            if let Some(body) = &request.body {
                builder = builder.body(serde_json::to_vec(body)?);
            }
        }

        log::debug!("{} {}", request.method, url);

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                return Ok(AttemptOutcome::Transport {
                    error: e.to_string(),
                })
            }
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(text) => Ok(AttemptOutcome::Response {
                status,
                body: ResponseBody::decode(text),
            }),
            Err(e) => Ok(AttemptOutcome::Response {
                status,
                body: ResponseBody::Text(format!("failed to read response body: {}", e)),
            }),
        }
    }

    /// Unrecorded single request with its own timeout
    pub async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        timeout: Duration,
    ) -> Result<AttemptOutcome, ProbeError> {
        let request = ProbeRequest::new("", method, path);
        self.attempt(&request, Some(timeout)).await
    }

    /// Run `request` with its retry budget. `on_retry` receives the attempt
    /// number and the failure reason before each pause.
    pub async fn execute<R>(
        &self,
        request: &ProbeRequest,
        pause: &dyn Pause,
        mut on_retry: R,
    ) -> Result<ProbeResult, ProbeError>
    where
        R: FnMut(u32, u32, String),
    {
        // Reject bad headers/bodies up front instead of once per attempt
        request.merged_headers()?;
        if let Some(body) = &request.body {
            serde_json::to_vec(body)?;
        }

        let policy = self.policy_for(request);
        let expected = request.expected_status;

        let retried = run_with_retry(
            policy,
            pause,
            |_| self.attempt(request, None),
            |result: &Result<AttemptOutcome, ProbeError>| match result {
                Ok(outcome) => outcome.matches(expected),
                Err(_) => true,
            },
            |attempt, result| {
                if let Ok(outcome) = result {
                    let reason = outcome.failure_reason(expected).unwrap_or_default();
                    log::warn!(
                        "{}: attempt {}/{} failed: {}",
                        request.name,
                        attempt,
                        policy.max_attempts,
                        reason
                    );
                    on_retry(attempt, policy.max_attempts, reason);
                }
            },
        )
        .await;

        Ok(ProbeResult {
            name: request.name.clone(),
            expected_status: expected,
            outcome: retried.last?,
            attempts: retried.attempts,
        })
    }
}
