//! Long-running job submission and polling.

use crate::{AccessToken, HttpResponse, HttpTransport, RemoteError, Result};
use canopy_metrics::{metric_defs, metrics};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default wait between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default number of status checks before giving up.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 30;

/// Fixed-interval polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait before each status check.
    pub interval: Duration,
    /// Maximum number of status checks.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// Structured error reported by a failed job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Vec<Value>,
}

/// Job status as reported by the operations endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobHandle {
    /// Opaque job identifier.
    pub name: String,
    /// Terminal once true.
    #[serde(default)]
    pub done: bool,
    /// Result payload of a completed job.
    #[serde(default)]
    pub response: Option<Value>,
    /// Error payload of a failed job.
    #[serde(default)]
    pub error: Option<JobError>,
}

/// Submits compute expressions and waits for their jobs to finish.
///
/// Status checks for one job are strictly sequential. Re-submitting an
/// expression creates an independent job.
pub struct JobPoller {
    transport: Arc<dyn HttpTransport>,
    compute_url: String,
    operations_url: String,
    policy: PollPolicy,
    cancel: Option<Arc<AtomicBool>>,
}

impl JobPoller {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        compute_url: impl Into<String>,
        operations_url: impl Into<String>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            transport,
            compute_url: compute_url.into(),
            operations_url: operations_url.into(),
            policy,
            cancel: None,
        }
    }

    /// Stop polling with [`RemoteError::Cancelled`] once `flag` is set.
    ///
    /// The flag is checked before each status check; a request already in
    /// flight is not interrupted.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// The polling budget.
    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Submit `expression` and block until its result is available.
    pub fn submit_and_await(&self, token: &AccessToken, expression: &Value, project: Option<&str>) -> Result<Value> {
        let mut body = json!({ "expression": expression });
        if let Some(project) = project {
            body["project"] = Value::String(project.to_string());
        }

        debug!(url = %self.compute_url, "submitting compute expression");
        let response = self.transport.post_json(&self.compute_url, Some(token.secret()), &body)?;
        let payload: Value = check_status(&response, "compute")?.json()?;

        let handle = match as_job_handle(&payload)? {
            Some(handle) => handle,
            None => {
                record_job("immediate");
                return Ok(terminal_result(payload));
            }
        };

        info!(job = %handle.name, "remote job submitted");
        if handle.done {
            return finish(handle);
        }
        self.await_job(token, &handle.name)
    }

    fn await_job(&self, token: &AccessToken, name: &str) -> Result<Value> {
        let url = format!(
            "{}/{}",
            self.operations_url.trim_end_matches('/'),
            name.trim_start_matches('/')
        );

        for attempt in 1..=self.policy.max_attempts {
            if self.is_cancelled() {
                warn!(job = %name, attempt, "remote job polling cancelled");
                record_job("cancelled");
                return Err(RemoteError::Cancelled);
            }
            std::thread::sleep(self.policy.interval);

            metrics::counter!(metric_defs::REMOTE_POLL_ATTEMPTS.name).increment(1);
            let response = self.transport.get(&url, Some(token.secret()))?;
            let handle: JobHandle = check_status(&response, "operations")?.json()?;
            debug!(job = %name, attempt, done = handle.done, "polled remote job");

            if handle.done {
                return finish(handle);
            }
        }

        warn!(job = %name, attempts = self.policy.max_attempts, "remote job did not complete in time");
        record_job("timeout");
        Err(RemoteError::Timeout {
            attempts: self.policy.max_attempts,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

fn record_job(outcome: &'static str) {
    metrics::counter!(metric_defs::REMOTE_JOBS.name, "outcome" => outcome).increment(1);
}

fn check_status<'a>(response: &'a HttpResponse, endpoint: &str) -> Result<&'a HttpResponse> {
    let detail = || format!("{endpoint} endpoint returned HTTP {}: {}", response.status, response.error_message());
    match response.status {
        200..=299 => Ok(response),
        401 | 403 => Err(RemoteError::Authentication(detail())),
        408 | 429 | 500..=599 => Err(RemoteError::Transient(detail())),
        status => Err(RemoteError::RemoteCompute {
            code: i64::from(status),
            message: response.error_message(),
        }),
    }
}

/// A submission answer is a job handle when it names a job and carries no
/// inline result.
fn as_job_handle(payload: &Value) -> Result<Option<JobHandle>> {
    let is_handle = payload.get("name").is_some_and(Value::is_string) && payload.get("result").is_none();
    if !is_handle {
        return Ok(None);
    }
    serde_json::from_value(payload.clone())
        .map(Some)
        .map_err(|e| RemoteError::InvalidResponse(format!("malformed job handle: {e}")))
}

fn terminal_result(mut payload: Value) -> Value {
    match payload.get_mut("result") {
        Some(result) => result.take(),
        None => payload,
    }
}

fn finish(handle: JobHandle) -> Result<Value> {
    if let Some(error) = handle.error {
        warn!(job = %handle.name, code = error.code, message = %error.message, "remote job failed");
        record_job("failed");
        return Err(RemoteError::RemoteCompute {
            code: error.code,
            message: error.message,
        });
    }
    match handle.response {
        Some(response) => {
            info!(job = %handle.name, "remote job completed");
            record_job("completed");
            Ok(terminal_result(response))
        }
        None => Err(RemoteError::InvalidResponse(format!(
            "job {} completed without a response",
            handle.name
        ))),
    }
}
