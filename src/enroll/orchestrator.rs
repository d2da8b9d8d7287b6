//! Submit/poll/retrieve loop against a [`CaClient`].
//!
//! ```text
//! Built --submit--> Submitted --retrieve--> Polling --+--> Issued
//!                       |                     ^  |    |
//!                       |        Pending/     |  |    +--> Failed
//!                       |        Timeout -----+  |
//!                       +--------error-----------+-------> Failed
//! ```
//!
//! Submission errors are terminal. During retrieval only `Pending` and
//! `Timeout` are retried, after sleeping `interval`. Without `max_attempts`
//! or `deadline` the loop polls until the CA answers; dropping the future
//! cancels it.

use crate::ca::{CaClient, IssuedCertificateSet, PickupHandle, RetrieveError};
use crate::errors::{Error, Result};
use crate::observability::MetricsRecorder;
use crate::pki::SigningRequest;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Wait between retrieval polls when nothing else is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How retrieval polling is paced and bounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Stop after this many retrievals
    pub max_attempts: Option<u32>,
    /// Stop once the next sleep would end past this much time since the first poll
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { interval: DEFAULT_POLL_INTERVAL, max_attempts: None, deadline: None }
    }
}

impl PollPolicy {
    pub fn is_bounded(&self) -> bool {
        self.max_attempts.is_some() || self.deadline.is_some()
    }
}

/// States of one enrollment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentState {
    Built,
    Submitted,
    Polling,
    Issued,
    Failed,
}

impl fmt::Display for EnrollmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Built => "built",
            Self::Submitted => "submitted",
            Self::Polling => "polling",
            Self::Issued => "issued",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Drives one signing request through the CA.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    ca: Arc<dyn CaClient>,
    policy: PollPolicy,
    metrics: MetricsRecorder,
}

impl Orchestrator {
    pub fn new(ca: Arc<dyn CaClient>, policy: PollPolicy) -> Self {
        if !policy.is_bounded() {
            debug!(
                interval_ms = policy.interval.as_millis() as u64,
                "CA polling is unbounded; requests wait until the CA answers"
            );
        }
        Self { ca, policy, metrics: MetricsRecorder::new() }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Submit `request` once and poll until the CA issues or fails.
    pub async fn obtain(&self, request: &SigningRequest) -> Result<IssuedCertificateSet> {
        let mut state = EnrollmentState::Built;

        let handle = match self.ca.submit(request).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(
                    common_name = %request.common_name(),
                    state = %state,
                    error = %e,
                    "CA rejected certificate request"
                );
                return Err(Error::ca_submission(e.to_string()));
            }
        };
        state = EnrollmentState::Submitted;
        tracing::Span::current().record("pickup_id", handle.as_str());
        debug!(pickup_id = %handle, state = %state, "Certificate request submitted");

        let result = self.poll(&handle, request.common_name()).await;
        let state = if result.is_ok() { EnrollmentState::Issued } else { EnrollmentState::Failed };
        debug!(pickup_id = %handle, state = %state, "Certificate retrieval finished");
        result
    }

    async fn poll(&self, handle: &PickupHandle, common_name: &str) -> Result<IssuedCertificateSet> {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match self.ca.retrieve(handle).await {
                Ok(issued) => {
                    self.metrics.record_ca_poll("issued");
                    info!(
                        common_name = %common_name,
                        pickup_id = %handle,
                        attempts,
                        "Certificate retrieved"
                    );
                    return Ok(issued);
                }
                Err(RetrieveError::Failed(e)) => {
                    self.metrics.record_ca_poll("error");
                    warn!(pickup_id = %handle, attempts, error = %e, "Certificate retrieval failed");
                    return Err(Error::ca_retrieval(handle.as_str(), e.to_string()));
                }
                Err(e @ (RetrieveError::Pending | RetrieveError::Timeout)) => {
                    self.metrics.record_ca_poll(e.outcome());

                    if self.policy.max_attempts.is_some_and(|max| attempts >= max) {
                        return Err(self.exhausted(handle, attempts));
                    }
                    if let Some(deadline) = self.policy.deadline {
                        if started.elapsed() + self.policy.interval > deadline {
                            return Err(self.exhausted(handle, attempts));
                        }
                    }

                    info!(
                        common_name = %common_name,
                        pickup_id = %handle,
                        attempts,
                        outcome = e.outcome(),
                        "Certificate issue pending, retrying"
                    );
                    tokio::time::sleep(self.policy.interval).await;
                }
            }
        }
    }

    fn exhausted(&self, handle: &PickupHandle, attempts: u32) -> Error {
        warn!(pickup_id = %handle, attempts, "Giving up on pending certificate");
        Error::PollingExhausted { pickup_id: handle.to_string(), attempts }
    }
}
