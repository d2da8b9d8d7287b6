//! Scripted CA client for tests.

use super::{CaBackendType, CaClient, CaError, IssuedCertificateSet, PickupHandle, RetrieveError};
use crate::pki::SigningRequest;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// One scripted retrieval outcome.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    Pending,
    Timeout,
    Failed(String),
    Issued(IssuedCertificateSet),
}

/// Replays a fixed sequence of retrieval outcomes and counts calls.
///
/// Once the script is exhausted every further retrieval reports `Pending`.
#[derive(Debug, Default)]
pub struct ScriptedCaClient {
    submit_error: Option<String>,
    script: Mutex<VecDeque<ScriptedOutcome>>,
    submissions: Mutex<Vec<String>>,
    submit_calls: AtomicU32,
    retrieve_calls: AtomicU32,
}

impl ScriptedCaClient {
    pub fn new(script: impl IntoIterator<Item = ScriptedOutcome>) -> Self {
        Self { script: Mutex::new(script.into_iter().collect()), ..Default::default() }
    }

    /// A client whose submission always fails.
    pub fn failing_submit(message: impl Into<String>) -> Self {
        Self { submit_error: Some(message.into()), ..Default::default() }
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn retrieve_calls(&self) -> u32 {
        self.retrieve_calls.load(Ordering::SeqCst)
    }

    /// PEM of every CSR submitted so far.
    pub fn submitted_csrs(&self) -> Vec<String> {
        self.submissions.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CaClient for ScriptedCaClient {
    async fn submit(&self, request: &SigningRequest) -> std::result::Result<PickupHandle, CaError> {
        let call = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut submissions) = self.submissions.lock() {
            submissions.push(request.pem().to_string());
        }
        match &self.submit_error {
            Some(message) => Err(CaError::Rejected { status: 400, message: message.clone() }),
            None => Ok(PickupHandle::new(format!("scripted-{}", call))),
        }
    }

    async fn retrieve(
        &self,
        _handle: &PickupHandle,
    ) -> std::result::Result<IssuedCertificateSet, RetrieveError> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().ok().and_then(|mut script| script.pop_front());
        match next {
            Some(ScriptedOutcome::Issued(set)) => Ok(set),
            Some(ScriptedOutcome::Timeout) => Err(RetrieveError::Timeout),
            Some(ScriptedOutcome::Failed(message)) => {
                Err(CaError::Rejected { status: 500, message }.into())
            }
            Some(ScriptedOutcome::Pending) | None => Err(RetrieveError::Pending),
        }
    }

    fn backend_type(&self) -> CaBackendType {
        CaBackendType::Mock
    }
}
