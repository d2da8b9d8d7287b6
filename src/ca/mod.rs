//! Certificate authority clients.
//!
//! The enrollment orchestrator only ever sees [`CaClient`]: submit a CSR once,
//! then poll with the returned [`PickupHandle`] until the CA hands back an
//! [`IssuedCertificateSet`]. Transport, authentication and endpoint details
//! belong to the concrete backends.
//!
//! # Available Backends
//!
//! - [`TppClient`]: Venafi Trust Protection Platform REST API (asynchronous issuance)
//! - [`VaultPkiClient`]: HashiCorp Vault PKI `sign` endpoint
//! - [`LocalCa`]: in-process CA for development
//! - [`ScriptedCaClient`]: replays a fixed sequence of outcomes, for tests

mod local;
mod mock;
mod tpp;
mod vault_pki;

pub use local::LocalCa;
pub use mock::{ScriptedCaClient, ScriptedOutcome};
pub use tpp::TppClient;
pub use vault_pki::VaultPkiClient;

use crate::config::CaConfig;
use crate::errors::{Error, Result};
use crate::pki::SigningRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Type of certificate authority backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaBackendType {
    /// Venafi Trust Protection Platform
    Tpp,
    /// HashiCorp Vault PKI secrets engine
    VaultPki,
    /// In-process CA
    Local,
    /// Scripted client for tests
    Mock,
}

impl CaBackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tpp => "tpp",
            Self::VaultPki => "vault_pki",
            Self::Local => "local",
            Self::Mock => "mock",
        }
    }
}

impl fmt::Display for CaBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Opaque identifier returned by the CA on submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PickupHandle(String);

impl PickupHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PickupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Certificates returned by a successful retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCertificateSet {
    /// Leaf certificate PEM
    pub certificate: String,
    /// Issuing chain PEMs, leaf-most first
    pub chain: Vec<String>,
}

/// Errors reported by a CA backend.
#[derive(thiserror::Error, Debug)]
pub enum CaError {
    /// Connection or protocol failure talking to the CA
    #[error("transport error: {0}")]
    Transport(String),

    /// The CA answered with an error status
    #[error("CA rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The CA answered with something we cannot interpret
    #[error("unexpected CA response: {0}")]
    InvalidResponse(String),

    /// The pickup handle is not known to the CA
    #[error("unknown pickup id {0}")]
    UnknownPickup(String),

    /// The CA refused to sign the request
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Outcome classes of a retrieval poll other than success.
#[derive(thiserror::Error, Debug)]
pub enum RetrieveError {
    /// Issuance has not completed yet
    #[error("certificate issuance is still pending")]
    Pending,

    /// The CA (or the connection to it) timed out; safe to poll again
    #[error("CA timed out while retrieving certificate")]
    Timeout,

    /// Any other failure; never retried
    #[error(transparent)]
    Failed(#[from] CaError),
}

impl RetrieveError {
    /// Pending and Timeout are the only retryable outcomes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Pending | Self::Timeout)
    }

    /// Short label for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Timeout => "timeout",
            Self::Failed(_) => "error",
        }
    }
}

/// Asynchronous certificate authority.
///
/// Implementations must be thread-safe (`Send + Sync`); one client instance
/// serves all concurrent enrollments.
#[async_trait]
pub trait CaClient: Send + Sync + fmt::Debug {
    /// Submit a signing request. Called exactly once per enrollment.
    async fn submit(&self, request: &SigningRequest) -> std::result::Result<PickupHandle, CaError>;

    /// Poll for the certificate issued for `handle`.
    async fn retrieve(
        &self,
        handle: &PickupHandle,
    ) -> std::result::Result<IssuedCertificateSet, RetrieveError>;

    /// Get the type of this backend.
    fn backend_type(&self) -> CaBackendType;
}

/// Build the CA client selected by configuration.
pub fn build_ca_client(config: &CaConfig) -> Result<Arc<dyn CaClient>> {
    let client: Arc<dyn CaClient> = match config.backend {
        CaBackendType::Tpp => Arc::new(TppClient::from_config(config)?),
        CaBackendType::VaultPki => Arc::new(VaultPkiClient::from_config(config)?),
        CaBackendType::Local => Arc::new(LocalCa::new(config.local_pending_polls)?),
        CaBackendType::Mock => {
            return Err(Error::config("the mock CA backend is only available from tests"))
        }
    };
    Ok(client)
}
