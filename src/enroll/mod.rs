//! # Certificate Enrollment
//!
//! [`CertificateIssuer`] is the inbound surface: `issue` runs one enrollment
//! end to end, `revoke` is accepted and ignored.
//!
//! ```text
//! role lookup -> name normalization -> key + CSR -> submit/poll (CA)
//!             -> materialize -> persist + lease -> IssueResponse
//! ```

pub mod orchestrator;
pub mod persistence;

pub use orchestrator::{EnrollmentState, Orchestrator, PollPolicy, DEFAULT_POLL_INTERVAL};
pub use persistence::{
    CertificateData, CertificateRecord, IssueResponse, PersistenceBinder, PRIVATE_KEY_WARNING,
};

use crate::ca::{build_ca_client, CaClient};
use crate::config::AppConfig;
use crate::enrollment_span;
use crate::errors::{Error, Result};
use crate::lease::{LeaseManager, LocalLeaseManager};
use crate::observability::MetricsRecorder;
use crate::pki::{build_signing_request, materialize, SubjectNames};
use crate::roles::{build_role_store, RoleStore};
use crate::storage::{build_storage, Storage};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn, Instrument};

/// Issues certificates for configured roles.
#[derive(Debug, Clone)]
pub struct CertificateIssuer {
    roles: Arc<dyn RoleStore>,
    orchestrator: Orchestrator,
    binder: PersistenceBinder,
    metrics: MetricsRecorder,
}

impl CertificateIssuer {
    pub fn new(
        roles: Arc<dyn RoleStore>,
        ca: Arc<dyn CaClient>,
        storage: Arc<dyn Storage>,
        leases: Arc<dyn LeaseManager>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            roles,
            orchestrator: Orchestrator::new(ca, policy),
            binder: PersistenceBinder::new(storage, leases),
            metrics: MetricsRecorder::new(),
        }
    }

    /// Wire every collaborator from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let ca = build_ca_client(&config.ca)?;
        let storage = build_storage(&config.storage)?;
        let roles = build_role_store(config, storage.clone());
        let leases = Arc::new(LocalLeaseManager::new(config.lease.mount.clone()));

        info!(
            ca_backend = %ca.backend_type(),
            storage_backend = %config.storage.backend,
            role_source = %config.role_source,
            "Certificate issuer ready"
        );
        Ok(Self::new(roles, ca, storage, leases, config.polling.poll_policy()))
    }

    /// Enroll a certificate for `common_name`/`alt_names` under `role`.
    ///
    /// Holds the caller until the CA answers (or a polling bound is hit).
    pub async fn issue(
        &self,
        role: &str,
        common_name: &str,
        alt_names: &[String],
    ) -> Result<IssueResponse> {
        let started = Instant::now();
        let span = enrollment_span!(role, common_name);

        let result = self.enroll(role, common_name, alt_names).instrument(span).await;

        let outcome = match &result {
            Ok(_) => "issued",
            Err(e) => e.kind(),
        };
        self.metrics.record_enrollment(role, outcome, started.elapsed().as_secs_f64());
        result
    }

    async fn enroll(
        &self,
        role: &str,
        common_name: &str,
        alt_names: &[String],
    ) -> Result<IssueResponse> {
        let policy = self.roles.require_role(role).await?;
        let names = SubjectNames::normalize(common_name, alt_names)?;
        let spec = policy.key_spec()?;

        info!(
            common_name = %names.common_name,
            alt_names = ?names.alt_names,
            key_spec = %spec,
            "Starting enrollment"
        );

        // RSA generation can take seconds
        let (request, key) =
            tokio::task::spawn_blocking(move || build_signing_request(&names, spec))
                .await
                .map_err(|e| Error::internal(format!("Key generation task failed: {}", e)))??;

        let issued = self.orchestrator.obtain(&request).await?;
        let certificate = materialize(&issued)?;
        tracing::Span::current().record("serial_number", certificate.serial_number.as_str());

        let response =
            self.binder.bind(role, &policy, request.common_name(), &certificate, &key).await?;

        info!(
            serial_number = %certificate.serial_number,
            not_after = %certificate.not_after,
            leased = response.lease.is_some(),
            "Certificate issued"
        );
        Ok(response)
    }

    /// Accept a revocation request. Nothing is looked up or revoked.
    #[instrument(skip(self))]
    pub async fn revoke(&self, role: &str, certificate_uid: &str) -> Result<()> {
        warn!("Revocation is not implemented; request ignored");
        Ok(())
    }
}
