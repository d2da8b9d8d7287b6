//! In-process certificate authority for development and tests.
//!
//! A throwaway P-256 root is generated when the CA is created. CSRs are
//! signed at submission; `pending_polls` makes the first N retrievals of each
//! pickup report `Pending`, which exercises the polling path without a real
//! asynchronous CA. Accepts RSA (2048 bits and up), P-256 and P-384 requests.

use super::{CaBackendType, CaClient, CaError, IssuedCertificateSet, PickupHandle, RetrieveError};
use crate::errors::{Error, Result};
use crate::pki::SigningRequest;
use async_trait::async_trait;
use dashmap::DashMap;
use rand::RngCore;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, CertificateSigningRequestParams, DnType,
    IsCa, KeyPair, KeyUsagePurpose, SerialNumber,
};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

/// Validity of certificates issued by the local CA.
pub const LOCAL_CERT_VALIDITY: Duration = Duration::from_secs(90 * 24 * 60 * 60);

struct Pickup {
    remaining_pending: u32,
    issued: IssuedCertificateSet,
}

pub struct LocalCa {
    ca_cert: Certificate,
    ca_key: KeyPair,
    pending_polls: u32,
    validity: Duration,
    pickups: DashMap<String, Pickup>,
}

impl std::fmt::Debug for LocalCa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCa")
            .field("pending_polls", &self.pending_polls)
            .field("validity", &self.validity)
            .field("pickups", &self.pickups.len())
            .finish()
    }
}

impl LocalCa {
    pub fn new(pending_polls: u32) -> Result<Self> {
        let ca_key = KeyPair::generate()
            .map_err(|e| Error::internal(format!("Failed to generate CA key: {}", e)))?;

        let mut params = CertificateParams::new(Vec::<String>::new())
            .map_err(|e| Error::internal(format!("Invalid CA parameters: {}", e)))?;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.distinguished_name.push(DnType::CommonName, "certwarden local CA");
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];

        let ca_cert = params
            .self_signed(&ca_key)
            .map_err(|e| Error::internal(format!("Failed to self-sign CA: {}", e)))?;

        info!(pending_polls, "Local certificate authority initialized");
        Ok(Self {
            ca_cert,
            ca_key,
            pending_polls,
            validity: LOCAL_CERT_VALIDITY,
            pickups: DashMap::new(),
        })
    }

    /// Override the validity of issued certificates.
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// PEM of the root that signs every issued certificate.
    pub fn ca_certificate_pem(&self) -> String {
        self.ca_cert.pem()
    }

    fn sign(&self, csr_pem: &str) -> std::result::Result<IssuedCertificateSet, CaError> {
        let mut csr = CertificateSigningRequestParams::from_pem(csr_pem)
            .map_err(|e| CaError::Signing(format!("unsupported or invalid CSR: {}", e)))?;

        let mut serial = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut serial);
        serial[0] &= 0x7f;
        csr.params.serial_number = Some(SerialNumber::from_slice(&serial));

        let now = OffsetDateTime::now_utc();
        csr.params.not_before = now;
        csr.params.not_after = now + self.validity;

        let cert = csr
            .signed_by(&self.ca_cert, &self.ca_key)
            .map_err(|e| CaError::Signing(e.to_string()))?;

        Ok(IssuedCertificateSet { certificate: cert.pem(), chain: vec![self.ca_cert.pem()] })
    }
}

#[async_trait]
impl CaClient for LocalCa {
    async fn submit(&self, request: &SigningRequest) -> std::result::Result<PickupHandle, CaError> {
        let issued = self.sign(request.pem())?;
        let pickup_id = Uuid::new_v4().to_string();

        debug!(
            common_name = %request.common_name(),
            pickup_id = %pickup_id,
            "Local CA signed certificate request"
        );
        self.pickups
            .insert(pickup_id.clone(), Pickup { remaining_pending: self.pending_polls, issued });
        Ok(PickupHandle::new(pickup_id))
    }

    async fn retrieve(
        &self,
        handle: &PickupHandle,
    ) -> std::result::Result<IssuedCertificateSet, RetrieveError> {
        {
            let mut pickup = self
                .pickups
                .get_mut(handle.as_str())
                .ok_or_else(|| CaError::UnknownPickup(handle.to_string()))?;
            if pickup.remaining_pending > 0 {
                pickup.remaining_pending -= 1;
                return Err(RetrieveError::Pending);
            }
        }

        self.pickups
            .remove(handle.as_str())
            .map(|(_, pickup)| pickup.issued)
            .ok_or_else(|| CaError::UnknownPickup(handle.to_string()).into())
    }

    fn backend_type(&self) -> CaBackendType {
        CaBackendType::Local
    }
}
