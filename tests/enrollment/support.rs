use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use certwarden::ca::{CaClient, IssuedCertificateSet};
use certwarden::enroll::{CertificateIssuer, PollPolicy};
use certwarden::lease::LocalLeaseManager;
use certwarden::pki::RolePolicy;
use certwarden::roles::ConfigRoleStore;
use certwarden::storage::{MemoryStorage, Storage, StorageEntry, StorageError};
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair, SerialNumber,
};
use time::OffsetDateTime;
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::FromDer;

/// Issuing CA used to mint leaf certificates with chosen serials and expiry.
pub struct TestChain {
    pub ca_pem: String,
    ca_cert: Certificate,
    ca_key: KeyPair,
}

impl TestChain {
    pub fn new() -> anyhow::Result<Self> {
        let mut params = CertificateParams::new(Vec::new()).context("build CA params")?;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.distinguished_name.push(DnType::CommonName, "certwarden test issuing CA");

        let ca_key = KeyPair::generate().context("generate CA key")?;
        let ca_cert = params.self_signed(&ca_key).context("self-sign CA")?;
        Ok(Self { ca_pem: ca_cert.pem(), ca_cert, ca_key })
    }

    /// A leaf for `common_name`, returned the way a CA hands it back.
    pub fn leaf(
        &self,
        common_name: &str,
        serial: &[u8],
        not_after: OffsetDateTime,
    ) -> anyhow::Result<IssuedCertificateSet> {
        let mut params =
            CertificateParams::new(vec![common_name.to_string()]).context("build leaf params")?;
        params.distinguished_name.push(DnType::CommonName, common_name);
        params.serial_number = Some(SerialNumber::from_slice(serial));
        params.not_before = OffsetDateTime::now_utc() - time::Duration::days(1);
        params.not_after = not_after;

        let key = KeyPair::generate().context("generate leaf key")?;
        let cert = params.signed_by(&key, &self.ca_cert, &self.ca_key).context("sign leaf")?;
        Ok(IssuedCertificateSet { certificate: cert.pem(), chain: vec![self.ca_pem.clone()] })
    }
}

/// Storage that rejects writes to keys starting with `fail_prefix`.
#[derive(Debug, Clone)]
pub struct FailingStorage {
    pub inner: MemoryStorage,
    fail_prefix: String,
}

impl FailingStorage {
    pub fn failing_on(prefix: &str) -> Self {
        Self { inner: MemoryStorage::new(), fail_prefix: prefix.to_string() }
    }
}

#[async_trait]
impl Storage for FailingStorage {
    async fn put(&self, entry: StorageEntry) -> Result<(), StorageError> {
        if entry.key.starts_with(&self.fail_prefix) {
            return Err(StorageError::Backend("permission denied".into()));
        }
        self.inner.put(entry).await
    }

    async fn get(&self, key: &str) -> Result<Option<StorageEntry>, StorageError> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.inner.list(prefix).await
    }
}

pub fn role(key_type: &str, store_by_cn: bool, store_by_serial: bool) -> RolePolicy {
    RolePolicy {
        key_type: key_type.to_string(),
        key_curve: "P256".to_string(),
        store_by_common_name: store_by_cn,
        store_by_serial,
        ..Default::default()
    }
}

pub fn issuer(
    roles: ConfigRoleStore,
    ca: Arc<dyn CaClient>,
    storage: Arc<dyn Storage>,
    leases: LocalLeaseManager,
) -> CertificateIssuer {
    CertificateIssuer::new(Arc::new(roles), ca, storage, Arc::new(leases), PollPolicy::default())
}

/// DNS names requested by a PEM CSR.
pub fn csr_dns_names(pem: &str) -> Vec<String> {
    let (_, pem) = parse_x509_pem(pem.as_bytes()).expect("CSR PEM");
    let (_, csr) = X509CertificationRequest::from_der(&pem.contents).expect("CSR DER");
    let mut names = Vec::new();
    for ext in csr.requested_extensions().into_iter().flatten() {
        if let ParsedExtension::SubjectAlternativeName(san) = ext {
            for name in &san.general_names {
                if let GeneralName::DNSName(dns) = name {
                    names.push(dns.to_string());
                }
            }
        }
    }
    names
}

pub fn days_from_now(days: i64) -> OffsetDateTime {
    OffsetDateTime::now_utc() + time::Duration::days(days)
}
