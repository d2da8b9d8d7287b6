//! Vault PKI certificate authority.
//!
//! Vault signs synchronously, so `submit` does the work and parks the result
//! under a generated pickup id; the first `retrieve` for that id hands it out.

use super::{CaBackendType, CaClient, CaError, IssuedCertificateSet, PickupHandle, RetrieveError};
use crate::config::CaConfig;
use crate::errors::{Error, Result};
use crate::pki::SigningRequest;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{error, info};
use uuid::Uuid;
use vaultrs::api::pki::requests::SignCertificateRequestBuilder;
use vaultrs::client::VaultClient;
use vaultrs::error::ClientError;

/// Signs CSRs through a Vault PKI role (`<mount>/sign/<role>`).
pub struct VaultPkiClient {
    client: VaultClient,
    mount: String,
    role: String,
    issued: DashMap<String, IssuedCertificateSet>,
}

impl std::fmt::Debug for VaultPkiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultPkiClient")
            .field("pki_mount", &self.mount)
            .field("pki_role", &self.role)
            .field("pending_pickups", &self.issued.len())
            .field("client", &"[VaultClient]")
            .finish()
    }
}

impl VaultPkiClient {
    pub fn new(client: VaultClient, mount: impl Into<String>, role: impl Into<String>) -> Self {
        Self { client, mount: mount.into(), role: role.into(), issued: DashMap::new() }
    }

    pub fn from_config(config: &CaConfig) -> Result<Self> {
        let address =
            config.url.as_deref().ok_or_else(|| Error::config("ca.url is required for vault_pki"))?;
        let role = config
            .role
            .as_deref()
            .ok_or_else(|| Error::config("ca.role is required for vault_pki"))?;
        let client = crate::vault::build_client(address, config.access_token.as_ref())?;

        info!(
            vault_addr = %address,
            pki_mount = %config.mount,
            pki_role = %role,
            "Vault PKI certificate authority configured"
        );
        Ok(Self::new(client, &config.mount, role))
    }
}

/// Vault API errors carry the HTTP status; anything else never reached Vault.
fn sign_error(err: ClientError) -> CaError {
    match err {
        ClientError::APIError { code, errors } => {
            CaError::Rejected { status: code, message: errors.join("; ") }
        }
        other => CaError::Transport(format!("Vault PKI sign failed: {}", other)),
    }
}

#[async_trait]
impl CaClient for VaultPkiClient {
    async fn submit(&self, request: &SigningRequest) -> std::result::Result<PickupHandle, CaError> {
        let names = request.names();
        let mut opts = SignCertificateRequestBuilder::default();
        opts.alt_names(names.alt_names.join(","));

        let response = vaultrs::pki::cert::ca::sign(
            &self.client,
            &self.mount,
            &self.role,
            request.pem(),
            &names.common_name,
            Some(&mut opts),
        )
        .await
        .map_err(|e| {
            error!(error = %e, common_name = %names.common_name, "Vault PKI sign failed");
            sign_error(e)
        })?;

        let chain = match response.ca_chain {
            Some(chain) if !chain.is_empty() => chain,
            _ => vec![response.issuing_ca],
        };

        let pickup_id = Uuid::new_v4().to_string();
        info!(
            common_name = %names.common_name,
            serial_number = %response.serial_number,
            pickup_id = %pickup_id,
            "Certificate signed by Vault PKI"
        );
        self.issued.insert(
            pickup_id.clone(),
            IssuedCertificateSet { certificate: response.certificate, chain },
        );
        Ok(PickupHandle::new(pickup_id))
    }

    async fn retrieve(
        &self,
        handle: &PickupHandle,
    ) -> std::result::Result<IssuedCertificateSet, RetrieveError> {
        self.issued
            .remove(handle.as_str())
            .map(|(_, set)| set)
            .ok_or_else(|| CaError::UnknownPickup(handle.to_string()).into())
    }

    fn backend_type(&self) -> CaBackendType {
        CaBackendType::VaultPki
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ca::CaBackendType;

    fn client() -> VaultPkiClient {
        let config = CaConfig {
            backend: CaBackendType::VaultPki,
            url: Some("http://127.0.0.1:8200".into()),
            role: Some("web".into()),
            ..Default::default()
        };
        VaultPkiClient::from_config(&config).unwrap()
    }

    #[test]
    fn test_from_config_requires_role() {
        let config = CaConfig {
            backend: CaBackendType::VaultPki,
            url: Some("http://127.0.0.1:8200".into()),
            ..Default::default()
        };
        assert!(matches!(VaultPkiClient::from_config(&config), Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_retrieve_hands_out_parked_certificate_once() {
        let ca = client();
        let set = IssuedCertificateSet { certificate: "leaf".into(), chain: vec!["ca".into()] };
        ca.issued.insert("pickup-1".into(), set.clone());

        let handle = PickupHandle::new("pickup-1");
        assert_eq!(ca.retrieve(&handle).await.unwrap(), set);

        let err = ca.retrieve(&handle).await.unwrap_err();
        assert!(!err.is_retryable());
        assert!(matches!(err, RetrieveError::Failed(CaError::UnknownPickup(_))));
    }

    #[test]
    fn test_api_error_maps_to_rejection() {
        let err = sign_error(ClientError::APIError {
            code: 400,
            errors: vec!["common name not allowed by this role".into()],
        });
        match err {
            CaError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("not allowed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_debug_hides_client() {
        let debug = format!("{:?}", client());
        assert!(debug.contains("pki_role: \"web\""));
        assert!(debug.contains("[VaultClient]"));
    }
}
