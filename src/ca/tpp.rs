//! Venafi Trust Protection Platform client.
//!
//! Issuance through TPP is asynchronous: `certificates/request` registers the
//! CSR under a policy folder and returns a certificate DN, which is then
//! polled through `certificates/retrieve` until the platform has the
//! certificate. HTTP 202 means the workflow is still running.

use super::{CaBackendType, CaClient, CaError, IssuedCertificateSet, PickupHandle, RetrieveError};
use crate::config::CaConfig;
use crate::errors::{Error, Result};
use crate::pki::certificate::split_pem_bundle;
use crate::pki::SigningRequest;
use crate::secret::SecretString;
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

const POLICY_ROOT: &str = "\\VED\\Policy\\";
const REQUEST_PATH: &str = "/vedsdk/certificates/request";
const RETRIEVE_PATH: &str = "/vedsdk/certificates/retrieve";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CertificateRequestBody<'a> {
    #[serde(rename = "PolicyDN")]
    policy_dn: &'a str,
    #[serde(rename = "PKCS10")]
    pkcs10: &'a str,
    object_name: &'a str,
    disable_automatic_renewal: bool,
}

#[derive(Debug, Deserialize)]
struct CertificateRequestResponse {
    #[serde(rename = "CertificateDN")]
    certificate_dn: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RetrieveRequestBody<'a> {
    #[serde(rename = "CertificateDN")]
    certificate_dn: &'a str,
    format: &'a str,
    include_chain: bool,
    root_first_order: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RetrieveResponse {
    certificate_data: String,
}

/// REST client for TPP's certificate request/retrieve endpoints.
#[derive(Debug, Clone)]
pub struct TppClient {
    client: Client,
    base_url: String,
    policy_dn: String,
    access_token: SecretString,
}

impl TppClient {
    pub fn new(
        base_url: impl Into<String>,
        zone: &str,
        access_token: SecretString,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy_dn: policy_dn(zone),
            access_token,
        })
    }

    pub fn from_config(config: &CaConfig) -> Result<Self> {
        let url = config.url.as_deref().ok_or_else(|| Error::config("ca.url is required for tpp"))?;
        let zone =
            config.zone.as_deref().ok_or_else(|| Error::config("ca.zone is required for tpp"))?;
        let token = config
            .access_token
            .clone()
            .ok_or_else(|| Error::config("ca.access_token is required for tpp"))?;

        Self::new(url, zone, token, config.timeout())
    }

    pub fn policy_dn(&self) -> &str {
        &self.policy_dn
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        self.client.post(&url).bearer_auth(self.access_token.expose_secret())
    }
}

/// Prefix a bare zone name with the TPP policy root.
fn policy_dn(zone: &str) -> String {
    if zone.starts_with(POLICY_ROOT) {
        zone.to_string()
    } else {
        format!("{}{}", POLICY_ROOT, zone.trim_start_matches('\\'))
    }
}

async fn rejection(response: reqwest::Response) -> CaError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_else(|_| "<unreadable body>".to_string());
    CaError::Rejected { status, message }
}

#[async_trait]
impl CaClient for TppClient {
    async fn submit(&self, request: &SigningRequest) -> std::result::Result<PickupHandle, CaError> {
        let body = CertificateRequestBody {
            policy_dn: &self.policy_dn,
            pkcs10: request.pem(),
            object_name: request.common_name(),
            disable_automatic_renewal: true,
        };

        let response = self
            .post(REQUEST_PATH)
            .json(&body)
            .send()
            .await
            .map_err(|e| CaError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let parsed: CertificateRequestResponse =
            response.json().await.map_err(|e| CaError::InvalidResponse(e.to_string()))?;

        info!(
            common_name = %request.common_name(),
            certificate_dn = %parsed.certificate_dn,
            "Certificate request accepted by TPP"
        );
        Ok(PickupHandle::new(parsed.certificate_dn))
    }

    async fn retrieve(
        &self,
        handle: &PickupHandle,
    ) -> std::result::Result<IssuedCertificateSet, RetrieveError> {
        let body = RetrieveRequestBody {
            certificate_dn: handle.as_str(),
            format: "base64",
            include_chain: true,
            root_first_order: false,
        };

        let response = match self.post(RETRIEVE_PATH).json(&body).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(pickup_id = %handle, "TPP retrieve timed out");
                return Err(RetrieveError::Timeout);
            }
            Err(e) => return Err(CaError::Transport(e.to_string()).into()),
        };

        match response.status() {
            StatusCode::OK => {}
            StatusCode::ACCEPTED => return Err(RetrieveError::Pending),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                return Err(RetrieveError::Timeout)
            }
            _ => return Err(rejection(response).await.into()),
        }

        let parsed: RetrieveResponse =
            response.json().await.map_err(|e| CaError::InvalidResponse(e.to_string()))?;

        let compact: String =
            parsed.certificate_data.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| CaError::InvalidResponse(format!("CertificateData is not base64: {}", e)))?;
        let bundle = String::from_utf8(decoded)
            .map_err(|e| CaError::InvalidResponse(format!("CertificateData is not PEM: {}", e)))?;

        let mut blocks = split_pem_bundle(&bundle).into_iter();
        let certificate = blocks.next().ok_or_else(|| {
            CaError::InvalidResponse("CertificateData contains no certificate".to_string())
        })?;

        Ok(IssuedCertificateSet { certificate, chain: blocks.collect() })
    }

    fn backend_type(&self) -> CaBackendType {
        CaBackendType::Tpp
    }
}
