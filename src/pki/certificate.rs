//! Certificate materialization.
//!
//! Turns the PEM blocks handed back by a CA into the fields that get stored
//! and returned: the leaf, the joined chain, the normalized serial number and
//! the expiry used for lease TTLs.

use crate::ca::IssuedCertificateSet;
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use x509_parser::pem::parse_x509_pem;

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// Parsed view of an issued certificate set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedCertificate {
    /// Leaf certificate PEM
    pub certificate: String,
    /// Leaf followed by the issuing chain, newline separated
    pub certificate_chain: String,
    /// Colon separated uppercase hex, e.g. `1A:2B:03`
    pub serial_number: String,
    pub not_after: DateTime<Utc>,
}

impl MaterializedCertificate {
    /// Serial number in the form used for storage keys (`1a-2b-03`).
    pub fn storage_serial(&self) -> String {
        storage_serial(&self.serial_number)
    }
}

/// Parse the leaf of `set` and assemble the record fields.
///
/// # Errors
///
/// [`Error::MalformedCertificate`] if the leaf is not a PEM certificate or
/// its DER does not parse.
pub fn materialize(set: &IssuedCertificateSet) -> Result<MaterializedCertificate> {
    let certificate = set.certificate.trim().to_string();

    let (_, pem) = parse_x509_pem(certificate.as_bytes())
        .map_err(|e| Error::malformed_certificate(format!("PEM decode failed: {}", e)))?;
    if pem.label != "CERTIFICATE" {
        return Err(Error::malformed_certificate(format!(
            "expected a CERTIFICATE block, found {}",
            pem.label
        )));
    }
    let x509 = pem
        .parse_x509()
        .map_err(|e| Error::malformed_certificate(format!("DER parse failed: {}", e)))?;

    let serial_number = format_serial(x509.raw_serial());
    let timestamp = x509.validity().not_after.timestamp();
    let not_after = DateTime::<Utc>::from_timestamp(timestamp, 0).ok_or_else(|| {
        Error::malformed_certificate(format!("notAfter {} is out of range", timestamp))
    })?;

    let certificate_chain = std::iter::once(certificate.as_str())
        .chain(set.chain.iter().map(|c| c.trim()))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(MaterializedCertificate { certificate, certificate_chain, serial_number, not_after })
}

/// Render serial bytes as uppercase colon separated octets, leading zero
/// octets stripped.
pub fn format_serial(raw: &[u8]) -> String {
    let start = raw.iter().position(|b| *b != 0).unwrap_or(raw.len().saturating_sub(1));
    raw[start..].iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(":")
}

/// `1A:2B:03` -> `1a-2b-03`
pub fn storage_serial(serial: &str) -> String {
    serial.to_lowercase().replace(':', "-")
}

/// Split a PEM bundle into its certificate blocks, in order.
pub fn split_pem_bundle(bundle: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut rest = bundle;
    while let Some(start) = rest.find(PEM_BEGIN) {
        let tail = &rest[start..];
        let Some(end) = tail.find(PEM_END) else {
            break;
        };
        let end = end + PEM_END.len();
        blocks.push(tail[..end].to_string());
        rest = &tail[end..];
    }
    blocks
}
