//! Key and PKCS#10 request construction.
//!
//! [`build_signing_request`] generates a fresh key pair for the role's
//! [`KeySpec`], assembles a `CertificationRequest` carrying the common name
//! and DNS alternative names, signs it with the new key and returns both as
//! PEM. Nothing here touches the network.

use crate::errors::{Error, Result};
use crate::pki::names::SubjectNames;
use crate::pki::policy::{KeyCurve, KeySpec};
use crate::secret::SecretString;
use const_oid::db::{rfc4519, rfc5280, rfc5912};
use const_oid::ObjectIdentifier;
use der::asn1::{BitString, Ia5String, Null, OctetString, SetOfVec, Utf8StringRef};
use der::pem::LineEnding;
use der::{Any, Decode, Encode, EncodePem};
use rand::rngs::OsRng;
use signature::{SignatureEncoding, Signer};
use spki::{AlgorithmIdentifierOwned, EncodePublicKey, SubjectPublicKeyInfoOwned};
use std::fmt;
use tracing::debug;
use x509_cert::attr::{Attribute, AttributeTypeAndValue};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::SubjectAltName;
use x509_cert::ext::Extension;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::request::{CertReq, CertReqInfo, Version};

/// PKCS#9 extensionRequest attribute.
const EXTENSION_REQUEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.14");

/// A PEM encoded PKCS#10 request, bound to the key generated with it.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningRequest {
    pem: String,
    names: SubjectNames,
    key_spec: KeySpec,
}

impl SigningRequest {
    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub fn common_name(&self) -> &str {
        &self.names.common_name
    }

    pub fn names(&self) -> &SubjectNames {
        &self.names
    }

    pub fn key_spec(&self) -> KeySpec {
        self.key_spec
    }
}

impl fmt::Debug for SigningRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningRequest")
            .field("common_name", &self.names.common_name)
            .field("alt_names", &self.names.alt_names)
            .field("key_spec", &self.key_spec)
            .finish()
    }
}

/// Private key for one enrollment, tagged with its algorithm.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub spec: KeySpec,
    pub private_key_pem: SecretString,
}

/// Generate a key for `spec` and build a signed CSR for `names`.
pub fn build_signing_request(
    names: &SubjectNames,
    spec: KeySpec,
) -> Result<(SigningRequest, KeyMaterial)> {
    let key = GeneratedKey::generate(spec)?;

    let info = CertReqInfo {
        version: Version::V1,
        subject: subject_name(&names.common_name)?,
        public_key: key.subject_public_key_info()?,
        attributes: SetOfVec::try_from(vec![extension_request(&names.alt_names)?])
            .map_err(csr_error)?,
    };

    let tbs = info.to_der().map_err(csr_error)?;
    let (algorithm, signature) = key.sign(&tbs)?;

    let request = CertReq {
        info,
        algorithm,
        signature: BitString::from_bytes(&signature).map_err(csr_error)?,
    };
    let pem = request.to_pem(LineEnding::LF).map_err(csr_error)?;

    debug!(
        common_name = %names.common_name,
        alt_names = names.alt_names.len(),
        key = %spec,
        "Built certificate signing request"
    );

    let material = KeyMaterial { spec, private_key_pem: key.to_pem()? };
    Ok((SigningRequest { pem, names: names.clone(), key_spec: spec }, material))
}

fn subject_name(common_name: &str) -> Result<Name> {
    let value = Utf8StringRef::new(common_name).map_err(csr_error)?;
    let cn = AttributeTypeAndValue {
        oid: rfc4519::CN,
        value: Any::encode_from(&value).map_err(csr_error)?,
    };
    let rdn = RelativeDistinguishedName(SetOfVec::try_from(vec![cn]).map_err(csr_error)?);
    Ok(RdnSequence(vec![rdn]))
}

fn extension_request(alt_names: &[String]) -> Result<Attribute> {
    let general_names = alt_names
        .iter()
        .map(|name| {
            Ia5String::new(name)
                .map(GeneralName::DnsName)
                .map_err(|e| Error::invalid_request(format!("invalid DNS name '{}': {}", name, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let san = SubjectAltName(general_names).to_der().map_err(csr_error)?;
    let extensions = vec![Extension {
        extn_id: rfc5280::ID_CE_SUBJECT_ALT_NAME,
        critical: false,
        extn_value: OctetString::new(san).map_err(csr_error)?,
    }];

    let values = SetOfVec::try_from(vec![Any::encode_from(&extensions).map_err(csr_error)?])
        .map_err(csr_error)?;
    Ok(Attribute { oid: EXTENSION_REQUEST, values })
}

fn csr_error(err: der::Error) -> Error {
    Error::csr_encoding(err.to_string())
}

fn key_error<E: fmt::Display>(err: E) -> Error {
    Error::key_generation(err.to_string())
}

enum GeneratedKey {
    Rsa(Box<rsa::RsaPrivateKey>),
    P224(p224::SecretKey),
    P256(p256::SecretKey),
    P384(p384::SecretKey),
    P521(p521::SecretKey),
}

impl GeneratedKey {
    fn generate(spec: KeySpec) -> Result<Self> {
        let mut rng = OsRng;
        Ok(match spec {
            KeySpec::Rsa { bits } => {
                Self::Rsa(Box::new(rsa::RsaPrivateKey::new(&mut rng, bits).map_err(key_error)?))
            }
            KeySpec::Ec(KeyCurve::P224) => Self::P224(p224::SecretKey::random(&mut rng)),
            KeySpec::Ec(KeyCurve::P256) => Self::P256(p256::SecretKey::random(&mut rng)),
            KeySpec::Ec(KeyCurve::P384) => Self::P384(p384::SecretKey::random(&mut rng)),
            KeySpec::Ec(KeyCurve::P521) => Self::P521(p521::SecretKey::random(&mut rng)),
        })
    }

    fn subject_public_key_info(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let der = match self {
            Self::Rsa(key) => key.to_public_key().to_public_key_der(),
            Self::P224(key) => key.public_key().to_public_key_der(),
            Self::P256(key) => key.public_key().to_public_key_der(),
            Self::P384(key) => key.public_key().to_public_key_der(),
            Self::P521(key) => key.public_key().to_public_key_der(),
        }
        .map_err(key_error)?;
        SubjectPublicKeyInfoOwned::from_der(der.as_bytes()).map_err(csr_error)
    }

    /// Sign `message`, returning the signature algorithm and signature bytes.
    fn sign(&self, message: &[u8]) -> Result<(AlgorithmIdentifierOwned, Vec<u8>)> {
        let (oid, signature) = match self {
            Self::Rsa(key) => {
                let signer = rsa::pkcs1v15::SigningKey::<sha2::Sha256>::new((**key).clone());
                let signature = signer.try_sign(message).map_err(csr_error_from_signature)?;
                let algorithm = AlgorithmIdentifierOwned {
                    oid: rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                    parameters: Some(Any::encode_from(&Null).map_err(csr_error)?),
                };
                return Ok((algorithm, signature.to_vec()));
            }
            Self::P224(key) => {
                let signer = p224::ecdsa::SigningKey::from(key);
                let signature: p224::ecdsa::Signature =
                    signer.try_sign(message).map_err(csr_error_from_signature)?;
                (rfc5912::ECDSA_WITH_SHA_224, signature.to_der().as_bytes().to_vec())
            }
            Self::P256(key) => {
                let signer = p256::ecdsa::SigningKey::from(key);
                let signature: p256::ecdsa::Signature =
                    signer.try_sign(message).map_err(csr_error_from_signature)?;
                (rfc5912::ECDSA_WITH_SHA_256, signature.to_der().as_bytes().to_vec())
            }
            Self::P384(key) => {
                let signer = p384::ecdsa::SigningKey::from(key);
                let signature: p384::ecdsa::Signature =
                    signer.try_sign(message).map_err(csr_error_from_signature)?;
                (rfc5912::ECDSA_WITH_SHA_384, signature.to_der().as_bytes().to_vec())
            }
            Self::P521(key) => {
                let signer = p521::ecdsa::SigningKey::from_bytes(&key.to_bytes())
                    .map_err(csr_error_from_signature)?;
                let signature: p521::ecdsa::Signature =
                    signer.try_sign(message).map_err(csr_error_from_signature)?;
                (rfc5912::ECDSA_WITH_SHA_512, signature.to_der().as_bytes().to_vec())
            }
        };
        Ok((AlgorithmIdentifierOwned { oid, parameters: None }, signature))
    }

    /// PKCS#1 for RSA, SEC1 for EC.
    fn to_pem(&self) -> Result<SecretString> {
        let pem = match self {
            Self::Rsa(key) => {
                use rsa::pkcs1::EncodeRsaPrivateKey;
                key.to_pkcs1_pem(LineEnding::LF).map_err(key_error)?
            }
            Self::P224(key) => key.to_sec1_pem(LineEnding::LF).map_err(key_error)?,
            Self::P256(key) => key.to_sec1_pem(LineEnding::LF).map_err(key_error)?,
            Self::P384(key) => key.to_sec1_pem(LineEnding::LF).map_err(key_error)?,
            Self::P521(key) => key.to_sec1_pem(LineEnding::LF).map_err(key_error)?,
        };
        Ok(SecretString::new(pem.as_str()))
    }
}

fn csr_error_from_signature(err: signature::Error) -> Error {
    Error::csr_encoding(format!("signing failed: {}", err))
}
