//! Role key policy.
//!
//! A [`RolePolicy`] is owned by the role store and read-only to the
//! enrollment pipeline. Key type and curve are kept as the raw strings the
//! role was configured with; [`RolePolicy::key_spec`] turns them into a typed
//! [`KeySpec`] and is the single place where unsupported values are rejected.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// RSA modulus size used when a role leaves `key_bits` at zero.
pub const DEFAULT_RSA_BITS: usize = 2048;

/// Smallest RSA modulus accepted for new keys.
pub const MIN_RSA_BITS: usize = 1024;

/// Largest RSA modulus accepted for new keys.
pub const MAX_RSA_BITS: usize = 8192;

/// Per-role issuance policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePolicy {
    /// "rsa" or "ec"
    #[serde(default = "default_key_type")]
    pub key_type: String,

    /// RSA modulus size in bits (0 = default)
    #[serde(default)]
    pub key_bits: usize,

    /// Named curve for "ec" keys: P224, P256, P384 or P521
    #[serde(default)]
    pub key_curve: String,

    /// Write the record under `certs/<common name>`
    #[serde(default, rename = "store_by_cn")]
    pub store_by_common_name: bool,

    /// Write the record under `certs/<normalized serial>`
    #[serde(default)]
    pub store_by_serial: bool,

    /// Include the private key in the stored record
    #[serde(default, rename = "store_pkey")]
    pub store_private_key: bool,

    /// Wrap the response in a lease whose TTL runs until the certificate expires
    #[serde(default)]
    pub generate_lease: bool,
}

fn default_key_type() -> String {
    "rsa".to_string()
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self {
            key_type: default_key_type(),
            key_bits: DEFAULT_RSA_BITS,
            key_curve: String::new(),
            store_by_common_name: false,
            store_by_serial: false,
            store_private_key: false,
            generate_lease: false,
        }
    }
}

impl RolePolicy {
    /// Resolve the configured key algorithm into a [`KeySpec`].
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedKeyAlgorithm`] for key types other than rsa/ec
    /// - [`Error::UnsupportedKeyCurve`] for ec roles whose curve is not one of the
    ///   four named curves (including an empty curve)
    /// - [`Error::KeyGeneration`] for RSA sizes outside the accepted range
    pub fn key_spec(&self) -> Result<KeySpec> {
        match self.key_type.as_str() {
            "rsa" => {
                let bits = if self.key_bits == 0 { DEFAULT_RSA_BITS } else { self.key_bits };
                if !(MIN_RSA_BITS..=MAX_RSA_BITS).contains(&bits) {
                    return Err(Error::key_generation(format!(
                        "RSA key size {} is outside the supported range {}..={}",
                        bits, MIN_RSA_BITS, MAX_RSA_BITS
                    )));
                }
                Ok(KeySpec::Rsa { bits })
            }
            "ec" => self.key_curve.parse().map(KeySpec::Ec),
            other => Err(Error::unsupported_key_algorithm(other)),
        }
    }
}

/// NIST curves accepted for ECDSA keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCurve {
    P224,
    P256,
    P384,
    P521,
}

impl KeyCurve {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P224 => "P224",
            Self::P256 => "P256",
            Self::P384 => "P384",
            Self::P521 => "P521",
        }
    }
}

impl fmt::Display for KeyCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for KeyCurve {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "P224" => Ok(Self::P224),
            "P256" => Ok(Self::P256),
            "P384" => Ok(Self::P384),
            "P521" => Ok(Self::P521),
            other => Err(Error::unsupported_key_curve(other)),
        }
    }
}

/// Concrete key algorithm for one enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySpec {
    Rsa { bits: usize },
    Ec(KeyCurve),
}

impl fmt::Display for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsa { bits } => write!(f, "rsa/{}", bits),
            Self::Ec(curve) => write!(f, "ec/{}", curve),
        }
    }
}
