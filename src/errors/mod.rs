//! # Error Handling
//!
//! Error taxonomy for certificate enrollment. Every failure that reaches a
//! caller is one of these variants; only CA-reported `Pending`/`Timeout`
//! conditions are retried, and those never surface here unless a polling
//! bound has been configured.

/// Custom result type for certwarden operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for certificate enrollment
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Bad or missing caller input
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The named role has no policy
    #[error("Unknown role: {role}")]
    RoleNotFound { role: String },

    /// Role asks for a key type other than rsa/ec
    #[error("Can't determine key algorithm {key_type}")]
    UnsupportedKeyAlgorithm { key_type: String },

    /// Role asks for an EC curve outside P224/P256/P384/P521
    #[error("Unsupported key curve {curve:?}, expected one of P224, P256, P384, P521")]
    UnsupportedKeyCurve { curve: String },

    /// Key generation or key encoding failed
    #[error("Key generation failed: {message}")]
    KeyGeneration { message: String },

    /// The PKCS#10 request could not be assembled or signed
    #[error("Failed to build certificate signing request: {message}")]
    CsrEncoding { message: String },

    /// The CA rejected or failed the submission
    #[error("Certificate request submission failed: {message}")]
    CaSubmission { message: String },

    /// The CA reported a non-retryable error while retrieving
    #[error("Certificate retrieval failed for pickup id {pickup_id}: {message}")]
    CaRetrieval { pickup_id: String, message: String },

    /// A configured polling bound was reached while the CA still reported pending
    #[error("Certificate {pickup_id} still pending after {attempts} polls")]
    PollingExhausted { pickup_id: String, attempts: u32 },

    /// The returned certificate could not be decoded or parsed
    #[error("Malformed certificate: {message}")]
    MalformedCertificate { message: String },

    /// The certificate was issued but could not be written to storage
    #[error(
        "Certificate {serial_number} was issued but not recorded: write to '{key}' failed: {message}"
    )]
    StorageWrite { key: String, serial_number: String, message: String },

    /// The certificate was issued and stored but its lease could not be created
    #[error("Certificate {serial_number} was issued and stored but no lease was created: {message}")]
    LeaseBinding { serial_number: String, message: String },

    /// Storage read/list failures outside of the post-issuance write path
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create an invalid request error
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest { message: message.into() }
    }

    /// Create a role not found error
    pub fn role_not_found<S: Into<String>>(role: S) -> Self {
        Self::RoleNotFound { role: role.into() }
    }

    /// Create an unsupported key algorithm error
    pub fn unsupported_key_algorithm<S: Into<String>>(key_type: S) -> Self {
        Self::UnsupportedKeyAlgorithm { key_type: key_type.into() }
    }

    /// Create an unsupported key curve error
    pub fn unsupported_key_curve<S: Into<String>>(curve: S) -> Self {
        Self::UnsupportedKeyCurve { curve: curve.into() }
    }

    /// Create a key generation error
    pub fn key_generation<S: Into<String>>(message: S) -> Self {
        Self::KeyGeneration { message: message.into() }
    }

    /// Create a CSR encoding error
    pub fn csr_encoding<S: Into<String>>(message: S) -> Self {
        Self::CsrEncoding { message: message.into() }
    }

    /// Create a CA submission error
    pub fn ca_submission<S: Into<String>>(message: S) -> Self {
        Self::CaSubmission { message: message.into() }
    }

    /// Create a CA retrieval error
    pub fn ca_retrieval<P: Into<String>, S: Into<String>>(pickup_id: P, message: S) -> Self {
        Self::CaRetrieval { pickup_id: pickup_id.into(), message: message.into() }
    }

    /// Create a malformed certificate error
    pub fn malformed_certificate<S: Into<String>>(message: S) -> Self {
        Self::MalformedCertificate { message: message.into() }
    }

    /// Create a storage write error for an already-issued certificate
    pub fn storage_write<K: Into<String>, N: Into<String>, S: Into<String>>(
        key: K,
        serial_number: N,
        message: S,
    ) -> Self {
        Self::StorageWrite {
            key: key.into(),
            serial_number: serial_number.into(),
            message: message.into(),
        }
    }

    /// Create a lease binding error
    pub fn lease_binding<N: Into<String>, S: Into<String>>(serial_number: N, message: S) -> Self {
        Self::LeaseBinding { serial_number: serial_number.into(), message: message.into() }
    }

    /// Create a storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage { message: message.into() }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Stable short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::RoleNotFound { .. } => "role_not_found",
            Self::UnsupportedKeyAlgorithm { .. } => "unsupported_key_algorithm",
            Self::UnsupportedKeyCurve { .. } => "unsupported_key_curve",
            Self::KeyGeneration { .. } => "key_generation",
            Self::CsrEncoding { .. } => "csr_encoding",
            Self::CaSubmission { .. } => "ca_submission",
            Self::CaRetrieval { .. } => "ca_retrieval",
            Self::PollingExhausted { .. } => "polling_exhausted",
            Self::MalformedCertificate { .. } => "malformed_certificate",
            Self::StorageWrite { .. } => "storage_write",
            Self::LeaseBinding { .. } => "lease_binding",
            Self::Storage { .. } => "storage",
            Self::Config { .. } => "config",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
            Self::Internal { .. } => "internal",
        }
    }

    /// True when the CA has already issued the certificate this error refers to.
    pub fn is_issued(&self) -> bool {
        matches!(self, Self::StorageWrite { .. } | Self::LeaseBinding { .. })
    }

    /// True when an issued certificate is missing from storage.
    pub fn is_issued_but_unrecorded(&self) -> bool {
        matches!(self, Self::StorageWrite { .. })
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Display walks nested structs and prefixes each field with its path.
        Self::config(format!("Validation failed: {}", errors))
    }
}
