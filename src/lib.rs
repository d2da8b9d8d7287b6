//! # certwarden
//!
//! X.509 certificate enrollment against an external certificate authority.
//!
//! An enrollment request names a role and the subject names to certify. The
//! role's policy selects the key algorithm; a fresh key and PKCS#10 request
//! are generated, submitted to the CA and polled until the CA issues. The
//! issued certificate is parsed, stored under the keys the policy asks for,
//! and returned, optionally wrapped in a lease.
//!
//! ```text
//! CertificateIssuer::issue
//!   -> RoleStore          (role policy)
//!   -> pki::csr           (key + CSR)
//!   -> enroll::orchestrator -> CaClient (submit, retrieve until issued)
//!   -> pki::certificate   (serial, notAfter, chain)
//!   -> enroll::persistence -> Storage, LeaseManager
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use certwarden::config::AppConfig;
//! use certwarden::enroll::CertificateIssuer;
//!
//! #[tokio::main]
//! async fn main() -> certwarden::Result<()> {
//!     let config = AppConfig::load(None)?;
//!     let issuer = CertificateIssuer::from_config(&config)?;
//!     let names = vec!["www.example.com".to_string()];
//!     let response = issuer.issue("web", "example.com", &names).await?;
//!     println!("{}", response.data.serial_number);
//!     Ok(())
//! }
//! ```

pub mod ca;
pub mod cli;
pub mod config;
pub mod enroll;
pub mod errors;
pub mod lease;
pub mod observability;
pub mod pki;
pub mod roles;
pub mod secret;
pub mod storage;
pub mod vault;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use enroll::{CertificateIssuer, IssueResponse};
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
