//! # Key, CSR and certificate handling
//!
//! - [`policy`]: role key policy and key algorithm resolution
//! - [`names`]: common name / alternative name normalization
//! - [`csr`]: key generation and PKCS#10 request construction
//! - [`certificate`]: parsing of issued certificates

pub mod certificate;
pub mod csr;
pub mod names;
pub mod policy;

pub use certificate::{materialize, MaterializedCertificate};
pub use csr::{build_signing_request, KeyMaterial, SigningRequest};
pub use names::{parse_alt_names, SubjectNames};
pub use policy::{KeyCurve, KeySpec, RolePolicy};
