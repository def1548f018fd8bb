//! # certmint - X.509 Certificate Issuance in Pure Rust
//!
//! certmint mints RSA key pairs and X.509 certificates, either self-signed or
//! signed by a certificate authority, and hands them back as PEM text. It is
//! built entirely on the RustCrypto libraries.
//!
//! ## Layers
//!
//! Issuance runs through three layers, each depending only on the one below:
//!
//! - [`signer`]: random serial numbers, DER certificate production and parsing.
//! - [`generator`]: key generation and the self-signed / CA-signed branching.
//! - [`operator`]: the PEM-facing entry points and the PEM codec.
//!
//! Every layer is a trait with one implementation that owns the layer below;
//! [`operator::default_operator`] wires up the RSA stack.
//!
//! ## Key Policy
//!
//! Keys are RSA, [`key::KEY_SIZE`] (4096) bits, signed with
//! sha256WithRSAEncryption. Private keys are exchanged as PKCS#1
//! `RSA PRIVATE KEY` PEM blocks and certificates as `CERTIFICATE` blocks.
//!
//! ## Quick Start
//!
//! ### Issuing a CA and a Server Certificate
//!
//! ```rust,no_run
//! use certmint::cert::params::{CertificateRequest, Validity};
//! use certmint::operator::{default_operator, pem_to_certificate, pem_to_private_key, PemOperator};
//!
//! # fn main() -> certmint::error::Result<()> {
//! let operator = default_operator();
//!
//! // Self-signed CA
//! let mut ca_request = CertificateRequest::certificate_authority(
//!     "Example CA",
//!     Validity::ca_default().with_clock_skew(),
//! );
//! let ca = operator.create_self_signed(Some(&mut ca_request))?;
//! println!("{}", ca.certificate_pem);
//!
//! // Server certificate signed by the CA
//! let mut server_request = CertificateRequest::server(
//!     "server.example.com",
//!     vec!["server.example.com".to_string()],
//!     Validity::server_default().with_clock_skew(),
//! );
//! let server = operator.create_with_authority(
//!     Some(&mut server_request),
//!     &ca.certificate,
//!     &ca.private_key,
//! )?;
//!
//! let server_cert = pem_to_certificate(&server.certificate_pem)?;
//! let server_key = pem_to_private_key(&server.private_key_pem)?;
//! assert!(server_cert.matches_private_key(&server_key));
//! # Ok(())
//! # }
//! ```
//!
//! ### Certifying an Existing Key
//!
//! ```rust,no_run
//! use certmint::cert::params::{CertificateRequest, Validity};
//! use certmint::operator::{default_operator, PemOperator};
//!
//! # fn main() -> certmint::error::Result<()> {
//! # let operator = default_operator();
//! # let ca = operator.create_self_signed(Some(&mut CertificateRequest::certificate_authority(
//! #     "Example CA",
//! #     Validity::ca_default(),
//! # )))?;
//! let key_pem = std::fs::read_to_string("server.key").expect("key file");
//! let mut request = CertificateRequest::server(
//!     "server.example.com",
//!     vec!["server.example.com".to_string()],
//!     Validity::server_default(),
//! );
//! let cert_pem = operator.create_certificate_from_pem_key(
//!     Some(&mut request),
//!     &key_pem,
//!     &ca.certificate,
//!     &ca.private_key,
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every layer returns the first error it hits unchanged. Only entropy and key
//! generation failures are worth repeating; see [`retry`] for a caller-side
//! wrapper.
//!
//! ```rust
//! use certmint::error::IssuanceError;
//! use certmint::operator::pem_to_certificate;
//!
//! match pem_to_certificate("not a pem block") {
//!     Ok(cert) => println!("Parsed {:?}", cert.common_name()),
//!     Err(IssuanceError::InvalidPem(msg)) => println!("Not a certificate PEM: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`cert`]: Certificate wrapper, request parameters and X.509 extensions
//! - [`tbs_certificate`]: To-be-signed certificate assembly
//! - [`issuer`]: The identity a certificate is chained to
//! - [`key`]: Key policy and signing primitives
//! - [`pem_utils`]: Label-aware PEM framing
//! - [`policy`]: Validity and retry constants
//! - [`error`]: Error taxonomy

pub mod cert;
pub mod error;
pub mod generator;
pub mod issuer;
pub mod key;
pub mod operator;
pub mod pem_utils;
pub mod policy;
pub mod retry;
pub mod signer;
pub mod tbs_certificate;
