//! The PEM-facing entry points of the issuance pipeline.
//!
//! [`PemOperator`] sequences key generation and signing and hands the results
//! back as PEM text. The codec functions convert between the in-memory types
//! and PEM in both directions and can be used on their own.

use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use tracing::debug;

use crate::cert::Certificate;
use crate::cert::params::CertificateRequest;
use crate::error::{IssuanceError, Result};
use crate::generator::{KeyPairGenerator, RsaKeyPairGenerator};
use crate::key::PrivateKey;
use crate::pem_utils::{self, CERTIFICATE_LABEL, RSA_PRIVATE_KEY_LABEL};
use crate::signer::RsaCertificateSigner;

/// Result of a self-signed issuance: the objects and their PEM encodings.
#[derive(Debug, Clone)]
pub struct SelfSignedCertificate {
    pub certificate: Certificate,
    pub certificate_pem: String,
    pub private_key: PrivateKey,
    pub private_key_pem: String,
}

/// A certificate and its private key, both PEM encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemKeyPair {
    pub certificate_pem: String,
    pub private_key_pem: String,
}

/// Issues certificates and returns them PEM encoded.
pub trait PemOperator: Send + Sync {
    /// Generates a key pair and a self-signed certificate for `request`.
    fn create_self_signed(
        &self,
        request: Option<&mut CertificateRequest>,
    ) -> Result<SelfSignedCertificate>;

    /// Generates a key pair and a certificate for `request` signed by the authority.
    fn create_with_authority(
        &self,
        request: Option<&mut CertificateRequest>,
        ca_certificate: &Certificate,
        ca_private_key: &PrivateKey,
    ) -> Result<PemKeyPair>;

    /// Certifies the PEM-encoded key `subject_key_pem` under the authority and
    /// returns the certificate PEM.
    fn create_certificate_from_pem_key(
        &self,
        request: Option<&mut CertificateRequest>,
        subject_key_pem: &str,
        ca_certificate: &Certificate,
        ca_private_key: &PrivateKey,
    ) -> Result<String>;
}

/// [`PemOperator`] over any [`KeyPairGenerator`].
#[derive(Debug, Clone, Default)]
pub struct PemCertificateOperator<G> {
    generator: G,
}

impl<G: KeyPairGenerator> PemCertificateOperator<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }
}

/// The operator wired to the RSA generator and signer.
pub fn default_operator() -> PemCertificateOperator<RsaKeyPairGenerator<RsaCertificateSigner>> {
    PemCertificateOperator::new(RsaKeyPairGenerator::new(RsaCertificateSigner::new()))
}

impl<G: KeyPairGenerator> PemOperator for PemCertificateOperator<G> {
    fn create_self_signed(
        &self,
        request: Option<&mut CertificateRequest>,
    ) -> Result<SelfSignedCertificate> {
        let issued = self.generator.issue_self_signed(request)?;

        let certificate_pem = certificate_to_pem(&issued.cert)?;
        let private_key_pem = private_key_to_pem(&issued.key)?;

        debug!(
            serial = ?issued.cert.serial_number(),
            "encoded self-signed certificate"
        );
        Ok(SelfSignedCertificate {
            certificate: issued.cert,
            certificate_pem,
            private_key: issued.key,
            private_key_pem,
        })
    }

    fn create_with_authority(
        &self,
        request: Option<&mut CertificateRequest>,
        ca_certificate: &Certificate,
        ca_private_key: &PrivateKey,
    ) -> Result<PemKeyPair> {
        let issued = self
            .generator
            .issue_with_authority(request, ca_certificate, ca_private_key)?;

        let pair = PemKeyPair {
            certificate_pem: certificate_to_pem(&issued.cert)?,
            private_key_pem: private_key_to_pem(&issued.key)?,
        };
        debug!(serial = ?issued.cert.serial_number(), "encoded CA-signed certificate");
        Ok(pair)
    }

    fn create_certificate_from_pem_key(
        &self,
        request: Option<&mut CertificateRequest>,
        subject_key_pem: &str,
        ca_certificate: &Certificate,
        ca_private_key: &PrivateKey,
    ) -> Result<String> {
        let subject_key = pem_to_private_key(subject_key_pem)?;
        let cert = self.generator.issue_with_existing_key(
            request,
            Some(&subject_key),
            ca_certificate,
            ca_private_key,
        )?;
        certificate_to_pem(&cert)
    }
}

/// Encode a certificate as a `CERTIFICATE` PEM block.
pub fn certificate_to_pem(certificate: &Certificate) -> Result<String> {
    Ok(pem_utils::der_to_pem(&certificate.to_der()?, CERTIFICATE_LABEL))
}

/// Decode the first PEM block of `text` as a certificate.
///
/// Text without a `CERTIFICATE` block fails with [`IssuanceError::InvalidPem`];
/// a block whose body is not a certificate fails with
/// [`IssuanceError::MalformedCertificate`].
pub fn pem_to_certificate(text: &str) -> Result<Certificate> {
    let der = pem_utils::pem_to_der(text, CERTIFICATE_LABEL)?;
    Certificate::from_der(&der)
}

/// Encode a private key as an `RSA PRIVATE KEY` (PKCS#1) PEM block.
pub fn private_key_to_pem(private_key: &PrivateKey) -> Result<String> {
    let der = private_key
        .to_pkcs1_der()
        .map_err(|e| IssuanceError::PemEncoding(e.to_string()))?;
    Ok(pem_utils::der_to_pem(der.as_bytes(), RSA_PRIVATE_KEY_LABEL))
}

/// Decode the first PEM block of `text` as a PKCS#1 RSA private key.
pub fn pem_to_private_key(text: &str) -> Result<PrivateKey> {
    let der = pem_utils::pem_to_der(text, RSA_PRIVATE_KEY_LABEL)?;
    PrivateKey::from_pkcs1_der(&der)
        .map_err(|e| IssuanceError::InvalidPem(format!("not a PKCS#1 RSA private key: {e}")))
}
