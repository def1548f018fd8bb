//! Key-pair generation and the choice between self-signed and CA-signed issuance.

use tracing::debug;

use crate::cert::params::CertificateRequest;
use crate::cert::{Certificate, CertificateWithPrivateKey};
use crate::error::{IssuanceError, Result};
use crate::key::{self, PrivateKey};
use crate::signer::CertificateSigner;

/// Issues certificates, generating the subject key where needed.
///
/// A `None` request or key is rejected with [`IssuanceError::InvalidRequest`],
/// as is a request that names nothing (see [`CertificateRequest::is_empty`]).
/// On success the request's `serial_number` holds the serial of the new
/// certificate.
pub trait KeyPairGenerator: Send + Sync {
    /// Generates a key and a certificate signed by that same key.
    fn issue_self_signed(
        &self,
        request: Option<&mut CertificateRequest>,
    ) -> Result<CertificateWithPrivateKey>;

    /// Generates a key and a certificate for it signed by the given authority.
    fn issue_with_authority(
        &self,
        request: Option<&mut CertificateRequest>,
        ca_certificate: &Certificate,
        ca_private_key: &PrivateKey,
    ) -> Result<CertificateWithPrivateKey>;

    /// Certifies a key the caller already holds, signed by the given authority.
    fn issue_with_existing_key(
        &self,
        request: Option<&mut CertificateRequest>,
        subject_private_key: Option<&PrivateKey>,
        ca_certificate: &Certificate,
        ca_private_key: &PrivateKey,
    ) -> Result<Certificate>;
}

/// [`KeyPairGenerator`] minting [`key::KEY_SIZE`]-bit RSA keys.
#[derive(Debug, Clone, Default)]
pub struct RsaKeyPairGenerator<S> {
    signer: S,
}

impl<S: CertificateSigner> RsaKeyPairGenerator<S> {
    pub fn new(signer: S) -> Self {
        Self { signer }
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }
}

fn require_request(request: Option<&mut CertificateRequest>) -> Result<&mut CertificateRequest> {
    match request {
        None => Err(IssuanceError::InvalidRequest(
            "certificate signing request is absent".to_string(),
        )),
        Some(request) if request.is_empty() => Err(IssuanceError::InvalidRequest(
            "certificate signing request names no subject".to_string(),
        )),
        Some(request) => Ok(request),
    }
}

impl<S: CertificateSigner> KeyPairGenerator for RsaKeyPairGenerator<S> {
    fn issue_self_signed(
        &self,
        request: Option<&mut CertificateRequest>,
    ) -> Result<CertificateWithPrivateKey> {
        let request = require_request(request)?;

        let key = key::generate_private_key()?;
        let cert = self.signer.create_certificate_with_public_key(
            request,
            &key.to_public_key(),
            None,
            &key,
        )?;

        debug!(subject = %request.subject.common_name, "issued self-signed certificate");
        Ok(CertificateWithPrivateKey { cert, key })
    }

    fn issue_with_authority(
        &self,
        request: Option<&mut CertificateRequest>,
        ca_certificate: &Certificate,
        ca_private_key: &PrivateKey,
    ) -> Result<CertificateWithPrivateKey> {
        let request = require_request(request)?;

        let key = key::generate_private_key()?;
        let cert = self.signer.create_certificate_with_public_key(
            request,
            &key.to_public_key(),
            Some(ca_certificate),
            ca_private_key,
        )?;

        debug!(
            subject = %request.subject.common_name,
            issuer = %ca_certificate.subject_dn().common_name,
            "issued certificate with fresh key"
        );
        Ok(CertificateWithPrivateKey { cert, key })
    }

    fn issue_with_existing_key(
        &self,
        request: Option<&mut CertificateRequest>,
        subject_private_key: Option<&PrivateKey>,
        ca_certificate: &Certificate,
        ca_private_key: &PrivateKey,
    ) -> Result<Certificate> {
        let subject_private_key = subject_private_key
            .ok_or_else(|| IssuanceError::InvalidRequest("private key is absent".to_string()))?;
        let request = require_request(request)?;

        let cert = self.signer.create_certificate_with_public_key(
            request,
            &subject_private_key.to_public_key(),
            Some(ca_certificate),
            ca_private_key,
        )?;

        debug!(
            subject = %request.subject.common_name,
            issuer = %ca_certificate.subject_dn().common_name,
            "issued certificate for existing key"
        );
        Ok(cert)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cert::params::{DistinguishedName, Validity};
    use crate::issuer::IssuerIdentity;
    use crate::key::PublicKey;
    use crate::signer::RsaCertificateSigner;

    /// Signer that fails at a chosen step and counts how often it was asked to sign.
    #[derive(Default)]
    struct FailingSigner {
        fail_serial: bool,
        sign_calls: AtomicUsize,
    }

    impl CertificateSigner for FailingSigner {
        fn generate_serial_number(&self) -> Result<u128> {
            if self.fail_serial {
                Err(IssuanceError::RandomSource("entropy pool drained".to_string()))
            } else {
                Ok(42)
            }
        }

        fn sign_certificate(
            &self,
            _template: &CertificateRequest,
            _parent: &dyn IssuerIdentity,
            _subject_public_key: &PublicKey,
            _signer_private_key: &PrivateKey,
        ) -> Result<Vec<u8>> {
            self.sign_calls.fetch_add(1, Ordering::SeqCst);
            Err(IssuanceError::Signing("key size mismatch".to_string()))
        }

        fn parse_certificate(&self, _der: &[u8]) -> Result<Certificate> {
            unreachable!("signing always fails")
        }
    }

    fn request() -> CertificateRequest {
        CertificateRequest::builder()
            .subject(DistinguishedName::named("gen.local"))
            .validity(Validity::for_days(1))
            .build()
    }

    #[test]
    fn test_absent_request_is_rejected_before_key_generation() {
        let generator = RsaKeyPairGenerator::new(FailingSigner::default());

        let err = generator.issue_self_signed(None).unwrap_err();
        assert!(matches!(err, IssuanceError::InvalidRequest(_)));
        assert_eq!(generator.signer().sign_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_request_counts_as_absent() {
        let generator = RsaKeyPairGenerator::new(FailingSigner::default());
        let mut empty = CertificateRequest::builder()
            .subject(DistinguishedName::default())
            .validity(Validity::for_days(1))
            .build();

        let err = generator.issue_self_signed(Some(&mut empty)).unwrap_err();
        assert!(matches!(err, IssuanceError::InvalidRequest(_)));
    }

    #[test]
    fn test_existing_key_path_requires_key_and_request() {
        let generator = RsaKeyPairGenerator::new(RsaCertificateSigner);
        let ca_key = rsa::RsaPrivateKey::new(&mut rand_core::OsRng, 2048).unwrap();
        let mut ca_request = request();
        let ca = RsaCertificateSigner
            .create_certificate_with_public_key(
                &mut ca_request,
                &ca_key.to_public_key(),
                None,
                &ca_key,
            )
            .unwrap();

        let mut leaf = request();
        let err = generator
            .issue_with_existing_key(Some(&mut leaf), None, &ca, &ca_key)
            .unwrap_err();
        assert!(matches!(err, IssuanceError::InvalidRequest(_)));
        assert!(leaf.serial_number.is_none());

        let err = generator
            .issue_with_existing_key(None, Some(&ca_key), &ca, &ca_key)
            .unwrap_err();
        assert!(matches!(err, IssuanceError::InvalidRequest(_)));
    }

    #[test]
    fn test_existing_key_is_certified_not_replaced() {
        let generator = RsaKeyPairGenerator::new(RsaCertificateSigner);
        let ca_key = rsa::RsaPrivateKey::new(&mut rand_core::OsRng, 2048).unwrap();
        let mut ca_request = request();
        let ca = RsaCertificateSigner
            .create_certificate_with_public_key(
                &mut ca_request,
                &ca_key.to_public_key(),
                None,
                &ca_key,
            )
            .unwrap();

        let subject_key = rsa::RsaPrivateKey::new(&mut rand_core::OsRng, 2048).unwrap();
        let mut leaf = request();
        let cert = generator
            .issue_with_existing_key(Some(&mut leaf), Some(&subject_key), &ca, &ca_key)
            .unwrap();

        assert!(cert.matches_private_key(&subject_key));
        assert!(cert.is_signed_by(&ca_key.to_public_key()));
        assert_eq!(cert.serial_number(), leaf.serial_number);
    }

    #[test]
    fn test_signer_errors_propagate_unchanged() {
        let generator = RsaKeyPairGenerator::new(FailingSigner::default());
        let err = generator.issue_self_signed(Some(&mut request())).unwrap_err();
        assert_eq!(err, IssuanceError::Signing("key size mismatch".to_string()));
        assert_eq!(generator.signer().sign_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_serial_failure_propagates_as_random_source() {
        let generator = RsaKeyPairGenerator::new(FailingSigner {
            fail_serial: true,
            ..Default::default()
        });
        let err = generator.issue_self_signed(Some(&mut request())).unwrap_err();
        assert!(matches!(err, IssuanceError::RandomSource(_)));
        assert!(err.is_retryable());
        assert_eq!(generator.signer().sign_calls.load(Ordering::SeqCst), 0);
    }
}
