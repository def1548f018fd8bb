pub mod extensions;
pub mod params;

use der::{AnyRef, Decode, Encode};
use extensions::{BasicConstraints, SubjectKeyIdentifier, ToAndFromX509Extension};
use params::{DistinguishedName, Validity};
use pkcs8::DecodePublicKey;
use x509_cert::name::Name;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::error::{IssuanceError, Result};
use crate::key::{self, PrivateKey, PublicKey};
use crate::tbs_certificate;

/// Represents the supported signature algorithms for certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption (PKCS#1 v1.5).
    Sha256WithRSA,
}

impl From<SignatureAlgorithm> for AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA algorithm identifiers carry an explicit NULL parameter (RFC 4055).
    fn from(value: SignatureAlgorithm) -> Self {
        match value {
            SignatureAlgorithm::Sha256WithRSA => AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                parameters: Some(AnyRef::NULL.into()),
            },
        }
    }
}

/// Represents a signed X.509 certificate.
///
/// Certificates are immutable once issued; two values compare equal when
/// their DER encodings do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: x509_cert::Certificate,
}

impl Certificate {
    /// Parses a DER-encoded certificate.
    ///
    /// Trailing bytes after the certificate are rejected.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        x509_cert::Certificate::from_der(der)
            .map(|inner| Self { inner })
            .map_err(|e| IssuanceError::MalformedCertificate(e.to_string()))
    }

    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| IssuanceError::PemEncoding(e.to_string()))
    }

    /// The serial number, or `None` when it does not fit in 128 bits.
    pub fn serial_number(&self) -> Option<u128> {
        tbs_certificate::serial_number_from_x509(&self.inner.tbs_certificate.serial_number)
    }

    pub fn subject(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    pub fn subject_dn(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(self.subject())
    }

    /// The subject common name, if the subject carries one.
    pub fn common_name(&self) -> Option<String> {
        Some(self.subject_dn().common_name).filter(|cn| !cn.is_empty())
    }

    /// The validity window, truncated to whole seconds.
    pub fn validity(&self) -> Validity {
        let validity = &self.inner.tbs_certificate.validity;
        Validity {
            not_before: tbs_certificate::from_x509_time(&validity.not_before),
            not_after: tbs_certificate::from_x509_time(&validity.not_after),
        }
    }

    pub fn subject_public_key_info(&self) -> &SubjectPublicKeyInfoOwned {
        &self.inner.tbs_certificate.subject_public_key_info
    }

    /// The public key embedded in the certificate.
    pub fn public_key(&self) -> Result<PublicKey> {
        let spki_der = self
            .subject_public_key_info()
            .to_der()
            .map_err(|e| IssuanceError::MalformedCertificate(e.to_string()))?;
        PublicKey::from_public_key_der(&spki_der)
            .map_err(|e| IssuanceError::MalformedCertificate(format!("not an RSA key: {e}")))
    }

    /// Whether `private_key` is the private half of the embedded public key.
    pub fn matches_private_key(&self, private_key: &PrivateKey) -> bool {
        self.public_key()
            .is_ok_and(|public| public == private_key.to_public_key())
    }

    /// Decodes the extension of type `E`, if present.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == E::OID)
            .map(|ext| E::from_x509_extension_value(ext.extn_value.as_bytes()))
            .transpose()
    }

    pub fn is_ca(&self) -> bool {
        matches!(
            self.extension::<BasicConstraints>(),
            Ok(Some(BasicConstraints { is_ca: true, .. }))
        )
    }

    /// The subject key identifier, if the certificate carries one.
    ///
    /// A present but undecodable extension is a
    /// [`IssuanceError::MalformedCertificate`].
    pub fn subject_key_identifier(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.extension::<SubjectKeyIdentifier>()?.map(|ski| ski.0))
    }

    /// Checks the certificate signature against `issuer_key`.
    pub fn is_signed_by(&self, issuer_key: &PublicKey) -> bool {
        let expected: AlgorithmIdentifierOwned = SignatureAlgorithm::Sha256WithRSA.into();
        if self.inner.signature_algorithm.oid != expected.oid {
            return false;
        }
        let Ok(tbs_der) = self.inner.tbs_certificate.to_der() else {
            return false;
        };
        key::verify_data(issuer_key, &tbs_der, self.inner.signature.raw_bytes())
    }
}

/// A certificate together with the private key generated for it.
#[derive(Debug, Clone)]
pub struct CertificateWithPrivateKey {
    pub cert: Certificate,
    pub key: PrivateKey,
}
