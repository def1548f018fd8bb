use x509_cert::name::Name;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::params::CertificateRequest;
use crate::cert::Certificate;
use crate::error::Result;
use crate::key;

/// The identity an issued certificate is chained to: its parent.
///
/// A CA certificate is the parent of everything it signs. A request being
/// self-signed is its own parent.
pub trait IssuerIdentity {
    /// Returns the distinguished name that becomes the issuer of the certificate.
    fn issuer_name(&self) -> Result<Name>;

    /// Returns the key identifier for the authority key identifier extension,
    /// or `None` when the certificate is self-signed.
    fn authority_key_identifier(&self) -> Result<Option<Vec<u8>>>;

    /// Returns the parent's public key, when it already has one, so the signer
    /// can check that it holds the matching private key.
    fn issuer_public_key_info(&self) -> Option<&SubjectPublicKeyInfoOwned>;
}

impl IssuerIdentity for CertificateRequest {
    fn issuer_name(&self) -> Result<Name> {
        self.subject.to_x509_name()
    }

    fn authority_key_identifier(&self) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn issuer_public_key_info(&self) -> Option<&SubjectPublicKeyInfoOwned> {
        None
    }
}

impl IssuerIdentity for Certificate {
    fn issuer_name(&self) -> Result<Name> {
        // The name of the issuer is the subject of the certificate
        Ok(self.subject().clone())
    }

    fn authority_key_identifier(&self) -> Result<Option<Vec<u8>>> {
        let key_identifier = self
            .subject_key_identifier()?
            .unwrap_or_else(|| key::key_identifier(self.subject_public_key_info()));
        Ok(Some(key_identifier))
    }

    fn issuer_public_key_info(&self) -> Option<&SubjectPublicKeyInfoOwned> {
        Some(self.subject_public_key_info())
    }
}
