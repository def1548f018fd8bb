//! use certmint::error::IssuanceError;

use thiserror::Error;

/// Represents errors that can occur while issuing certificates.
///
/// Every layer of the pipeline returns the first error it hits unchanged, so the
/// variant tells the caller which layer failed and whether trying again can help.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IssuanceError {
    /// A required input (request or key) is absent or empty.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The operating system entropy source is unavailable.
    #[error("Random source error: {0}")]
    RandomSource(String),

    /// Generating a fresh key pair failed.
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    /// The sign operation rejected its inputs.
    #[error("Signing error: {0}")]
    Signing(String),

    /// DER bytes could not be parsed as an X.509 certificate.
    #[error("Malformed certificate: {0}")]
    MalformedCertificate(String),

    /// Text could not be decoded as a PEM block of the expected kind.
    #[error("Invalid PEM: {0}")]
    InvalidPem(String),

    /// An object could not be encoded to PEM.
    #[error("Failed to encode PEM: {0}")]
    PemEncoding(String),
}

impl IssuanceError {
    /// Whether the failure is transient and the operation may succeed when
    /// repeated with the same inputs.
    pub fn is_retryable(&self) -> bool {
        match self {
            IssuanceError::RandomSource(_) | IssuanceError::KeyGeneration(_) => true,

            IssuanceError::InvalidRequest(_)
            | IssuanceError::Signing(_)
            | IssuanceError::MalformedCertificate(_)
            | IssuanceError::InvalidPem(_)
            | IssuanceError::PemEncoding(_) => false,
        }
    }
}

impl From<rand_core::Error> for IssuanceError {
    fn from(err: rand_core::Error) -> Self {
        IssuanceError::RandomSource(err.to_string())
    }
}

impl From<pem::PemError> for IssuanceError {
    fn from(err: pem::PemError) -> Self {
        IssuanceError::InvalidPem(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IssuanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_entropy_and_key_generation_are_retryable() {
        assert!(IssuanceError::RandomSource("empty pool".into()).is_retryable());
        assert!(IssuanceError::KeyGeneration("prime search".into()).is_retryable());

        assert!(!IssuanceError::InvalidRequest("nil".into()).is_retryable());
        assert!(!IssuanceError::Signing("bad key".into()).is_retryable());
        assert!(!IssuanceError::MalformedCertificate("asn1".into()).is_retryable());
        assert!(!IssuanceError::InvalidPem("label".into()).is_retryable());
        assert!(!IssuanceError::PemEncoding("der".into()).is_retryable());
    }

    #[test]
    fn test_pem_error_maps_to_invalid_pem() {
        let err: IssuanceError = pem::parse("not a pem block").unwrap_err().into();
        assert!(matches!(err, IssuanceError::InvalidPem(_)));
    }
}
