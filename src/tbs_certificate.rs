use std::time::SystemTime;

use der::asn1::{GeneralizedTime, OctetString, UtcTime};
use time::{OffsetDateTime, UtcOffset};
use x509_cert::Version;
use x509_cert::certificate::TbsCertificate as X509TbsCertificate;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::Time;

use crate::cert::SignatureAlgorithm;
use crate::cert::params::{ExtensionParam, Validity};
use crate::error::{IssuanceError, Result};

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature_algorithm` - The algorithm used to sign the certificate.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `validity` - The certificate's validity period.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key_info` - The public key of the certificate subject.
/// * `extensions` - X.509 extensions for the certificate.
pub struct TbsCertificate {
    pub serial_number: u128,
    pub signature_algorithm: SignatureAlgorithm,
    pub issuer: Name,
    pub validity: Validity,
    pub subject: Name,
    pub subject_public_key_info: SubjectPublicKeyInfoOwned,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into its `x509_cert` form for DER encoding.
    ///
    /// Fails with [`IssuanceError::Signing`] when a field cannot be represented,
    /// e.g. a validity bound before 1970.
    pub fn to_x509(&self) -> Result<X509TbsCertificate> {
        let extensions = self
            .extensions
            .iter()
            .map(|ext| -> Result<x509_cert::ext::Extension> {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone()).map_err(signing_error)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.validity.not_before)?,
            not_after: to_x509_time(self.validity.not_after)?,
        };

        Ok(X509TbsCertificate {
            version: Version::V3,
            serial_number: serial_number_to_x509(self.serial_number)?,
            signature: self.signature_algorithm.into(),
            issuer: self.issuer.clone(),
            validity,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key_info.clone(),
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: (!extensions.is_empty()).then_some(extensions),
        })
    }
}

fn signing_error(err: der::Error) -> IssuanceError {
    IssuanceError::Signing(err.to_string())
}

/// Encodes a serial as a minimal positive DER integer.
pub(crate) fn serial_number_to_x509(serial: u128) -> Result<SerialNumber> {
    let bytes = serial.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    SerialNumber::new(&bytes[first..]).map_err(signing_error)
}

/// Reads a serial back, or `None` when it is wider than 128 bits.
pub(crate) fn serial_number_from_x509(serial: &SerialNumber) -> Option<u128> {
    let bytes = serial.as_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let significant = &bytes[first..];
    if significant.len() > 16 {
        return None;
    }
    Some(significant.iter().fold(0u128, |acc, b| (acc << 8) | u128::from(*b)))
}

// RFC 5280: UTCTime through 2049, GeneralizedTime from 2050 on.
fn to_x509_time(at: OffsetDateTime) -> Result<Time> {
    let year = at.to_offset(UtcOffset::UTC).year();
    let at: SystemTime = at.into();
    let time = if year < 2050 {
        UtcTime::from_system_time(at).map(Time::UtcTime)
    } else {
        GeneralizedTime::from_system_time(at).map(Time::GeneralTime)
    };
    time.map_err(|e| IssuanceError::Signing(format!("validity out of range: {e}")))
}

pub(crate) fn from_x509_time(time: &Time) -> OffsetDateTime {
    let at = match time {
        Time::UtcTime(ut) => ut.to_system_time(),
        Time::GeneralTime(gt) => gt.to_system_time(),
    };
    OffsetDateTime::from(at)
}
