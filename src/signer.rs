//! The primitive signer: serial numbers, DER certificate production and parsing.
//!
//! This layer carries no issuance policy. It signs whatever template it is
//! handed, provided the template is structurally complete.

use der::Encode;
use der::asn1::BitString;
use rand_core::{OsRng, RngCore};
use tracing::trace;

use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAltName,
    SubjectKeyIdentifier,
};
use crate::cert::params::{CertificateRequest, ExtensionParam};
use crate::cert::{Certificate, SignatureAlgorithm};
use crate::error::{IssuanceError, Result};
use crate::issuer::IssuerIdentity;
use crate::key::{self, PrivateKey, PublicKey};
use crate::tbs_certificate::TbsCertificate;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

/// Stateless cryptographic primitives used to mint certificates.
pub trait CertificateSigner: Send + Sync {
    /// Returns a cryptographically random serial number in `1..2^128`.
    fn generate_serial_number(&self) -> Result<u128>;

    /// Produces the DER encoding of a certificate for `template`, chained to
    /// `parent` and signed by `signer_private_key`.
    ///
    /// For a self-signed certificate `parent` is the template itself.
    fn sign_certificate(
        &self,
        template: &CertificateRequest,
        parent: &dyn IssuerIdentity,
        subject_public_key: &PublicKey,
        signer_private_key: &PrivateKey,
    ) -> Result<Vec<u8>>;

    /// Parses DER bytes into a certificate.
    fn parse_certificate(&self, der: &[u8]) -> Result<Certificate>;

    /// Assigns a fresh serial number to `request`, signs it and parses the
    /// result back.
    ///
    /// The parent is `ca_certificate`, or the request itself when it is `None`.
    fn create_certificate_with_public_key(
        &self,
        request: &mut CertificateRequest,
        subject_public_key: &PublicKey,
        ca_certificate: Option<&Certificate>,
        signer_private_key: &PrivateKey,
    ) -> Result<Certificate> {
        request.serial_number = Some(self.generate_serial_number()?);

        let request = &*request;
        let parent: &dyn IssuerIdentity = match ca_certificate {
            Some(ca) => ca,
            None => request,
        };

        let der = self.sign_certificate(request, parent, subject_public_key, signer_private_key)?;
        self.parse_certificate(&der)
    }
}

/// [`CertificateSigner`] producing sha256WithRSAEncryption certificates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaCertificateSigner;

impl RsaCertificateSigner {
    pub fn new() -> Self {
        Self
    }
}

impl CertificateSigner for RsaCertificateSigner {
    fn generate_serial_number(&self) -> Result<u128> {
        let mut bytes = [0u8; 16];
        loop {
            OsRng.try_fill_bytes(&mut bytes)?;
            let serial = u128::from_be_bytes(bytes);
            if serial != 0 {
                return Ok(serial);
            }
        }
    }

    fn sign_certificate(
        &self,
        template: &CertificateRequest,
        parent: &dyn IssuerIdentity,
        subject_public_key: &PublicKey,
        signer_private_key: &PrivateKey,
    ) -> Result<Vec<u8>> {
        let serial_number = validate_template(template)?;

        let signer_public_key = signer_private_key.to_public_key();
        if let Some(parent_spki) = parent.issuer_public_key_info() {
            let signer_spki = key::subject_public_key_info(&signer_public_key)?;
            if parent_spki.algorithm.oid != signer_spki.algorithm.oid
                || parent_spki.subject_public_key != signer_spki.subject_public_key
            {
                return Err(IssuanceError::Signing(
                    "private key does not match the parent certificate's public key".to_string(),
                ));
            }
        }

        let subject_spki = key::subject_public_key_info(subject_public_key)?;
        let tbs = TbsCertificate {
            serial_number,
            signature_algorithm: SignatureAlgorithm::Sha256WithRSA,
            issuer: parent.issuer_name().map_err(template_error)?,
            validity: template.validity.clone(),
            subject: template.subject.to_x509_name().map_err(template_error)?,
            extensions: build_extensions(template, parent, &subject_spki)?,
            subject_public_key_info: subject_spki,
        }
        .to_x509()?;

        let tbs_der = tbs.to_der().map_err(|e| IssuanceError::Signing(e.to_string()))?;
        let signature = key::sign_data(signer_private_key, &tbs_der)?;
        if !key::verify_data(&signer_public_key, &tbs_der, &signature) {
            return Err(IssuanceError::Signing(
                "produced signature does not verify".to_string(),
            ));
        }

        let certificate = x509_cert::Certificate {
            tbs_certificate: tbs,
            signature_algorithm: SignatureAlgorithm::Sha256WithRSA.into(),
            signature: BitString::from_bytes(&signature)
                .map_err(|e| IssuanceError::Signing(e.to_string()))?,
        };

        trace!(serial = %format_args!("{serial_number:x}"), "signed certificate");
        certificate
            .to_der()
            .map_err(|e| IssuanceError::Signing(e.to_string()))
    }

    fn parse_certificate(&self, der: &[u8]) -> Result<Certificate> {
        Certificate::from_der(der)
    }
}

/// Checks the fields a certificate cannot be built without and returns the
/// serial number.
fn validate_template(template: &CertificateRequest) -> Result<u128> {
    let invalid = |reason: &str| Err(IssuanceError::Signing(format!("invalid template: {reason}")));

    let serial_number = match template.serial_number {
        None => return invalid("no serial number"),
        Some(0) => return invalid("serial number is zero"),
        Some(serial) => serial,
    };
    if template.is_empty() {
        return invalid("neither a subject nor alternative names");
    }
    if !template.validity.is_well_formed() {
        return invalid("validity ends before it starts");
    }
    if template.max_path_length.is_some() && !template.is_ca {
        return invalid("path length constraint on a non-CA certificate");
    }
    Ok(serial_number)
}

// A subject that cannot be encoded is a template defect at this layer.
fn template_error(err: IssuanceError) -> IssuanceError {
    match err {
        IssuanceError::InvalidRequest(reason) => {
            IssuanceError::Signing(format!("invalid template: {reason}"))
        }
        other => other,
    }
}

fn build_extensions(
    template: &CertificateRequest,
    parent: &dyn IssuerIdentity,
    subject_spki: &SubjectPublicKeyInfoOwned,
) -> Result<Vec<ExtensionParam>> {
    let mut extensions = Vec::new();

    if template.basic_constraints_valid || template.is_ca {
        let basic_constraints = BasicConstraints {
            is_ca: template.is_ca,
            max_path_length: template.max_path_length,
        };
        extensions.push(ExtensionParam::from_extension(basic_constraints, true)?);
    }

    if !template.key_usage.is_empty() {
        extensions.push(ExtensionParam::from_extension(KeyUsage(template.key_usage), true)?);
    }

    if !template.extended_key_usage.is_empty() {
        let extended_key_usage = ExtendedKeyUsage {
            usage: template.extended_key_usage.clone(),
        };
        extensions.push(ExtensionParam::from_extension(extended_key_usage, false)?);
    }

    if template.has_alt_names() {
        let san = SubjectAltName {
            dns_names: template.dns_names.clone(),
            ip_addresses: template.ip_addresses.clone(),
        };
        // RFC 5280 4.2.1.6: critical when the subject is empty
        extensions.push(ExtensionParam::from_extension(san, template.subject.is_empty())?);
    }

    if template.is_ca {
        let ski = SubjectKeyIdentifier(key::key_identifier(subject_spki));
        extensions.push(ExtensionParam::from_extension(ski, false)?);
    }

    if let Some(key_identifier) = parent.authority_key_identifier()? {
        let aki = AuthorityKeyIdentifier { key_identifier };
        extensions.push(ExtensionParam::from_extension(aki, false)?);
    }

    // Caller-supplied extensions replace generated ones with the same OID.
    extensions.retain(|generated| !template.extensions.iter().any(|ext| ext.oid == generated.oid));
    extensions.extend(template.extensions.iter().cloned());

    Ok(extensions)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rsa::RsaPrivateKey;

    use super::*;
    use crate::cert::extensions::{KeyUsages, ToAndFromX509Extension};
    use crate::cert::params::{DistinguishedName, Validity};

    // The signer does not care about key size; keep unit tests quick.
    fn test_key() -> PrivateKey {
        RsaPrivateKey::new(&mut OsRng, 2048).unwrap()
    }

    fn request(common_name: &str) -> CertificateRequest {
        CertificateRequest::builder()
            .subject(DistinguishedName::named(common_name))
            .validity(Validity::for_days(30))
            .build()
    }

    fn self_signed_ca(key: &PrivateKey) -> Certificate {
        let mut ca = CertificateRequest::certificate_authority("Test CA", Validity::for_days(30));
        RsaCertificateSigner
            .create_certificate_with_public_key(&mut ca, &key.to_public_key(), None, key)
            .unwrap()
    }

    #[test]
    fn test_serial_numbers_are_nonzero_and_distinct() {
        let signer = RsaCertificateSigner::new();
        let serials: HashSet<u128> = (0..10_000)
            .map(|_| signer.generate_serial_number().unwrap())
            .collect();
        assert_eq!(serials.len(), 10_000);
        assert!(!serials.contains(&0));
    }

    #[test]
    fn test_self_signed_issuer_is_subject() {
        let key = test_key();
        let mut template = request("self.local");
        let cert = RsaCertificateSigner
            .create_certificate_with_public_key(&mut template, &key.to_public_key(), None, &key)
            .unwrap();

        assert_eq!(cert.issuer(), cert.subject());
        assert_eq!(cert.common_name().as_deref(), Some("self.local"));
        assert_eq!(cert.serial_number(), template.serial_number);
        assert!(cert.is_signed_by(&key.to_public_key()));
        assert!(cert.matches_private_key(&key));
        assert!(cert.extension::<AuthorityKeyIdentifier>().unwrap().is_none());

        let validity = cert.validity();
        assert_eq!(
            validity.not_before,
            template.validity.not_before.replace_nanosecond(0).unwrap()
        );
        assert_eq!(
            validity.not_after,
            template.validity.not_after.replace_nanosecond(0).unwrap()
        );
    }

    #[test]
    fn test_ca_signed_chains_to_ca() {
        let ca_key = test_key();
        let ca = self_signed_ca(&ca_key);
        assert!(ca.is_ca());
        let ca_ski = ca.subject_key_identifier().unwrap().expect("CA carries a key identifier");

        let leaf_key = test_key();
        let mut template = request("leaf.local");
        template.dns_names = vec!["leaf.local".to_string()];
        let leaf = RsaCertificateSigner
            .create_certificate_with_public_key(
                &mut template,
                &leaf_key.to_public_key(),
                Some(&ca),
                &ca_key,
            )
            .unwrap();

        assert_eq!(leaf.issuer(), ca.subject());
        assert!(leaf.is_signed_by(&ca_key.to_public_key()));
        assert!(!leaf.is_signed_by(&leaf_key.to_public_key()));
        assert!(leaf.matches_private_key(&leaf_key));
        assert!(!leaf.is_ca());

        let aki = leaf.extension::<AuthorityKeyIdentifier>().unwrap().unwrap();
        assert_eq!(aki.key_identifier, ca_ski);
        let san = leaf.extension::<SubjectAltName>().unwrap().unwrap();
        assert_eq!(san.dns_names, vec!["leaf.local".to_string()]);
    }

    #[test]
    fn test_undecodable_parent_key_identifier_is_reported() {
        let ca_key = test_key();
        let mut ca_request =
            CertificateRequest::certificate_authority("Broken CA", Validity::for_days(30));
        ca_request.extensions = vec![ExtensionParam {
            oid: SubjectKeyIdentifier::OID,
            critical: false,
            value: vec![0xff, 0x01],
        }];
        let ca = RsaCertificateSigner
            .create_certificate_with_public_key(
                &mut ca_request,
                &ca_key.to_public_key(),
                None,
                &ca_key,
            )
            .unwrap();
        assert!(matches!(
            ca.subject_key_identifier(),
            Err(IssuanceError::MalformedCertificate(_))
        ));

        let mut leaf = request("leaf.local");
        let err = RsaCertificateSigner
            .create_certificate_with_public_key(
                &mut leaf,
                &test_key().to_public_key(),
                Some(&ca),
                &ca_key,
            )
            .unwrap_err();
        assert!(matches!(err, IssuanceError::MalformedCertificate(_)), "{err}");
    }

    #[test]
    fn test_mismatched_ca_key_is_rejected() {
        let ca = self_signed_ca(&test_key());
        let mut template = request("leaf.local");
        template.serial_number = Some(7);

        let leaf_key = test_key();
        let err = RsaCertificateSigner
            .sign_certificate(&template, &ca, &leaf_key.to_public_key(), &test_key())
            .unwrap_err();
        assert!(matches!(err, IssuanceError::Signing(_)), "{err}");
    }

    #[test]
    fn test_structurally_invalid_templates_are_rejected() {
        let key = test_key();
        let public = key.to_public_key();
        let sign = |template: &CertificateRequest| {
            RsaCertificateSigner.sign_certificate(template, template, &public, &key)
        };

        let no_serial = request("a.local");
        assert!(matches!(sign(&no_serial), Err(IssuanceError::Signing(_))));

        let mut empty = request("");
        empty.serial_number = Some(1);
        assert!(matches!(sign(&empty), Err(IssuanceError::Signing(_))));

        let mut inverted = request("a.local");
        inverted.serial_number = Some(1);
        inverted.validity = Validity {
            not_before: inverted.validity.not_after,
            not_after: inverted.validity.not_before,
        };
        assert!(matches!(sign(&inverted), Err(IssuanceError::Signing(_))));

        let mut path_len = request("a.local");
        path_len.serial_number = Some(1);
        path_len.max_path_length = Some(0);
        assert!(matches!(sign(&path_len), Err(IssuanceError::Signing(_))));

        let mut bad_country = request("a.local");
        bad_country.serial_number = Some(1);
        bad_country.subject.country = Some("not printable!".to_string());
        assert!(matches!(sign(&bad_country), Err(IssuanceError::Signing(_))));
    }

    #[test]
    fn test_caller_extension_replaces_generated_one() {
        let key = test_key();
        let mut template = request("override.local");
        template.key_usage = KeyUsages::DigitalSignature.into();
        template.extensions = vec![
            ExtensionParam::from_extension(KeyUsage(KeyUsages::CRLSign.into()), true).unwrap(),
        ];

        let cert = RsaCertificateSigner
            .create_certificate_with_public_key(&mut template, &key.to_public_key(), None, &key)
            .unwrap();

        let key_usages: Vec<_> = cert
            .inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .filter(|ext| ext.extn_id == KeyUsage::OID)
            .collect();
        assert_eq!(key_usages.len(), 1);
        assert_eq!(
            cert.extension::<KeyUsage>().unwrap(),
            Some(KeyUsage(KeyUsages::CRLSign.into()))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = RsaCertificateSigner
            .parse_certificate(b"definitely not DER")
            .unwrap_err();
        assert!(matches!(err, IssuanceError::MalformedCertificate(_)));
    }

    #[test]
    fn test_parse_rejects_trailing_bytes() {
        let key = test_key();
        let mut template = request("trailing.local");
        let cert = RsaCertificateSigner
            .create_certificate_with_public_key(&mut template, &key.to_public_key(), None, &key)
            .unwrap();
        let mut der = cert.to_der().unwrap();
        assert_eq!(RsaCertificateSigner.parse_certificate(&der).unwrap(), cert);

        der.push(0);
        assert!(matches!(
            RsaCertificateSigner.parse_certificate(&der),
            Err(IssuanceError::MalformedCertificate(_))
        ));
    }
}
