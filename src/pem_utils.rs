use crate::error::{IssuanceError, Result};

/// Label of a PEM block holding a DER-encoded X.509 certificate.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Label of a PEM block holding a PKCS#1 DER-encoded RSA private key.
pub const RSA_PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(&pem, pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF))
}

/// Convert a PEM‑encoded string to DER‑encoded bytes, requiring the block to
/// carry `expected_label`.
pub fn pem_to_der(pem_str: &str, expected_label: &str) -> Result<Vec<u8>> {
    let pem = pem::parse(pem_str)?;
    if pem.tag() != expected_label {
        return Err(IssuanceError::InvalidPem(format!(
            "expected a {expected_label} block, found {}",
            pem.tag()
        )));
    }
    Ok(pem.into_contents())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_uses_lf_line_endings() {
        let text = der_to_pem(&[0x30, 0x03, 0x02, 0x01, 0x01], CERTIFICATE_LABEL);
        assert!(text.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(text.ends_with("-----END CERTIFICATE-----\n"));
        assert!(!text.contains('\r'));
    }

    #[test]
    fn test_label_must_match() {
        let text = der_to_pem(b"body", RSA_PRIVATE_KEY_LABEL);
        assert_eq!(pem_to_der(&text, RSA_PRIVATE_KEY_LABEL).unwrap(), b"body");

        let err = pem_to_der(&text, CERTIFICATE_LABEL).unwrap_err();
        assert!(matches!(err, IssuanceError::InvalidPem(_)));
    }

    #[test]
    fn test_text_without_block_is_rejected() {
        let err = pem_to_der("not a pem block", CERTIFICATE_LABEL).unwrap_err();
        assert!(matches!(err, IssuanceError::InvalidPem(_)));
    }
}
