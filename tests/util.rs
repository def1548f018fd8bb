use std::sync::OnceLock;

use certmint::cert::params::{CertificateRequest, Validity};
use certmint::operator::{PemOperator, SelfSignedCertificate, default_operator};

/// CA shared by every test in the binary; 4096-bit key generation is slow.
pub fn ca() -> &'static SelfSignedCertificate {
    static CA: OnceLock<SelfSignedCertificate> = OnceLock::new();
    CA.get_or_init(|| {
        let mut request =
            CertificateRequest::certificate_authority("myca.local", Validity::ca_default());
        default_operator()
            .create_self_signed(Some(&mut request))
            .unwrap()
    })
}

pub fn server_request(common_name: &str) -> CertificateRequest {
    CertificateRequest::server(
        common_name,
        vec![common_name.to_string()],
        Validity::server_default().with_clock_skew(),
    )
}
