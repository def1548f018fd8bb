use certmint::cert::params::{CertificateRequest, Validity};
use certmint::operator::{PemOperator, default_operator};
use certmint::retry::{RetryPolicy, retry_with_policy};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

fn main() -> certmint::error::Result<()> {
    SubscriberBuilder::default()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let operator = default_operator();
    let policy = RetryPolicy::default();

    // Self-signed CA
    let ca = retry_with_policy(&policy, || {
        let mut request = CertificateRequest::certificate_authority(
            "example-operator-targets-CA",
            Validity::ca_default().with_clock_skew(),
        );
        operator.create_self_signed(Some(&mut request))
    })?;
    info!("CA certificate is generated");

    // Server certificate signed by the CA
    let server = retry_with_policy(&policy, || {
        let mut request = CertificateRequest::server(
            "example-operator-targets",
            vec![
                "localhost".to_string(),
                "example-operator-targets.kube-system.svc.cluster.local".to_string(),
            ],
            Validity::server_default().with_clock_skew(),
        );
        operator.create_with_authority(Some(&mut request), &ca.certificate, &ca.private_key)
    })?;
    info!("server certificate is generated");

    println!("CA Certificate PEM:\n{}", ca.certificate_pem);
    println!("Server Certificate PEM:\n{}", server.certificate_pem);
    println!("Server Key PEM:\n{}", server.private_key_pem);

    Ok(())
}
