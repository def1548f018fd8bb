use std::net::IpAddr;

use bon::Builder;
use const_oid::ObjectIdentifier;
use const_oid::db::rfc4519;
use der::asn1::{PrintableStringRef, SetOfVec};
use der::flagset::FlagSet;
use der::{Any, Tag};
use time::{Date, Duration, Month, OffsetDateTime};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use super::extensions::{KeyUsages, ToAndFromX509Extension};
pub use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::error::{IssuanceError, Result};
use crate::policy;

/// An unsigned certificate template supplied by the caller.
///
/// The pipeline never changes a request except for `serial_number`, which is
/// `None` until the request is issued and then holds the serial of the most
/// recent certificate minted from it.
///
/// # Fields
/// * `subject` - The distinguished name of the certificate subject.
/// * `validity` - The window in which the certificate is valid.
/// * `key_usage` - Key usage flags; omitted from the certificate when empty.
/// * `extended_key_usage` - Extended key usage purposes.
/// * `basic_constraints_valid` - Emit a basic constraints extension even for non-CAs.
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `max_path_length` - Path length constraint; only allowed for CAs.
/// * `dns_names` - DNS subject alternative names.
/// * `ip_addresses` - IP subject alternative names.
/// * `extensions` - Additional raw X.509 extensions; one sharing an OID with a
///   generated extension replaces it.
#[derive(Clone, Debug, Builder)]
pub struct CertificateRequest {
    pub subject: DistinguishedName,
    pub validity: Validity,
    #[builder(default)]
    pub key_usage: FlagSet<KeyUsages>,
    #[builder(default)]
    pub extended_key_usage: Vec<ExtendedKeyUsageOption>,
    #[builder(default)]
    pub basic_constraints_valid: bool,
    #[builder(default)]
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
    #[builder(default)]
    pub dns_names: Vec<String>,
    #[builder(default)]
    pub ip_addresses: Vec<IpAddr>,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
    #[builder(skip)]
    pub serial_number: Option<u128>,
}

impl CertificateRequest {
    /// A template for a self-signed certificate authority.
    pub fn certificate_authority(common_name: impl Into<String>, validity: Validity) -> Self {
        Self::builder()
            .subject(DistinguishedName::named(common_name))
            .validity(validity)
            .key_usage(
                KeyUsages::KeyCertSign | KeyUsages::KeyEncipherment | KeyUsages::DigitalSignature,
            )
            .basic_constraints_valid(true)
            .is_ca(true)
            .build()
    }

    /// A template for a TLS server certificate.
    pub fn server(
        common_name: impl Into<String>,
        dns_names: Vec<String>,
        validity: Validity,
    ) -> Self {
        Self::builder()
            .subject(DistinguishedName::named(common_name))
            .validity(validity)
            .key_usage(KeyUsages::KeyEncipherment | KeyUsages::DigitalSignature)
            .extended_key_usage(vec![ExtendedKeyUsageOption::ServerAuth])
            .basic_constraints_valid(true)
            .dns_names(dns_names)
            .build()
    }

    /// A request with no subject and no alternative names identifies nothing.
    pub fn is_empty(&self) -> bool {
        self.subject.is_empty() && !self.has_alt_names()
    }

    pub fn has_alt_names(&self) -> bool {
        !self.dns_names.is_empty() || !self.ip_addresses.is_empty()
    }
}

/// Distinguished name parameters for building an X.509 certificate.
///
/// Empty attributes are left out of the encoded name.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `country` - The country (C).
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(default)]
    pub common_name: String,
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    /// A name holding only a common name.
    pub fn named(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attributes().next().is_none()
    }

    // Same attribute order as other X.509 tooling, so names compare equal
    // when they are re-encoded.
    fn attributes(&self) -> impl Iterator<Item = (ObjectIdentifier, &str)> {
        [
            (rfc4519::COUNTRY_NAME, self.country.as_deref()),
            (rfc4519::ST, self.state.as_deref()),
            (rfc4519::LOCALITY_NAME, self.locality.as_deref()),
            (rfc4519::ORGANIZATION_NAME, self.organization.as_deref()),
            (rfc4519::ORGANIZATIONAL_UNIT_NAME, self.organization_unit.as_deref()),
            (rfc4519::COMMON_NAME, Some(self.common_name.as_str())),
        ]
        .into_iter()
        .filter_map(|(oid, value)| value.filter(|v| !v.is_empty()).map(|v| (oid, v)))
    }

    /// Converts the distinguished name to its X.509 form.
    ///
    /// Country is encoded as a `PrintableString`, everything else as `UTF8String`.
    pub fn to_x509_name(&self) -> Result<Name> {
        let invalid = |e: der::Error| IssuanceError::InvalidRequest(format!("subject: {e}"));

        let rdns = self
            .attributes()
            .map(|(oid, value)| -> Result<RelativeDistinguishedName> {
                let tag = if oid == rfc4519::COUNTRY_NAME {
                    PrintableStringRef::new(value).map_err(invalid)?;
                    Tag::PrintableString
                } else {
                    Tag::Utf8String
                };
                let value = Any::new(tag, value.as_bytes()).map_err(invalid)?;

                let set = SetOfVec::try_from(vec![AttributeTypeAndValue { oid, value }])
                    .map_err(invalid)?;
                Ok(RelativeDistinguishedName(set))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from its X.509 form.
    ///
    /// Attributes other than the six modelled here are ignored, as are values
    /// that are not text.
    pub fn from_x509_name(name: &Name) -> Self {
        let mut dn = DistinguishedName::default();

        for attr in name.0.iter().flat_map(|rdn| rdn.0.iter()) {
            let Ok(value) = std::str::from_utf8(attr.value.value()) else {
                continue;
            };
            let value = value.to_string();
            match attr.oid {
                rfc4519::COMMON_NAME => dn.common_name = value,
                rfc4519::COUNTRY_NAME => dn.country = Some(value),
                rfc4519::ST => dn.state = Some(value),
                rfc4519::LOCALITY_NAME => dn.locality = Some(value),
                rfc4519::ORGANIZATION_NAME => dn.organization = Some(value),
                rfc4519::ORGANIZATIONAL_UNIT_NAME => dn.organization_unit = Some(value),
                _ => {}
            }
        }

        dn
    }
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            not_before: now,
            not_after: now + Duration::days(days),
        }
    }

    /// Creates a validity period starting now for the given number of calendar
    /// months. A day past the end of the target month is clamped to its last day.
    pub fn for_months(months: u32) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            not_before: now,
            not_after: add_months(now, months),
        }
    }

    pub fn for_years(years: u32) -> Self {
        Self::for_months(years.saturating_mul(12))
    }

    /// Validity of a server certificate under the issuance policy.
    pub fn server_default() -> Self {
        Self::for_months(policy::SERVER_VALIDITY_MONTHS)
    }

    /// Validity of a CA certificate under the issuance policy.
    pub fn ca_default() -> Self {
        Self::for_years(policy::CA_VALIDITY_YEARS)
    }

    /// Backdates `not_before` by [`policy::CLOCK_SKEW`].
    pub fn with_clock_skew(mut self) -> Self {
        self.not_before -= policy::CLOCK_SKEW;
        self
    }

    pub fn is_well_formed(&self) -> bool {
        self.not_after > self.not_before
    }
}

fn add_months(at: OffsetDateTime, months: u32) -> OffsetDateTime {
    let zero_based = i64::from(u8::from(at.month())) - 1 + i64::from(months);
    let Ok(year) = i32::try_from(i64::from(at.year()) + zero_based / 12) else {
        return at.replace_date(Date::MAX);
    };
    let month = Month::January.nth_next((zero_based % 12) as u8);
    let day = at.day().min(month.length(year));

    match Date::from_calendar_date(year, month, day) {
        Ok(date) => at.replace_date(date),
        Err(_) => at.replace_date(Date::MAX),
    }
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }
}
