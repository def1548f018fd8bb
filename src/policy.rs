//! Issuance policy constants.
//!
//! These are deployment decisions rather than runtime parameters: every
//! certificate minted by one build of the crate follows the same policy.

use std::time::Duration;

/// Validity of server (leaf) certificates, in months.
pub const SERVER_VALIDITY_MONTHS: u32 = 8;

/// Validity of CA certificates, in years.
pub const CA_VALIDITY_YEARS: u32 = 2;

/// Allowed clock skew between the issuer and relying parties.
pub const CLOCK_SKEW: Duration = Duration::from_secs(10 * 60);

/// Number of attempts made by the default retry policy.
pub const KEY_RETRY_COUNT: u32 = 3;

/// Delay before the first retry of the default retry policy.
pub const KEY_RETRY_INTERVAL: Duration = Duration::from_micros(5);

/// Overall time budget of the default retry policy.
pub const KEY_RETRY_TIMEOUT: Duration = Duration::from_secs(10);
