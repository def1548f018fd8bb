//! Opt-in retry for issuance calls.
//!
//! The pipeline never retries on its own. Callers that want transient
//! entropy or key generation failures retried wrap an issuance call in
//! [`retry_with_policy`]:
//!
//! ```rust,no_run
//! use certmint::cert::params::CertificateRequest;
//! use certmint::operator::{default_operator, PemOperator};
//! use certmint::retry::{retry_with_policy, RetryPolicy};
//!
//! # fn main() -> certmint::error::Result<()> {
//! let operator = default_operator();
//! let ca = retry_with_policy(&RetryPolicy::default(), || {
//!     let mut request = CertificateRequest::certificate_authority(
//!         "ca.local",
//!         certmint::cert::params::Validity::ca_default(),
//!     );
//!     operator.create_self_signed(Some(&mut request))
//! })?;
//! # Ok(())
//! # }
//! ```

use std::thread;
use std::time::{Duration, Instant};

use bon::Builder;
use tracing::{debug, warn};

use crate::error::Result;
use crate::policy;

/// How often and how long to retry a failing operation.
#[derive(Debug, Clone, Builder)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included.
    #[builder(default = policy::KEY_RETRY_COUNT)]
    pub max_attempts: u32,

    /// Delay before the first retry.
    #[builder(default = policy::KEY_RETRY_INTERVAL)]
    pub base_delay: Duration,

    /// Factor applied to the delay after each retry. Values below 1.0 or not
    /// finite keep the delay constant.
    #[builder(default = 2.0)]
    pub backoff_multiplier: f64,

    /// Overall budget; no retry starts once it would be exceeded.
    #[builder(default = policy::KEY_RETRY_TIMEOUT)]
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Runs `operation` until it succeeds, fails with an error that is not
/// retryable, runs out of attempts or would exceed the time budget.
///
/// The last error is returned unchanged.
pub fn retry_with_policy<T, F>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let started = Instant::now();
    let mut attempts = 0;
    let mut delay = policy.base_delay;

    loop {
        match operation() {
            Ok(value) => {
                if attempts > 0 {
                    debug!(attempts = attempts + 1, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                attempts += 1;

                if !error.is_retryable() || attempts >= policy.max_attempts {
                    return Err(error);
                }
                let within_budget = started
                    .elapsed()
                    .checked_add(delay)
                    .is_some_and(|next_start| next_start <= policy.timeout);
                if !within_budget {
                    debug!(?delay, "retry budget exhausted");
                    return Err(error);
                }

                warn!(
                    attempt = attempts + 1,
                    max_attempts = policy.max_attempts,
                    ?delay,
                    %error,
                    "retrying operation"
                );
                thread::sleep(delay);
                match next_delay(delay, policy.backoff_multiplier) {
                    Some(next) => delay = next,
                    None => {
                        debug!(?delay, "retry delay out of range");
                        return Err(error);
                    }
                }
            }
        }
    }
}

// `None` once the delay no longer fits in a `Duration`.
fn next_delay(delay: Duration, multiplier: f64) -> Option<Duration> {
    if !multiplier.is_finite() || multiplier < 1.0 {
        return Some(delay);
    }
    Duration::try_from_secs_f64(delay.as_secs_f64() * multiplier).ok()
}
