//! Retry delay calculation.

use std::time::Duration;

use reqwest::header::HeaderMap;

/// Fallback when a 429 response carries no usable `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: f64 = 1.0;

/// Largest exponent applied to the base delay. The cap makes the value
/// irrelevant past a handful of attempts; the clamp only guards overflow.
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// Jittered exponential backoff for the given attempt (1-indexed from the
/// attempt that just failed): `min(base * 2^(attempt-1) + jitter, max)`.
///
/// Jitter is a random fraction of up to 10% of the unjittered delay. Keeping
/// the fraction below the doubling factor means successive delays are
/// monotonically non-decreasing up to the cap.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exp = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    let unjittered = base.saturating_mul(2u32.saturating_pow(exp));
    let jitter = unjittered.mul_f64(0.1 * fastrand::f64());
    std::cmp::min(unjittered.saturating_add(jitter), max)
}

/// Read the wait requested by a 429 response, in seconds.
///
/// Absent or unparseable headers fall back to 1.0s rather than failing the
/// retry loop.
pub fn retry_after_seconds(headers: &HeaderMap) -> f64 {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}
