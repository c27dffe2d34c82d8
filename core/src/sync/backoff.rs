//! Exponential backoff schedule for redelivery attempts
//!
//! The delay is computed from the record's own retry history, not the
//! pass's, so a draining pass containing many already-failing records does
//! not hammer the backend in a tight loop while fresh records are still
//! attempted with zero delay.

use std::time::Duration;

/// Compute the pre-attempt delay for a record with the given retry count
///
/// `min(base * 2^retry_count, cap)`; zero for records on their first
/// attempt. The exponent is clamped so large retry counts saturate at the
/// cap instead of overflowing.
pub fn retry_delay(retry_count: i32, base_ms: u64, cap_ms: u64) -> Duration {
	if retry_count <= 0 {
		return Duration::ZERO;
	}

	let exponent = retry_count.min(31) as u32;
	let millis = base_ms.saturating_mul(1u64 << exponent).min(cap_ms);

	Duration::from_millis(millis)
}
