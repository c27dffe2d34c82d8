//! Time source abstraction for the mutation queue
//!
//! Enqueue timestamps are the FIFO sort key for draining passes, so tests
//! need full control over them. Production code uses SystemClock for actual
//! wall-clock time, while tests use FakeClock for controlled, reproducible
//! ordering.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

/// Abstracts the wall clock used to stamp `enqueued_at`
///
/// All implementations must be thread-safe (Send + Sync) since the queue is
/// shared across async tasks.
pub trait Clock: Send + Sync {
	/// Returns the current UTC time
	fn now(&self) -> DateTime<Utc>;
}

/// Production clock using the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// Test clock with manual control
///
/// Stores milliseconds since the Unix epoch in an AtomicI64 so a single
/// FakeClock can be shared across tasks while tests control time
/// progression. Supports setting time backwards for skew scenarios.
#[derive(Debug, Clone)]
pub struct FakeClock {
	millis: Arc<AtomicI64>,
}

impl Default for FakeClock {
	fn default() -> Self {
		Self::new(1_000)
	}
}

impl FakeClock {
	/// Create a new fake clock at the given milliseconds since epoch
	pub fn new(initial_millis: i64) -> Self {
		Self {
			millis: Arc::new(AtomicI64::new(initial_millis)),
		}
	}

	/// Advance time by delta milliseconds
	pub fn advance(&self, delta_millis: i64) {
		self.millis.fetch_add(delta_millis, Ordering::SeqCst);
	}

	/// Set time to a specific value (can go backwards)
	pub fn set(&self, millis: i64) {
		self.millis.store(millis, Ordering::SeqCst);
	}
}

impl Clock for FakeClock {
	fn now(&self) -> DateTime<Utc> {
		Utc.timestamp_millis_opt(self.millis.load(Ordering::SeqCst))
			.single()
			.unwrap_or_default()
	}
}
