//! Sync engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the mutation sync engine
///
/// Defaults match production behavior; tests shrink the backoff window so
/// retry-heavy scenarios run in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
	/// Base backoff delay applied before the second delivery attempt
	pub base_delay_ms: u64,

	/// Ceiling on the computed backoff delay
	pub max_delay_ms: u64,

	/// Delivery attempts before a record is evicted as a poison message
	pub max_retries: i32,

	/// Interval for the periodic delivery trigger; None disables it
	pub periodic_interval_secs: Option<u64>,

	/// Capacity of the engine message channel
	pub message_capacity: usize,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			base_delay_ms: 1_000,
			max_delay_ms: 30_000,
			max_retries: 5,
			periodic_interval_secs: Some(900),
			message_capacity: 64,
		}
	}
}

impl SyncConfig {
	/// The periodic trigger interval, if enabled
	pub fn periodic_interval(&self) -> Option<Duration> {
		self.periodic_interval_secs.map(Duration::from_secs)
	}
}
