//! Draining pass over the mutation queue
//!
//! One invocation per delivery trigger firing. Records are attempted
//! sequentially in enqueue order; delivery failures are absorbed into retry
//! bookkeeping and never abort the pass, while storage failures abort it
//! with a sentinel summary. A mutex keyed to the queue coalesces
//! overlapping triggers into a single in-flight pass.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::infra::event::{SyncEvent, SyncEventBus};
use crate::sync::backoff::retry_delay;
use crate::sync::config::SyncConfig;
use crate::sync::credentials::CredentialStore;
use crate::sync::queue::MutationQueue;
use crate::sync::transport::{DeliveryError, DeliveryTransport};

/// Result of one draining pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
	/// True only when every attempted record was delivered
	pub success: bool,
	pub synced_count: i64,
	/// `-1` is the sentinel for "the pass could not run" (storage failure),
	/// distinct from a pass in which some mutations failed
	pub failed_count: i64,
}

impl PassSummary {
	fn clean() -> Self {
		Self {
			success: true,
			synced_count: 0,
			failed_count: 0,
		}
	}

	fn fatal() -> Self {
		Self {
			success: false,
			synced_count: 0,
			failed_count: -1,
		}
	}

	/// Whether the pass aborted on a storage failure
	pub fn is_fatal(&self) -> bool {
		self.failed_count < 0
	}
}

/// Executes draining passes against the queue
pub struct SyncProcessor {
	queue: Arc<MutationQueue>,
	transport: Arc<dyn DeliveryTransport>,
	credentials: Arc<CredentialStore>,
	events: SyncEventBus,
	config: SyncConfig,
	/// Single-flight guard: overlapping triggers wait here instead of
	/// racing a second pass over the same pending set
	pass_lock: Mutex<()>,
}

impl SyncProcessor {
	pub fn new(
		queue: Arc<MutationQueue>,
		transport: Arc<dyn DeliveryTransport>,
		credentials: Arc<CredentialStore>,
		events: SyncEventBus,
		config: SyncConfig,
	) -> Self {
		Self {
			queue,
			transport,
			credentials,
			events,
			config,
			pass_lock: Mutex::new(()),
		}
	}

	/// Run one draining pass
	///
	/// At most one pass runs at a time; a trigger firing mid-pass blocks on
	/// the guard and drains whatever is left afterwards.
	pub async fn run_pass(&self) -> PassSummary {
		let _guard = self.pass_lock.lock().await;

		let pending = match self.queue.pending().await {
			Ok(pending) => pending,
			Err(e) => {
				error!(error = %e, "Mutation store unavailable; draining pass aborted");
				return PassSummary::fatal();
			}
		};

		if pending.is_empty() {
			debug!("No pending mutations to drain");
			return PassSummary::clean();
		}

		debug!(pending = pending.len(), "Draining pending mutations");

		let mut synced_count = 0i64;
		let mut failed_count = 0i64;

		for record in pending {
			// Backoff before the attempt, from the record's own history, so
			// failing records don't retry in a tight loop while fresh ones
			// go out immediately.
			if record.retry_count > 0 {
				let delay = retry_delay(
					record.retry_count,
					self.config.base_delay_ms,
					self.config.max_delay_ms,
				);
				debug!(
					id = %record.id,
					retry_count = record.retry_count,
					delay_ms = delay.as_millis() as u64,
					"Backing off before redelivery"
				);
				sleep(delay).await;
			}

			// Credentials are read per attempt, not per pass, so a rotation
			// mid-pass applies to the very next record.
			let attempt = match self.credentials.get().await {
				Some(credentials) => self.transport.deliver(&record, &credentials).await,
				None => Err(DeliveryError::MissingCredentials),
			};

			match attempt {
				Ok(()) => match self.queue.remove(record.id).await {
					Ok(()) => {
						synced_count += 1;
						debug!(id = %record.id, category = %record.category, "Mutation delivered");
					}
					Err(e) => {
						error!(
							id = %record.id,
							error = %e,
							"Mutation store unavailable after delivery; draining pass aborted"
						);
						return PassSummary::fatal();
					}
				},
				Err(delivery_error) => {
					failed_count += 1;
					let attempts = record.retry_count + 1;

					if attempts >= self.config.max_retries {
						// Evict instead of storing a count at the limit; the
						// store never holds retry_count >= max_retries.
						match self.queue.remove(record.id).await {
							Ok(()) => {
								warn!(
									id = %record.id,
									category = %record.category,
									attempts,
									error = %delivery_error,
									"Mutation exceeded retry limit; evicted as poison"
								);
								self.events.emit(SyncEvent::MutationEvicted {
									id: record.id,
									category: record.category,
									retry_count: attempts,
								});
							}
							Err(e) => {
								error!(
									id = %record.id,
									error = %e,
									"Mutation store unavailable during eviction; draining pass aborted"
								);
								return PassSummary::fatal();
							}
						}
					} else {
						match self.queue.bump_retry(record.id).await {
							Ok(retry_count) => {
								warn!(
									id = %record.id,
									category = %record.category,
									retry_count,
									error = %delivery_error,
									"Mutation delivery failed; will retry"
								);
							}
							Err(e) => {
								error!(
									id = %record.id,
									error = %e,
									"Mutation store unavailable recording retry; draining pass aborted"
								);
								return PassSummary::fatal();
							}
						}
					}
				}
			}
		}

		PassSummary {
			success: failed_count == 0,
			synced_count,
			failed_count,
		}
	}
}
