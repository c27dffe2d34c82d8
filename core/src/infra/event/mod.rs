//! Event bus for sync engine notifications
//!
//! Live application instances subscribe here to observe queue activity and
//! draining pass results. Delivery is best-effort, at-least-once per live
//! subscriber; instances that are not running at emit time never see the
//! event (no backlog is kept).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::sync::queue::MutationCategory;

/// Events emitted by the mutation sync engine
///
/// `SyncComplete` is the completion broadcast every live instance receives
/// after a draining pass; the enqueue/evict events let instances observe
/// queue growth and poison eviction without polling the store.
#[derive(Debug, Clone, Serialize, Deserialize, strum::AsRefStr)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum SyncEvent {
	/// A mutation was durably captured for later delivery
	MutationEnqueued {
		id: Uuid,
		category: MutationCategory,
	},

	/// A mutation exceeded the retry limit and was dropped
	MutationEvicted {
		id: Uuid,
		category: MutationCategory,
		retry_count: i32,
	},

	/// A draining pass finished (or failed to run at all)
	SyncComplete {
		success: bool,
		synced_count: i64,
		failed_count: i64,
		timestamp: DateTime<Utc>,
	},
}

/// Broadcast bus carrying [`SyncEvent`]s to all live subscribers
#[derive(Debug, Clone)]
pub struct SyncEventBus {
	sender: broadcast::Sender<SyncEvent>,
}

impl SyncEventBus {
	pub fn new() -> Self {
		let (sender, _) = broadcast::channel(1_024);
		Self { sender }
	}

	#[cfg(test)]
	pub fn new_with_capacity(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Emit an event to all subscribers
	///
	/// Returns the number of active subscribers that received the event.
	/// Zero subscribers is not an error; it simply means no instance is
	/// listening right now.
	pub fn emit(&self, event: SyncEvent) -> usize {
		let event_type = event.as_ref().to_string();

		match self.sender.send(event) {
			Ok(count) => {
				debug!(
					event_type = %event_type,
					subscribers = count,
					"Sync event emitted"
				);
				count
			}
			Err(_) => {
				debug!(
					event_type = %event_type,
					"Sync event emitted but no subscribers"
				);
				0
			}
		}
	}

	/// Subscribe to all future events
	pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
		self.sender.subscribe()
	}

	/// Number of active subscribers
	pub fn subscriber_count(&self) -> usize {
		self.sender.receiver_count()
	}
}

impl Default for SyncEventBus {
	fn default() -> Self {
		Self::new()
	}
}
