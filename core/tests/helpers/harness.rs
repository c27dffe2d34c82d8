//! Engine harness for sync integration tests

use std::sync::Arc;
use std::time::Duration;

use moneta_core::sync::{
	DeliveryCredentials, FakeClock, MutationAction, MutationCategory, MutationRecord, SyncConfig,
	SyncEngine,
};
use moneta_core::{Db, SyncEvent};
use tempfile::TempDir;
use tokio::sync::{broadcast, watch};

use super::fake_transport::FakeTransport;

/// How long event-driven assertions wait before giving up
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A sync engine wired to a temp database, fake clock, and fake transport
///
/// Starts offline with no credentials pushed; tests flip connectivity and
/// push credentials as each scenario requires. Backoff is shrunk to
/// milliseconds so retry-heavy scenarios stay fast, and the periodic
/// trigger is disabled unless a test opts in.
pub struct EngineHarness {
	pub engine: Arc<SyncEngine>,
	pub transport: Arc<FakeTransport>,
	pub clock: FakeClock,
	pub connectivity: watch::Sender<bool>,
	pub db: Arc<Db>,
	pub data_dir: TempDir,
}

/// Shrunk-backoff configuration used by most harness tests
pub fn test_config() -> SyncConfig {
	SyncConfig {
		base_delay_ms: 1,
		max_delay_ms: 8,
		max_retries: 5,
		periodic_interval_secs: None,
		message_capacity: 16,
	}
}

impl EngineHarness {
	pub async fn new() -> Self {
		Self::with_config(test_config()).await
	}

	pub async fn with_config(config: SyncConfig) -> Self {
		let data_dir = TempDir::new().expect("create temp dir");
		let db = Arc::new(
			Db::open(data_dir.path().join("mutations.db"))
				.await
				.expect("open test database"),
		);

		let clock = FakeClock::new(1_700_000_000_000);
		let transport = FakeTransport::new();
		let (connectivity, connectivity_rx) = watch::channel(false);

		let engine = Arc::new(SyncEngine::new(
			db.clone(),
			transport.clone(),
			connectivity_rx,
			config,
			Arc::new(clock.clone()),
		));

		Self {
			engine,
			transport,
			clock,
			connectivity,
			db,
			data_dir,
		}
	}

	/// Put valid credentials directly into the engine's credential cell
	pub async fn push_credentials(&self) {
		self.engine
			.credentials()
			.set(DeliveryCredentials {
				url: "https://api.moneta.test".to_string(),
				key: "test-key".to_string(),
			})
			.await;
	}

	/// Enqueue a create mutation against `endpoint`
	pub async fn enqueue_create(&self, endpoint: &str) -> MutationRecord {
		self.engine
			.enqueue(
				MutationCategory::GenericMutation,
				MutationAction::Create,
				endpoint,
				serde_json::json!({ "amount": 125, "note": "coffee" }),
			)
			.await
			.expect("enqueue mutation")
	}

	/// Enqueue an update mutation against `endpoint`
	pub async fn enqueue_update(&self, endpoint: &str) -> MutationRecord {
		self.engine
			.enqueue(
				MutationCategory::Budget,
				MutationAction::Update,
				endpoint,
				serde_json::json!({ "limit": 400 }),
			)
			.await
			.expect("enqueue mutation")
	}
}

/// Wait for the next event matching `predicate`, skipping others
pub async fn wait_for_event(
	receiver: &mut broadcast::Receiver<SyncEvent>,
	predicate: impl Fn(&SyncEvent) -> bool,
) -> SyncEvent {
	tokio::time::timeout(EVENT_TIMEOUT, async {
		loop {
			let event = receiver.recv().await.expect("event bus closed");
			if predicate(&event) {
				break event;
			}
		}
	})
	.await
	.expect("timed out waiting for sync event")
}

/// Wait for the next completion broadcast
pub async fn wait_for_completion(receiver: &mut broadcast::Receiver<SyncEvent>) -> SyncEvent {
	wait_for_event(receiver, |event| {
		matches!(event, SyncEvent::SyncComplete { .. })
	})
	.await
}
