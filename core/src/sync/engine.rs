//! Mutation sync engine
//!
//! Wires the durable queue, delivery transport, credential cell, and event
//! bus together, and runs the background loop that turns delivery triggers
//! into draining passes. Three trigger sources funnel into the loop: a
//! connectivity-restored edge on the host-fed watch channel, an optional
//! periodic timer, and explicit manual requests over the message channel.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch, Mutex, Notify};
use tracing::{debug, info, warn};

use crate::infra::db::Db;
use crate::infra::event::{SyncEvent, SyncEventBus};
use crate::service::Service;
use crate::sync::clock::{Clock, SystemClock};
use crate::sync::config::SyncConfig;
use crate::sync::credentials::{CredentialStore, DeliveryCredentials};
use crate::sync::processor::{PassSummary, SyncProcessor};
use crate::sync::queue::{
	MutationAction, MutationCategory, MutationQueue, MutationRecord, NewMutation, QueueError,
};
use crate::sync::transport::{DeliveryTransport, HttpTransport};

/// Queue database file inside the engine's data directory
const MUTATIONS_DB_FILE: &str = "mutations.db";

/// Control messages a live application instance sends to the engine
///
/// The serialized form is the wire contract with non-Rust hosts:
/// `{ "type": "SET_CONFIG", "url": …, "key": … }` and
/// `{ "type": "MANUAL_SYNC" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum EngineMessage {
	/// Push the delivery credentials the engine calls the backend with
	SetConfig { url: String, key: String },

	/// Force an immediate draining pass outside the trigger schedule
	ManualSync,
}

/// Offline mutation synchronization engine
///
/// Captures writes durably while the client is disconnected and replays
/// them against the backend once a delivery trigger fires. Runs as a
/// background [`Service`]; the host application feeds it connectivity
/// state and credentials and observes results on the event bus.
pub struct SyncEngine {
	queue: Arc<MutationQueue>,
	processor: Arc<SyncProcessor>,
	credentials: Arc<CredentialStore>,
	events: SyncEventBus,
	clock: Arc<dyn Clock>,
	config: SyncConfig,

	/// Host-fed connectivity state; a false-to-true edge is the
	/// connectivity-restored trigger
	connectivity: watch::Receiver<bool>,

	/// Armed by the enqueue path; permits coalesce so a burst of enqueues
	/// wakes the loop once
	drain: Arc<Notify>,

	message_tx: mpsc::Sender<EngineMessage>,
	message_rx: Mutex<Option<mpsc::Receiver<EngineMessage>>>,

	is_running: Arc<AtomicBool>,
	shutdown_tx: Mutex<Option<broadcast::Sender<()>>>,
}

impl SyncEngine {
	/// Build an engine over an already-open database
	pub fn new(
		db: Arc<Db>,
		transport: Arc<dyn DeliveryTransport>,
		connectivity: watch::Receiver<bool>,
		config: SyncConfig,
		clock: Arc<dyn Clock>,
	) -> Self {
		let credentials = Arc::new(CredentialStore::new());
		let events = SyncEventBus::new();
		let queue = Arc::new(MutationQueue::new(db, clock.clone()));
		let processor = Arc::new(SyncProcessor::new(
			queue.clone(),
			transport,
			credentials.clone(),
			events.clone(),
			config.clone(),
		));

		let (message_tx, message_rx) = mpsc::channel(config.message_capacity);

		Self {
			queue,
			processor,
			credentials,
			events,
			clock,
			config,
			connectivity,
			drain: Arc::new(Notify::new()),
			message_tx,
			message_rx: Mutex::new(Some(message_rx)),
			is_running: Arc::new(AtomicBool::new(false)),
			shutdown_tx: Mutex::new(None),
		}
	}

	/// Open the queue database under `data_dir` and build a production
	/// engine (system clock, HTTP transport)
	pub async fn open(
		data_dir: impl AsRef<Path>,
		connectivity: watch::Receiver<bool>,
		config: SyncConfig,
	) -> Result<Self, QueueError> {
		let db = Arc::new(Db::open(data_dir.as_ref().join(MUTATIONS_DB_FILE)).await?);

		Ok(Self::new(
			db,
			Arc::new(HttpTransport::new()),
			connectivity,
			config,
			Arc::new(SystemClock),
		))
	}

	/// Durably capture a mutation and arm the delivery trigger
	///
	/// Once this returns `Ok`, the mutation will eventually be attempted
	/// even if the process terminates immediately afterwards. If the client
	/// is currently online the background loop is woken right away;
	/// otherwise the connectivity-restored trigger picks the record up.
	pub async fn enqueue(
		&self,
		category: MutationCategory,
		action: MutationAction,
		endpoint: impl Into<String>,
		payload: serde_json::Value,
	) -> Result<MutationRecord, QueueError> {
		let record = self
			.queue
			.enqueue(NewMutation {
				category,
				action,
				endpoint: endpoint.into(),
				payload,
			})
			.await?;

		info!(
			id = %record.id,
			category = %record.category,
			"Captured mutation for deferred delivery"
		);
		self.events.emit(SyncEvent::MutationEnqueued {
			id: record.id,
			category: record.category,
		});

		if *self.connectivity.borrow() {
			self.drain.notify_one();
		}

		Ok(record)
	}

	/// Run one draining pass right now and broadcast its summary
	///
	/// The single-flight guard still applies: a concurrent pass finishes
	/// first, then this one drains whatever it left behind.
	pub async fn run_pass(&self) -> PassSummary {
		Self::drain_and_notify(&self.processor, &self.events, &self.clock).await
	}

	/// Sender for [`EngineMessage`]s; clone freely across instances
	pub fn message_sender(&self) -> mpsc::Sender<EngineMessage> {
		self.message_tx.clone()
	}

	/// Push delivery credentials through the message channel
	pub async fn set_config(&self, url: impl Into<String>, key: impl Into<String>) -> Result<()> {
		self.message_tx
			.send(EngineMessage::SetConfig {
				url: url.into(),
				key: key.into(),
			})
			.await
			.map_err(|_| anyhow!("engine message channel closed"))
	}

	/// Request an immediate draining pass through the message channel
	pub async fn manual_sync(&self) -> Result<()> {
		self.message_tx
			.send(EngineMessage::ManualSync)
			.await
			.map_err(|_| anyhow!("engine message channel closed"))
	}

	/// Subscribe to engine events (completion broadcasts, evictions)
	pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
		self.events.subscribe()
	}

	/// The underlying durable queue
	pub fn queue(&self) -> &Arc<MutationQueue> {
		&self.queue
	}

	/// The engine-owned credential cell
	pub fn credentials(&self) -> &Arc<CredentialStore> {
		&self.credentials
	}

	async fn drain_and_notify(
		processor: &SyncProcessor,
		events: &SyncEventBus,
		clock: &Arc<dyn Clock>,
	) -> PassSummary {
		let summary = processor.run_pass().await;

		if summary.is_fatal() {
			warn!("Draining pass could not run; mutation store unavailable");
		} else {
			info!(
				synced = summary.synced_count,
				failed = summary.failed_count,
				"Draining pass finished"
			);
		}

		events.emit(SyncEvent::SyncComplete {
			success: summary.success,
			synced_count: summary.synced_count,
			failed_count: summary.failed_count,
			timestamp: clock.now(),
		});

		summary
	}

	#[allow(clippy::too_many_arguments)]
	async fn run_loop(
		processor: Arc<SyncProcessor>,
		events: SyncEventBus,
		credentials: Arc<CredentialStore>,
		clock: Arc<dyn Clock>,
		config: SyncConfig,
		mut connectivity: watch::Receiver<bool>,
		drain: Arc<Notify>,
		mut messages: mpsc::Receiver<EngineMessage>,
		mut shutdown_rx: broadcast::Receiver<()>,
		is_running: Arc<AtomicBool>,
	) {
		info!("Mutation sync loop started");

		let mut periodic = config.periodic_interval().map(|period| {
			tokio::time::interval_at(tokio::time::Instant::now() + period, period)
		});
		let mut connectivity_open = true;

		// Drain any backlog left from a previous run if we start online.
		if *connectivity.borrow_and_update() {
			drain.notify_one();
		}

		loop {
			tokio::select! {
				_ = shutdown_rx.recv() => break,

				_ = drain.notified() => {
					debug!(trigger = "enqueue", "Delivery trigger fired");
					Self::drain_and_notify(&processor, &events, &clock).await;
				}

				changed = connectivity.changed(), if connectivity_open => {
					match changed {
						Ok(()) => {
							if *connectivity.borrow_and_update() {
								debug!(trigger = "connectivity-restored", "Delivery trigger fired");
								Self::drain_and_notify(&processor, &events, &clock).await;
							}
						}
						Err(_) => connectivity_open = false,
					}
				}

				message = messages.recv() => match message {
					Some(EngineMessage::SetConfig { url, key }) => {
						credentials.set(DeliveryCredentials { url, key }).await;
						info!("Delivery credentials updated");
					}
					Some(EngineMessage::ManualSync) => {
						debug!(trigger = "manual", "Delivery trigger fired");
						Self::drain_and_notify(&processor, &events, &clock).await;
					}
					None => break,
				},

				_ = Self::tick(&mut periodic) => {
					debug!(trigger = "periodic", "Delivery trigger fired");
					Self::drain_and_notify(&processor, &events, &clock).await;
				}
			}
		}

		is_running.store(false, Ordering::SeqCst);
		info!("Mutation sync loop stopped");
	}

	async fn tick(interval: &mut Option<tokio::time::Interval>) {
		match interval {
			Some(interval) => {
				interval.tick().await;
			}
			None => std::future::pending().await,
		}
	}
}

#[async_trait]
impl Service for SyncEngine {
	fn name(&self) -> &'static str {
		"mutation_sync"
	}

	fn is_running(&self) -> bool {
		self.is_running.load(Ordering::SeqCst)
	}

	async fn start(&self) -> Result<()> {
		if self.is_running.load(Ordering::SeqCst) {
			warn!("Mutation sync service already running");
			return Ok(());
		}

		let Some(messages) = self.message_rx.lock().await.take() else {
			return Err(anyhow!("mutation sync service cannot be restarted"));
		};

		info!("Starting mutation sync service");

		let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
		*self.shutdown_tx.lock().await = Some(shutdown_tx);
		self.is_running.store(true, Ordering::SeqCst);

		tokio::spawn(Self::run_loop(
			self.processor.clone(),
			self.events.clone(),
			self.credentials.clone(),
			self.clock.clone(),
			self.config.clone(),
			self.connectivity.clone(),
			self.drain.clone(),
			messages,
			shutdown_rx,
			self.is_running.clone(),
		));

		Ok(())
	}

	async fn stop(&self) -> Result<()> {
		if !self.is_running.load(Ordering::SeqCst) {
			return Ok(());
		}

		info!("Stopping mutation sync service");

		if let Some(shutdown_tx) = self.shutdown_tx.lock().await.as_ref() {
			let _ = shutdown_tx.send(());
		}

		self.is_running.store(false, Ordering::SeqCst);

		Ok(())
	}
}
