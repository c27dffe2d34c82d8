//! Moneta core
//!
//! Engine-side core of the Moneta personal finance app. The centerpiece is
//! the offline mutation synchronization engine: a durable, at-least-once
//! delivery queue that captures user writes while the client is
//! disconnected and replays them against the backend once connectivity
//! returns, with bounded retries, exponential backoff, and poison-message
//! eviction.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod infra;
pub mod service;
pub mod sync;

pub use infra::db::Db;
pub use infra::event::{SyncEvent, SyncEventBus};
pub use service::Service;
pub use sync::{
	EngineMessage, MutationAction, MutationCategory, MutationQueue, MutationRecord, PassSummary,
	SyncConfig, SyncEngine,
};

/// Install the default tracing subscriber
///
/// Intended for binaries and examples; tests and embedding applications
/// that bring their own subscriber should skip this. Safe to call more
/// than once.
pub fn init_logging() {
	let _ = tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with(fmt::layer())
		.try_init();
}
