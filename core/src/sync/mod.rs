//! Offline mutation synchronization
//!
//! User writes captured while the client is disconnected are persisted in a
//! durable queue and replayed against the backend when a delivery trigger
//! fires: connectivity restored, a periodic timer, or an explicit manual
//! request. Delivery is at-least-once with bounded retries, exponential
//! backoff, and eviction of poison messages; the engine never reorders,
//! coalesces, or conflict-resolves mutations.

pub mod backoff;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod processor;
pub mod queue;
pub mod transport;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::SyncConfig;
pub use credentials::{CredentialStore, DeliveryCredentials};
pub use engine::{EngineMessage, SyncEngine};
pub use processor::{PassSummary, SyncProcessor};
pub use queue::{
	MutationAction, MutationCategory, MutationQueue, MutationRecord, NewMutation, QueueError,
};
pub use transport::{DeliveryError, DeliveryTransport, HttpTransport};
