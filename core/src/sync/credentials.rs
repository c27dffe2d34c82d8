//! Delivery credential cell
//!
//! The engine has no credential store of its own; a live application
//! instance pushes the short-lived backend credentials over the engine
//! message channel, and the processor reads the cell at each delivery
//! attempt. Last writer wins, so a rotation mid-pass takes effect on the
//! very next record.

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Backend base URL and bearer key for mutation delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCredentials {
	pub url: String,
	pub key: String,
}

/// Guarded, engine-owned holder for the current credentials
///
/// Empty until the first push; delivery attempts made before that fail with
/// a missing-credentials error and follow the normal retry path.
#[derive(Debug, Default)]
pub struct CredentialStore {
	inner: RwLock<Option<DeliveryCredentials>>,
}

impl CredentialStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replace the held credentials (last writer wins)
	pub async fn set(&self, credentials: DeliveryCredentials) {
		*self.inner.write().await = Some(credentials);
	}

	/// Snapshot the current credentials, if any have been pushed
	pub async fn get(&self) -> Option<DeliveryCredentials> {
		self.inner.read().await.clone()
	}
}
