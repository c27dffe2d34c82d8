//! Scriptable delivery transport for sync integration tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moneta_core::sync::{DeliveryCredentials, DeliveryError, DeliveryTransport, MutationRecord};
use reqwest::StatusCode;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One recorded delivery attempt
#[derive(Debug, Clone)]
pub struct AttemptLog {
	pub id: Uuid,
	pub endpoint: String,
	/// Credential key presented with the attempt
	pub key: String,
}

/// Fake transport with per-endpoint scripted failures
///
/// Succeeds by default; endpoints registered via [`fail_endpoint`] fail
/// with the given status until cleared. Records every attempt in order and
/// tracks how many deliveries were ever in flight at once so tests can
/// assert the single-flight guarantee.
///
/// [`fail_endpoint`]: FakeTransport::fail_endpoint
pub struct FakeTransport {
	failures: Mutex<HashMap<String, u16>>,
	attempts: Mutex<Vec<AttemptLog>>,
	delay: Mutex<Option<Duration>>,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
}

impl FakeTransport {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			failures: Mutex::new(HashMap::new()),
			attempts: Mutex::new(Vec::new()),
			delay: Mutex::new(None),
			in_flight: AtomicUsize::new(0),
			max_in_flight: AtomicUsize::new(0),
		})
	}

	/// Make every delivery to `endpoint` fail with `status`
	pub async fn fail_endpoint(&self, endpoint: &str, status: u16) {
		self.failures
			.lock()
			.await
			.insert(endpoint.to_string(), status);
	}

	/// Let deliveries to `endpoint` succeed again
	pub async fn clear_endpoint(&self, endpoint: &str) {
		self.failures.lock().await.remove(endpoint);
	}

	/// Add artificial latency to every delivery attempt
	pub async fn set_delay(&self, delay: Duration) {
		*self.delay.lock().await = Some(delay);
	}

	/// All attempts so far, in the order they were made
	pub async fn attempts(&self) -> Vec<AttemptLog> {
		self.attempts.lock().await.clone()
	}

	pub async fn attempt_count(&self) -> usize {
		self.attempts.lock().await.len()
	}

	/// Attempts made against a single endpoint
	pub async fn attempts_for(&self, endpoint: &str) -> usize {
		self.attempts
			.lock()
			.await
			.iter()
			.filter(|attempt| attempt.endpoint == endpoint)
			.count()
	}

	/// Highest number of concurrently in-flight deliveries observed
	pub fn max_in_flight(&self) -> usize {
		self.max_in_flight.load(Ordering::SeqCst)
	}
}

#[async_trait::async_trait]
impl DeliveryTransport for FakeTransport {
	async fn deliver(
		&self,
		record: &MutationRecord,
		credentials: &DeliveryCredentials,
	) -> Result<(), DeliveryError> {
		let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
		self.max_in_flight.fetch_max(current, Ordering::SeqCst);

		let delay = *self.delay.lock().await;
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		self.attempts.lock().await.push(AttemptLog {
			id: record.id,
			endpoint: record.endpoint.clone(),
			key: credentials.key.clone(),
		});

		let outcome = self
			.failures
			.lock()
			.await
			.get(&record.endpoint)
			.map(|status| StatusCode::from_u16(*status).expect("valid status code"));

		self.in_flight.fetch_sub(1, Ordering::SeqCst);

		match outcome {
			Some(status) => Err(DeliveryError::Status(status)),
			None => Ok(()),
		}
	}
}
