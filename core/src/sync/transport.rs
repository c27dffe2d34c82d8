//! Mutation delivery transport
//!
//! The drain algorithm only depends on the [`DeliveryTransport`] trait;
//! production uses the HTTP implementation while tests script outcomes
//! through a fake.

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::sync::credentials::DeliveryCredentials;
use crate::sync::queue::{MutationAction, MutationRecord};

/// A single delivery attempt failure
///
/// Every variant is recoverable: the processor converts it into a retry
/// count bump (or eviction) and the pass continues.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
	#[error("no delivery credentials have been pushed")]
	MissingCredentials,

	#[error("cannot resolve endpoint '{0}' without a base url")]
	InvalidEndpoint(String),

	#[error("transport error: {0}")]
	Transport(#[from] reqwest::Error),

	#[error("remote responded with {0}")]
	Status(StatusCode),
}

/// Delivers one mutation to the remote backend
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
	async fn deliver(
		&self,
		record: &MutationRecord,
		credentials: &DeliveryCredentials,
	) -> Result<(), DeliveryError>;
}

/// HTTP(S) delivery via reqwest
///
/// The verb follows the record's action (create POST, update PATCH, delete
/// DELETE); the payload is sent as a JSON body except for deletes, and the
/// credential key rides in a bearer authorization header.
pub struct HttpTransport {
	client: reqwest::Client,
}

impl HttpTransport {
	pub fn new() -> Self {
		Self {
			client: reqwest::Client::new(),
		}
	}
}

impl Default for HttpTransport {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl DeliveryTransport for HttpTransport {
	async fn deliver(
		&self,
		record: &MutationRecord,
		credentials: &DeliveryCredentials,
	) -> Result<(), DeliveryError> {
		let url = resolve_url(&credentials.url, &record.endpoint)?;

		let request = match record.action {
			MutationAction::Create => self.client.post(&url).json(&record.payload),
			MutationAction::Update => self.client.patch(&url).json(&record.payload),
			MutationAction::Delete => self.client.delete(&url),
		};

		let response = request.bearer_auth(&credentials.key).send().await?;

		if response.status().is_success() {
			Ok(())
		} else {
			Err(DeliveryError::Status(response.status()))
		}
	}
}

/// Resolve a record endpoint against the credential base URL
///
/// Absolute endpoints are used verbatim; relative ones are joined onto the
/// base with duplicate slashes trimmed.
fn resolve_url(base: &str, endpoint: &str) -> Result<String, DeliveryError> {
	if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
		return Ok(endpoint.to_string());
	}

	if base.is_empty() {
		return Err(DeliveryError::InvalidEndpoint(endpoint.to_string()));
	}

	Ok(format!(
		"{}/{}",
		base.trim_end_matches('/'),
		endpoint.trim_start_matches('/')
	))
}
