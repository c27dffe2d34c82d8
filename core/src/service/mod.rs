//! Background service lifecycle

use anyhow::Result;

/// Trait for background services
#[async_trait::async_trait]
pub trait Service: Send + Sync {
	/// Service name for logging
	fn name(&self) -> &'static str;

	/// Whether the service is currently running
	fn is_running(&self) -> bool;

	/// Start the service
	async fn start(&self) -> Result<()>;

	/// Stop the service gracefully
	async fn stop(&self) -> Result<()>;
}
