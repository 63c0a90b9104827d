//! Queue persistence.
//!
//! The engine snapshots the whole pending queue after every mutation;
//! implementations only need to store and return the latest snapshot.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use super::message::QueuedMessage;

/// A persistence operation failed.
#[derive(Debug, Error)]
#[error("session storage error: {reason}")]
pub struct StorageError {
	reason: String,
	#[source]
	source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
	/// Creates an error from a plain reason.
	pub fn new(reason: impl Into<String>) -> Self {
		Self { reason: reason.into(), source: None }
	}

	/// Creates an error wrapping an underlying cause.
	pub fn with_source(
		reason: impl Into<String>,
		source: impl std::error::Error + Send + Sync + 'static,
	) -> Self {
		Self {
			reason: reason.into(),
			source: Some(Box::new(source)),
		}
	}
}

/// Durable storage for the pending message queue.
#[async_trait]
pub trait SessionStorage: Send + Sync {
	/// Returns the last saved queue snapshot, oldest first.
	async fn load_queued_messages(
		&self,
	) -> Result<Vec<QueuedMessage>, StorageError>;

	/// Replaces the stored snapshot with `messages`.
	async fn save_queued_messages(
		&self,
		messages: &[QueuedMessage],
	) -> Result<(), StorageError>;
}

/// Keeps the snapshot in process memory.
///
/// Useful in tests and as a template for real implementations; the
/// snapshot does not survive a restart.
#[derive(Debug, Default)]
pub struct InMemorySessionStorage {
	messages: Mutex<Vec<QueuedMessage>>,
}

impl InMemorySessionStorage {
	/// Creates empty storage.
	pub fn new() -> Self {
		Self::default()
	}

	/// Current snapshot contents.
	pub async fn snapshot(&self) -> Vec<QueuedMessage> {
		self.messages.lock().await.clone()
	}
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
	async fn load_queued_messages(
		&self,
	) -> Result<Vec<QueuedMessage>, StorageError> {
		Ok(self.messages.lock().await.clone())
	}

	async fn save_queued_messages(
		&self,
		messages: &[QueuedMessage],
	) -> Result<(), StorageError> {
		*self.messages.lock().await = messages.to_vec();
		Ok(())
	}
}
