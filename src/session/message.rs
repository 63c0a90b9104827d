//! Queued message envelope.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transport::OutgoingMessage;

/// An outgoing message plus the identity it keeps while queued.
///
/// The id survives persistence round-trips so the publish loop can
/// remove exactly the message it transmitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedMessage {
	/// Stable identity of this queue entry.
	pub id: Uuid,
	/// The message to publish.
	pub message: OutgoingMessage,
}

impl QueuedMessage {
	/// Wraps `message` with a fresh id.
	pub fn new(message: OutgoingMessage) -> Self {
		Self { id: Uuid::new_v4(), message }
	}
}
