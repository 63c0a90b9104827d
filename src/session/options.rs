//! Session engine configuration.

use std::sync::Arc;
use std::time::Duration;

use super::storage::SessionStorage;

/// What to do when the pending queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowStrategy {
	/// Reject the message being enqueued.
	#[default]
	DropNewMessage,
	/// Evict the oldest queued message to make room.
	DropOldestQueuedMessage,
}

/// Tunables for [`ManagedSession`](super::engine::ManagedSession).
#[derive(Clone)]
pub struct SessionOptions {
	/// Maximum number of messages held in the pending queue.
	pub max_pending_messages: usize,
	/// Behavior when the pending queue is full.
	pub overflow_strategy: OverflowStrategy,
	/// Timeout applied to every transport operation.
	pub operation_timeout: Duration,
	/// Delay between reconnection attempts.
	pub auto_reconnect_delay: Duration,
	/// How often the maintenance loop re-checks connection health and
	/// pending subscription work.
	pub connection_check_interval: Duration,
	/// Maximum topic filters sent in one SUBSCRIBE or UNSUBSCRIBE
	/// packet.
	pub max_topic_filters_per_packet: usize,
	/// Optional persistence for the pending queue.
	pub storage: Option<Arc<dyn SessionStorage>>,
}

impl SessionOptions {
	/// Caps the pending queue.
	pub fn with_max_pending_messages(mut self, max: usize) -> Self {
		self.max_pending_messages = max;
		self
	}

	/// Sets the overflow strategy.
	pub fn with_overflow_strategy(
		mut self,
		strategy: OverflowStrategy,
	) -> Self {
		self.overflow_strategy = strategy;
		self
	}

	/// Sets the per-operation transport timeout.
	pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
		self.operation_timeout = timeout;
		self
	}

	/// Sets the delay between reconnection attempts.
	pub fn with_auto_reconnect_delay(mut self, delay: Duration) -> Self {
		self.auto_reconnect_delay = delay;
		self
	}

	/// Sets the maintenance loop polling interval.
	pub fn with_connection_check_interval(
		mut self,
		interval: Duration,
	) -> Self {
		self.connection_check_interval = interval;
		self
	}

	/// Sets the SUBSCRIBE/UNSUBSCRIBE batch size.
	pub fn with_max_topic_filters_per_packet(mut self, max: usize) -> Self {
		self.max_topic_filters_per_packet = max;
		self
	}

	/// Installs queue persistence.
	pub fn with_storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
		self.storage = Some(storage);
		self
	}
}

impl Default for SessionOptions {
	fn default() -> Self {
		Self {
			max_pending_messages: usize::MAX,
			overflow_strategy: OverflowStrategy::default(),
			operation_timeout: Duration::from_secs(10),
			auto_reconnect_delay: Duration::from_secs(5),
			connection_check_interval: Duration::from_secs(1),
			max_topic_filters_per_packet: 10,
			storage: None,
		}
	}
}

impl std::fmt::Debug for SessionOptions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionOptions")
			.field("max_pending_messages", &self.max_pending_messages)
			.field("overflow_strategy", &self.overflow_strategy)
			.field("operation_timeout", &self.operation_timeout)
			.field("auto_reconnect_delay", &self.auto_reconnect_delay)
			.field(
				"connection_check_interval",
				&self.connection_check_interval,
			)
			.field(
				"max_topic_filters_per_packet",
				&self.max_topic_filters_per_packet,
			)
			.field("storage", &self.storage.is_some())
			.finish()
	}
}
