//! Session lifecycle notifications.
//!
//! Observers register synchronous callbacks; the engine invokes them in
//! registration order from its background loops, so callbacks must be
//! quick and must not block.

use std::sync::{Arc, Mutex};

use arcstr::ArcStr;

use super::message::QueuedMessage;
use crate::transport::{TopicFilter, TransportError};

/// A connection attempt failed.
#[derive(Debug, Clone)]
pub struct ConnectingFailedEvent {
	/// Why the attempt failed.
	pub error: TransportError,
}

/// The observed connection state flipped.
#[derive(Debug, Clone)]
pub struct ConnectionStateChangedEvent {
	/// New state.
	pub connected: bool,
}

/// A batch of subscription changes reached the broker.
#[derive(Debug, Clone)]
pub struct SubscriptionsChangedEvent {
	/// Filters subscribed in this batch.
	pub subscribed: Vec<TopicFilter>,
	/// Topics unsubscribed in this batch.
	pub unsubscribed: Vec<ArcStr>,
}

/// Pushing subscription changes to the broker failed.
#[derive(Debug, Clone)]
pub struct SynchronizationFailedEvent {
	/// The transport failure.
	pub error: TransportError,
	/// Subscriptions that were being pushed.
	pub attempted_subscriptions: Vec<TopicFilter>,
	/// Unsubscriptions that were being pushed.
	pub attempted_unsubscriptions: Vec<ArcStr>,
}

/// A queued message finished a publish attempt.
#[derive(Debug, Clone)]
pub struct MessageProcessedEvent {
	/// The message that was attempted.
	pub message: QueuedMessage,
	/// The transmit failure, if the attempt did not succeed.
	pub error: Option<TransportError>,
}

/// A queued message was dropped without being published.
#[derive(Debug, Clone)]
pub struct MessageSkippedEvent {
	/// The dropped message.
	pub message: QueuedMessage,
}

/// Ordered list of observers for one event type.
pub struct Listeners<E> {
	callbacks: Mutex<Vec<Arc<dyn Fn(&E) + Send + Sync>>>,
}

impl<E> Listeners<E> {
	fn new() -> Self {
		Self { callbacks: Mutex::new(Vec::new()) }
	}

	/// Appends an observer.
	pub fn add<F>(&self, callback: F)
	where
		F: Fn(&E) + Send + Sync + 'static,
	{
		self.callbacks.lock().unwrap().push(Arc::new(callback));
	}

	/// Invokes every observer in registration order.
	pub fn emit(&self, event: &E) {
		let callbacks = self.callbacks.lock().unwrap().clone();
		for callback in callbacks {
			callback(event);
		}
	}
}

impl<E> Default for Listeners<E> {
	fn default() -> Self {
		Self::new()
	}
}

impl<E> std::fmt::Debug for Listeners<E> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let count = self.callbacks.lock().unwrap().len();
		f.debug_struct("Listeners").field("count", &count).finish()
	}
}

/// Decides whether a dequeued message may be transmitted.
pub type PublishInterceptor = dyn Fn(&QueuedMessage) -> bool + Send + Sync;

/// All observer slots of one session.
#[derive(Default)]
pub struct SessionEvents {
	/// Connection attempts that failed.
	pub connecting_failed: Listeners<ConnectingFailedEvent>,
	/// Connection state transitions.
	pub connection_state_changed: Listeners<ConnectionStateChangedEvent>,
	/// Acknowledged subscription batches.
	pub subscriptions_changed: Listeners<SubscriptionsChangedEvent>,
	/// Failed subscription synchronization attempts.
	pub synchronization_failed: Listeners<SynchronizationFailedEvent>,
	/// Completed publish attempts.
	pub message_processed: Listeners<MessageProcessedEvent>,
	/// Messages dropped without transmission.
	pub message_skipped: Listeners<MessageSkippedEvent>,
	interceptor: Mutex<Option<Arc<PublishInterceptor>>>,
}

impl SessionEvents {
	/// Installs the publish interceptor; the previous one is replaced.
	pub fn set_publish_interceptor<F>(&self, interceptor: F)
	where
		F: Fn(&QueuedMessage) -> bool + Send + Sync + 'static,
	{
		*self.interceptor.lock().unwrap() = Some(Arc::new(interceptor));
	}

	/// Asks the interceptor whether `message` may be transmitted.
	///
	/// Without an interceptor every message is allowed.
	pub fn allow_publish(&self, message: &QueuedMessage) -> bool {
		let interceptor = self.interceptor.lock().unwrap().clone();
		match interceptor {
			| Some(decide) => decide(message),
			| None => true,
		}
	}
}

impl std::fmt::Debug for SessionEvents {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionEvents")
			.field("connecting_failed", &self.connecting_failed)
			.field(
				"connection_state_changed",
				&self.connection_state_changed,
			)
			.field("subscriptions_changed", &self.subscriptions_changed)
			.field("synchronization_failed", &self.synchronization_failed)
			.field("message_processed", &self.message_processed)
			.field("message_skipped", &self.message_skipped)
			.finish_non_exhaustive()
	}
}
