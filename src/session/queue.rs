//! Pending message queue shared by the enqueue path and the publish
//! loop.

use std::collections::VecDeque;

use tokio::sync::{Mutex, MutexGuard, Notify};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::message::QueuedMessage;

/// FIFO of messages awaiting publication.
///
/// Composite operations (capacity checks, eviction plus append,
/// persistence snapshots) run under a single guard obtained from
/// [`lock`](Self::lock); the queue itself only provides the primitives.
#[derive(Debug, Default)]
pub struct MessageQueue {
	inner: Mutex<VecDeque<QueuedMessage>>,
	notify: Notify,
}

impl MessageQueue {
	/// Creates an empty queue.
	pub fn new() -> Self {
		Self::default()
	}

	/// Locks the queue for a composite operation.
	pub async fn lock(&self) -> MutexGuard<'_, VecDeque<QueuedMessage>> {
		self.inner.lock().await
	}

	/// Wakes the publish loop after an enqueue.
	pub fn notify(&self) {
		self.notify.notify_one();
	}

	/// Returns a clone of the front message, waiting for one to arrive.
	///
	/// Returns `None` once `cancel` fires. The stored-permit semantics
	/// of `Notify` cover a message enqueued between the emptiness check
	/// and the wait.
	pub async fn peek_and_wait(
		&self,
		cancel: &CancellationToken,
	) -> Option<QueuedMessage> {
		loop {
			if let Some(front) = self.inner.lock().await.front() {
				return Some(front.clone());
			}

			tokio::select! {
				_ = cancel.cancelled() => return None,
				_ = self.notify.notified() => {}
			}
		}
	}

	/// Removes the front message if it still carries `id`.
	///
	/// The front may have been evicted and replaced while the publish
	/// loop held a clone; in that case nothing is removed.
	pub async fn remove_if_front(&self, id: Uuid) -> bool {
		let mut queue = self.inner.lock().await;
		if queue.front().is_some_and(|front| front.id == id) {
			queue.pop_front();
			true
		} else {
			false
		}
	}

	/// Number of pending messages.
	pub async fn len(&self) -> usize {
		self.inner.lock().await.len()
	}

	/// Drops all pending messages.
	pub async fn clear(&self) {
		self.inner.lock().await.clear();
	}
}
