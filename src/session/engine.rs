//! The resilient session engine.
//!
//! One background maintenance loop owns connection health, reconnect
//! backoff and subscription synchronization; a second publish loop
//! drains the pending queue whenever a connection exists. The two loops
//! carry independent cancellation tokens: losing the connection stops
//! only publishing, stopping the session stops both.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use arcstr::ArcStr;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::{
	ConnectingFailedEvent, ConnectionStateChangedEvent,
	MessageProcessedEvent, MessageSkippedEvent, SessionEvents,
	SubscriptionsChangedEvent, SynchronizationFailedEvent,
};
use super::message::QueuedMessage;
use super::options::{OverflowStrategy, SessionOptions};
use super::queue::MessageQueue;
use super::storage::StorageError;
use crate::topic::{
	validate_publish_topic, validate_topic_filter, TopicValidationError,
};
use crate::transport::{
	MqttTransport, OutgoingMessage, QualityOfService, TopicFilter,
	TransportError,
};

/// Result of one connection health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
	/// The connection was already up.
	StillConnected,
	/// A new connection was established without broker session state.
	Reconnected,
	/// A new connection was established and the broker restored the
	/// previous session.
	Recovered,
	/// No connection could be established.
	NotConnected,
}

/// Errors surfaced by the session API.
#[derive(Debug, Error)]
pub enum SessionError {
	/// An operation requires [`start`](ManagedSession::start) first.
	#[error("the session is not started")]
	NotStarted,
	/// The session is already running.
	#[error("the session is already started")]
	AlreadyStarted,
	/// A topic or topic filter failed validation.
	#[error(transparent)]
	InvalidTopic(#[from] TopicValidationError),
	/// Queue persistence failed.
	#[error(transparent)]
	Storage(#[from] StorageError),
	/// The configured options are unusable.
	#[error("invalid session options: {0}")]
	Configuration(String),
}

#[derive(Debug, Default)]
struct PendingSubscriptions {
	additions: HashMap<ArcStr, TopicFilter>,
	removals: HashSet<ArcStr>,
}

#[derive(Debug, Default)]
struct SubscriptionState {
	pending: StdMutex<PendingSubscriptions>,
	signal: Notify,
}

struct SessionShared {
	transport: Arc<dyn MqttTransport>,
	options: SessionOptions,
	events: SessionEvents,
	queue: MessageQueue,
	subscriptions: SubscriptionState,
	publish_cancel: StdMutex<Option<CancellationToken>>,
	clean_disconnect: AtomicBool,
}

/// Resilient pub/sub session over a fallible transport.
///
/// Messages enqueued while disconnected are retained (bounded by
/// [`SessionOptions::max_pending_messages`]) and transmitted once a
/// connection exists; desired subscriptions are restored after every
/// reconnect that lost broker session state.
pub struct ManagedSession {
	shared: Arc<SessionShared>,
	maintenance_cancel: StdMutex<Option<CancellationToken>>,
	maintenance_task: StdMutex<Option<JoinHandle<()>>>,
}

impl ManagedSession {
	/// Creates a session over `transport`. Nothing runs until
	/// [`start`](Self::start).
	pub fn new(
		transport: Arc<dyn MqttTransport>,
		options: SessionOptions,
	) -> Self {
		Self {
			shared: Arc::new(SessionShared {
				transport,
				options,
				events: SessionEvents::default(),
				queue: MessageQueue::new(),
				subscriptions: SubscriptionState::default(),
				publish_cancel: StdMutex::new(None),
				clean_disconnect: AtomicBool::new(false),
			}),
			maintenance_cancel: StdMutex::new(None),
			maintenance_task: StdMutex::new(None),
		}
	}

	/// Observer registration surface.
	pub fn events(&self) -> &SessionEvents {
		&self.shared.events
	}

	/// Whether the maintenance loop is running.
	pub fn is_started(&self) -> bool {
		self.maintenance_cancel.lock().unwrap().is_some()
	}

	/// Whether the underlying transport currently has a connection.
	pub fn is_connected(&self) -> bool {
		self.shared.transport.is_connected()
	}

	/// Number of messages waiting to be published.
	pub async fn pending_message_count(&self) -> usize {
		self.shared.queue.len().await
	}

	/// Starts the maintenance loop.
	///
	/// When storage is configured the persisted queue snapshot is
	/// loaded first, ahead of any new enqueues.
	pub async fn start(&self) -> Result<(), SessionError> {
		validate_options(&self.shared.options)?;

		if self.is_started() {
			return Err(SessionError::AlreadyStarted);
		}

		if let Some(storage) = &self.shared.options.storage {
			let persisted = storage.load_queued_messages().await?;
			if !persisted.is_empty() {
				info!(
					count = persisted.len(),
					"Restored queued messages from storage"
				);
				let mut queue = self.shared.queue.lock().await;
				queue.extend(persisted);
				drop(queue);
				self.shared.queue.notify();
			}
		}

		self.shared
			.clean_disconnect
			.store(false, Ordering::SeqCst);

		let cancel = CancellationToken::new();
		*self.maintenance_cancel.lock().unwrap() = Some(cancel.clone());
		let task = tokio::spawn(maintenance_loop(
			Arc::clone(&self.shared),
			cancel,
		));
		*self.maintenance_task.lock().unwrap() = Some(task);

		info!("Managed session started");
		Ok(())
	}

	/// Stops both loops and waits for the maintenance loop to finish.
	///
	/// With `clean_disconnect` the loop sends a DISCONNECT on its way
	/// out. The in-memory queue is cleared; a persisted snapshot is
	/// left untouched so a later [`start`](Self::start) can restore it.
	pub async fn stop(&self, clean_disconnect: bool) {
		self.shared
			.clean_disconnect
			.store(clean_disconnect, Ordering::SeqCst);

		stop_publishing(&self.shared);

		let cancel = self.maintenance_cancel.lock().unwrap().take();
		if let Some(cancel) = cancel {
			cancel.cancel();
		}

		self.shared.queue.clear().await;

		let task = self.maintenance_task.lock().unwrap().take();
		if let Some(task) = task {
			let _ = task.await;
		}
	}

	/// Queues `message` for publication.
	///
	/// A full queue either rejects the new message or evicts the
	/// oldest, per [`SessionOptions::overflow_strategy`]; either way
	/// the dropped message is reported through the
	/// [`message_skipped`](SessionEvents::message_skipped) observers.
	pub async fn enqueue(
		&self,
		message: OutgoingMessage,
	) -> Result<(), SessionError> {
		if !self.is_started() {
			return Err(SessionError::NotStarted);
		}
		validate_publish_topic(&message.topic)?;

		let queued = QueuedMessage::new(message);
		let mut skipped: Option<QueuedMessage> = None;
		let mut accepted = true;
		let mut storage_result = Ok(());

		{
			let mut queue = self.shared.queue.lock().await;

			if queue.len() >= self.shared.options.max_pending_messages {
				match self.shared.options.overflow_strategy {
					| OverflowStrategy::DropNewMessage => {
						debug!(
							topic = %queued.message.topic,
							"Skipping new message because the queue is full"
						);
						skipped = Some(queued.clone());
						accepted = false;
					}
					| OverflowStrategy::DropOldestQueuedMessage => {
						skipped = queue.pop_front();
						debug!(
							"Removed oldest queued message because the \
							 queue is full"
						);
					}
				}
			}

			// The storage error must not suppress the queue update or
			// the skipped notification for an already evicted message.
			if accepted {
				queue.push_back(queued);
				storage_result = save_snapshot(&self.shared, &queue).await;
			}
		}

		if accepted {
			self.shared.queue.notify();
		}
		if let Some(skipped) = skipped {
			self.shared
				.events
				.message_skipped
				.emit(&MessageSkippedEvent { message: skipped });
		}
		storage_result?;
		Ok(())
	}

	/// Registers desired subscriptions.
	///
	/// The change is pushed to the broker by the maintenance loop;
	/// completion is reported through the
	/// [`subscriptions_changed`](SessionEvents::subscriptions_changed)
	/// observers. A later subscribe for the same topic overrides an
	/// earlier unsubscribe, and vice versa.
	pub fn subscribe(
		&self,
		filters: impl IntoIterator<Item = TopicFilter>,
	) -> Result<(), SessionError> {
		let filters: Vec<TopicFilter> = filters.into_iter().collect();
		for filter in &filters {
			validate_topic_filter(&filter.topic)?;
		}

		{
			let mut pending =
				self.shared.subscriptions.pending.lock().unwrap();
			for filter in filters {
				pending.removals.remove(&filter.topic);
				pending
					.additions
					.insert(filter.topic.clone(), filter);
			}
		}

		self.shared.subscriptions.signal.notify_one();
		Ok(())
	}

	/// Registers desired unsubscriptions.
	pub fn unsubscribe(
		&self,
		topics: impl IntoIterator<Item = ArcStr>,
	) -> Result<(), SessionError> {
		{
			let mut pending =
				self.shared.subscriptions.pending.lock().unwrap();
			for topic in topics {
				pending.additions.remove(&topic);
				pending.removals.insert(topic);
			}
		}

		self.shared.subscriptions.signal.notify_one();
		Ok(())
	}
}

fn validate_options(options: &SessionOptions) -> Result<(), SessionError> {
	if options.max_pending_messages == 0 {
		return Err(SessionError::Configuration(
			"max_pending_messages must be at least 1".into(),
		));
	}
	if options.max_topic_filters_per_packet == 0 {
		return Err(SessionError::Configuration(
			"max_topic_filters_per_packet must be at least 1".into(),
		));
	}
	if options.connection_check_interval.is_zero() {
		return Err(SessionError::Configuration(
			"connection_check_interval must be non-zero".into(),
		));
	}
	Ok(())
}

fn start_publishing(shared: &Arc<SessionShared>) {
	stop_publishing(shared);

	let cancel = CancellationToken::new();
	*shared.publish_cancel.lock().unwrap() = Some(cancel.clone());
	tokio::spawn(publish_loop(Arc::clone(shared), cancel));
}

fn stop_publishing(shared: &SessionShared) {
	let cancel = shared.publish_cancel.lock().unwrap().take();
	if let Some(cancel) = cancel {
		cancel.cancel();
	}
}

async fn maintenance_loop(
	shared: Arc<SessionShared>,
	cancel: CancellationToken,
) {
	// Owned by this task alone: the set of filters to replay after a
	// reconnect that lost broker session state.
	let mut replay_subscriptions: HashMap<ArcStr, TopicFilter> =
		HashMap::new();

	while !cancel.is_cancelled() {
		maintain_once(&shared, &cancel, &mut replay_subscriptions).await;
	}

	if shared.clean_disconnect.load(Ordering::SeqCst) {
		let timeout = shared.options.operation_timeout;
		if let Err(error) = shared.transport.disconnect(timeout).await {
			warn!(error = %error, "Error while disconnecting");
		}
	}

	{
		let mut pending = shared.subscriptions.pending.lock().unwrap();
		pending.additions.clear();
		pending.removals.clear();
	}

	info!("Managed session stopped");
}

async fn maintain_once(
	shared: &Arc<SessionShared>,
	cancel: &CancellationToken,
	replay_subscriptions: &mut HashMap<ArcStr, TopicFilter>,
) {
	let old_connected = shared.transport.is_connected();
	let outcome = reconnect_if_required(shared).await;

	match outcome {
		| ConnectionOutcome::NotConnected => {
			stop_publishing(shared);
			tokio::select! {
				_ = cancel.cancelled() => {}
				_ = sleep(shared.options.auto_reconnect_delay) => {}
			}
		}
		| ConnectionOutcome::Reconnected => {
			publish_replay_subscriptions(shared, replay_subscriptions)
				.await;
			start_publishing(shared);
		}
		| ConnectionOutcome::Recovered => {
			start_publishing(shared);
		}
		| ConnectionOutcome::StillConnected => {
			publish_pending_subscriptions(
				shared,
				cancel,
				replay_subscriptions,
			)
			.await;
		}
	}

	if old_connected != shared.transport.is_connected() {
		shared.events.connection_state_changed.emit(
			&ConnectionStateChangedEvent {
				connected: shared.transport.is_connected(),
			},
		);
	}
}

async fn reconnect_if_required(
	shared: &SessionShared,
) -> ConnectionOutcome {
	if shared.transport.is_connected() {
		return ConnectionOutcome::StillConnected;
	}

	match shared
		.transport
		.connect(shared.options.operation_timeout)
		.await
	{
		| Ok(ack) if ack.session_present => ConnectionOutcome::Recovered,
		| Ok(_) => ConnectionOutcome::Reconnected,
		| Err(error) => {
			warn!(error = %error, "Connecting failed");
			shared
				.events
				.connecting_failed
				.emit(&ConnectingFailedEvent { error });
			ConnectionOutcome::NotConnected
		}
	}
}

/// Restores the replay set after a reconnect without session state.
async fn publish_replay_subscriptions(
	shared: &SessionShared,
	replay_subscriptions: &HashMap<ArcStr, TopicFilter>,
) {
	if replay_subscriptions.is_empty() {
		return;
	}

	info!(
		count = replay_subscriptions.len(),
		"Publishing subscriptions at reconnect"
	);

	let filters: Vec<TopicFilter> =
		replay_subscriptions.values().cloned().collect();
	for chunk in filters.chunks(shared.options.max_topic_filters_per_packet)
	{
		match shared
			.transport
			.subscribe(chunk, shared.options.operation_timeout)
			.await
		{
			| Ok(()) => {
				shared.events.subscriptions_changed.emit(
					&SubscriptionsChangedEvent {
						subscribed: chunk.to_vec(),
						unsubscribed: Vec::new(),
					},
				);
			}
			| Err(error) => {
				warn!(error = %error, "Synchronizing subscriptions failed");
				shared.events.synchronization_failed.emit(
					&SynchronizationFailedEvent {
						error,
						attempted_subscriptions: chunk.to_vec(),
						attempted_unsubscriptions: Vec::new(),
					},
				);
				return;
			}
		}
	}
}

/// Waits out one check interval, pushing queued subscription changes
/// as they arrive.
async fn publish_pending_subscriptions(
	shared: &SessionShared,
	cancel: &CancellationToken,
	replay_subscriptions: &mut HashMap<ArcStr, TopicFilter>,
) {
	let deadline = Instant::now() + shared.options.connection_check_interval;

	loop {
		let signaled = tokio::select! {
			_ = cancel.cancelled() => return,
			result = tokio::time::timeout_at(
				deadline,
				shared.subscriptions.signal.notified(),
			) => result.is_ok(),
		};
		if !signaled {
			return;
		}

		let (additions, removals) = {
			let mut pending =
				shared.subscriptions.pending.lock().unwrap();
			(
				std::mem::take(&mut pending.additions),
				std::mem::take(&mut pending.removals),
			)
		};

		if additions.is_empty() && removals.is_empty() {
			continue;
		}

		debug!(
			added = additions.len(),
			removed = removals.len(),
			"Publishing subscription changes"
		);

		for topic in &removals {
			replay_subscriptions.remove(topic);
		}
		for (topic, filter) in &additions {
			replay_subscriptions.insert(topic.clone(), filter.clone());
		}

		let added: Vec<TopicFilter> = additions.into_values().collect();
		for chunk in
			added.chunks(shared.options.max_topic_filters_per_packet)
		{
			match shared
				.transport
				.subscribe(chunk, shared.options.operation_timeout)
				.await
			{
				| Ok(()) => {
					shared.events.subscriptions_changed.emit(
						&SubscriptionsChangedEvent {
							subscribed: chunk.to_vec(),
							unsubscribed: Vec::new(),
						},
					);
				}
				| Err(error) => {
					warn!(error = %error, "Synchronizing subscriptions failed");
					shared.events.synchronization_failed.emit(
						&SynchronizationFailedEvent {
							error,
							attempted_subscriptions: chunk.to_vec(),
							attempted_unsubscriptions: Vec::new(),
						},
					);
					return;
				}
			}
		}

		let removed: Vec<ArcStr> = removals.into_iter().collect();
		for chunk in
			removed.chunks(shared.options.max_topic_filters_per_packet)
		{
			match shared
				.transport
				.unsubscribe(chunk, shared.options.operation_timeout)
				.await
			{
				| Ok(()) => {
					shared.events.subscriptions_changed.emit(
						&SubscriptionsChangedEvent {
							subscribed: Vec::new(),
							unsubscribed: chunk.to_vec(),
						},
					);
				}
				| Err(error) => {
					warn!(error = %error, "Synchronizing subscriptions failed");
					shared.events.synchronization_failed.emit(
						&SynchronizationFailedEvent {
							error,
							attempted_subscriptions: Vec::new(),
							attempted_unsubscriptions: chunk.to_vec(),
						},
					);
					return;
				}
			}
		}
	}
}

async fn publish_loop(
	shared: Arc<SessionShared>,
	cancel: CancellationToken,
) {
	while !cancel.is_cancelled() && shared.transport.is_connected() {
		let Some(message) = shared.queue.peek_and_wait(&cancel).await
		else {
			break;
		};

		try_publish_queued_message(&shared, message).await;
	}

	debug!("Stopped publishing messages");
}

async fn try_publish_queued_message(
	shared: &SessionShared,
	message: QueuedMessage,
) {
	let mut transmit_error: Option<TransportError> = None;

	let publish_result = if shared.events.allow_publish(&message) {
		shared
			.transport
			.publish(&message.message, shared.options.operation_timeout)
			.await
	} else {
		debug!(
			message_id = %message.id,
			"Publish vetoed by interceptor"
		);
		Ok(())
	};

	match publish_result {
		| Ok(()) => {
			remove_from_queue(shared, &message).await;
		}
		| Err(error) => {
			warn!(
				message_id = %message.id,
				error = %error,
				"Publishing queued message failed"
			);

			// Fire-and-forget delivery is never retried.
			if message.message.qos == QualityOfService::AtMostOnce {
				remove_from_queue(shared, &message).await;
			}
			transmit_error = Some(error);
		}
	}

	shared
		.events
		.message_processed
		.emit(&MessageProcessedEvent { message, error: transmit_error });
}

/// Removes `message` from the queue front, if it is still there.
///
/// While the publish loop held a clone, an enqueue under the
/// drop-oldest strategy may already have evicted it; in that case
/// nothing is removed and the stored snapshot is already current.
async fn remove_from_queue(shared: &SessionShared, message: &QueuedMessage) {
	let mut queue = shared.queue.lock().await;
	if queue.front().is_some_and(|front| front.id == message.id) {
		queue.pop_front();
		if let Err(error) = save_snapshot(shared, &queue).await {
			warn!(error = %error, "Persisting queued messages failed");
		}
	}
}

async fn save_snapshot(
	shared: &SessionShared,
	queue: &VecDeque<QueuedMessage>,
) -> Result<(), StorageError> {
	if let Some(storage) = &shared.options.storage {
		let snapshot: Vec<QueuedMessage> =
			queue.iter().cloned().collect();
		storage.save_queued_messages(&snapshot).await?;
	}
	Ok(())
}
