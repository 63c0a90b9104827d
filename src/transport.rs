//! The narrow transport contract the session engine depends on.
//!
//! The wire protocol itself (packet framing, handshakes) is not
//! implemented here; the engine consumes a [`MqttTransport`] as an
//! opaque capability. An adapter over `rumqttc` lives in
//! [`rumqtt`](crate::transport::rumqtt).

use std::time::Duration;

use arcstr::ArcStr;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod rumqtt;

/// Delivery guarantee for a published or subscribed message.
///
/// `AtMostOnce` messages are never retried after a failed send.
#[derive(
	Debug,
	Clone,
	Copy,
	PartialEq,
	Eq,
	PartialOrd,
	Ord,
	Hash,
	Default,
	Serialize,
	Deserialize,
)]
pub enum QualityOfService {
	/// Fire and forget; failed sends are dropped
	AtMostOnce,
	/// Acknowledged delivery
	#[default]
	AtLeastOnce,
	/// Assured single delivery
	ExactlyOnce,
}

/// A subscription pattern plus its requested delivery guarantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter {
	/// Subscription pattern (may include transport wildcards)
	pub topic: ArcStr,
	/// Requested delivery guarantee
	pub qos: QualityOfService,
}

impl TopicFilter {
	/// Creates a filter with the given pattern and QoS.
	pub fn new(topic: impl Into<ArcStr>, qos: QualityOfService) -> Self {
		Self {
			topic: topic.into(),
			qos,
		}
	}
}

impl From<&str> for TopicFilter {
	fn from(topic: &str) -> Self {
		Self::new(topic, QualityOfService::default())
	}
}

/// An outbound application message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
	/// Destination topic
	pub topic: ArcStr,
	/// Raw payload bytes
	pub payload: Bytes,
	/// Delivery guarantee
	pub qos: QualityOfService,
	/// Whether the broker should retain this message
	pub retain: bool,
}

impl OutgoingMessage {
	/// Creates a non-retained message with the default QoS.
	pub fn new(topic: impl Into<ArcStr>, payload: impl Into<Bytes>) -> Self {
		Self {
			topic: topic.into(),
			payload: payload.into(),
			qos: QualityOfService::default(),
			retain: false,
		}
	}

	/// Sets the delivery guarantee.
	pub fn with_qos(mut self, qos: QualityOfService) -> Self {
		self.qos = qos;
		self
	}

	/// Sets the retain flag.
	pub fn with_retain(mut self, retain: bool) -> Self {
		self.retain = retain;
		self
	}
}

/// An inbound application message as delivered by the transport.
///
/// Treated as read-only by the routing engine.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
	/// Topic the message was published to
	pub topic: ArcStr,
	/// Raw payload bytes
	pub payload: Bytes,
	/// Delivery guarantee it was received with
	pub qos: QualityOfService,
	/// Whether this was a retained message
	pub retain: bool,
}

impl ReceivedMessage {
	/// Creates a message with the default QoS and no retain flag.
	pub fn new(topic: impl Into<ArcStr>, payload: impl Into<Bytes>) -> Self {
		Self {
			topic: topic.into(),
			payload: payload.into(),
			qos: QualityOfService::default(),
			retain: false,
		}
	}
}

/// Result of a successful connect.
#[derive(Debug, Clone, Copy)]
pub struct ConnectAck {
	/// True when the broker recovered a prior session, in which case
	/// subscriptions are maintained by the broker and no replay is needed.
	pub session_present: bool,
}

/// Errors surfaced by transport operations.
///
/// All variants are recoverable from the session engine's point of view;
/// they drive retries and notifications, never engine termination.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
	/// The operation did not complete within its bound
	#[error("Transport operation '{operation}' timed out after {millis}ms")]
	Timeout {
		/// Name of the operation that timed out
		operation: &'static str,
		/// The timeout that elapsed
		millis: u64,
	},

	/// The broker refused the connection
	#[error("Broker rejected connection: {reason}")]
	Rejected {
		/// Broker-supplied reason
		reason: String,
	},

	/// Network-level failure
	#[error("Network error: {reason}")]
	Network {
		/// Underlying failure description
		reason: String,
	},

	/// Operation attempted without an established connection
	#[error("Transport is not connected")]
	NotConnected,
}

impl TransportError {
	/// Creates a timeout error for the named operation.
	pub fn timeout(operation: &'static str, timeout: Duration) -> Self {
		Self::Timeout {
			operation,
			millis: timeout.as_millis() as u64,
		}
	}

	/// Creates a network error from any displayable failure.
	pub fn network(reason: impl ToString) -> Self {
		Self::Network {
			reason: reason.to_string(),
		}
	}
}

/// Connect/disconnect/publish/subscribe/unsubscribe against a broker.
///
/// Each operation accepts a bound timeout; implementations must honor it.
/// Inbound message delivery is wired at construction time (see
/// [`rumqtt::RumqttTransport::connect_channel`]) so the routing side can
/// consume messages without the session engine mediating.
#[async_trait]
pub trait MqttTransport: Send + Sync {
	/// Establishes a connection, reporting whether a session was recovered.
	async fn connect(
		&self,
		timeout: Duration,
	) -> Result<ConnectAck, TransportError>;

	/// Gracefully disconnects.
	async fn disconnect(&self, timeout: Duration)
	-> Result<(), TransportError>;

	/// Publishes one application message.
	async fn publish(
		&self,
		message: &OutgoingMessage,
		timeout: Duration,
	) -> Result<(), TransportError>;

	/// Subscribes to a batch of topic filters.
	async fn subscribe(
		&self,
		filters: &[TopicFilter],
		timeout: Duration,
	) -> Result<(), TransportError>;

	/// Unsubscribes from a batch of topics.
	async fn unsubscribe(
		&self,
		topics: &[ArcStr],
		timeout: Duration,
	) -> Result<(), TransportError>;

	/// Current connectivity state.
	fn is_connected(&self) -> bool;
}
