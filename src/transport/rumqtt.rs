//! `rumqttc`-backed implementation of the transport contract.
//!
//! Each successful [`connect`](MqttTransport::connect) builds a fresh
//! `AsyncClient`/`EventLoop` pair, waits for the broker's CONNACK, then
//! drives the event loop on a background task that forwards inbound
//! publishes to the channel handed out at construction. The event loop
//! terminates on any network error or DISCONNECT; reconnection is the
//! session engine's job, not this adapter's.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arcstr::ArcStr;
use async_trait::async_trait;
use rumqttc::Packet::{self, Disconnect, Publish};
use rumqttc::{
	AsyncClient, ConnAck, ConnectReturnCode, EventLoop, MqttOptions,
	SubscribeFilter,
};
use rumqttc::{Event::Incoming, Event::Outgoing};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{
	ConnectAck, MqttTransport, OutgoingMessage, QualityOfService,
	ReceivedMessage, TopicFilter, TransportError,
};

fn to_rumqttc_qos(qos: QualityOfService) -> rumqttc::QoS {
	match qos {
		| QualityOfService::AtMostOnce => rumqttc::QoS::AtMostOnce,
		| QualityOfService::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
		| QualityOfService::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
	}
}

fn from_rumqttc_qos(qos: rumqttc::QoS) -> QualityOfService {
	match qos {
		| rumqttc::QoS::AtMostOnce => QualityOfService::AtMostOnce,
		| rumqttc::QoS::AtLeastOnce => QualityOfService::AtLeastOnce,
		| rumqttc::QoS::ExactlyOnce => QualityOfService::ExactlyOnce,
	}
}

/// Transport adapter over `rumqttc`.
pub struct RumqttTransport {
	options: MqttOptions,
	event_loop_capacity: usize,
	client: Mutex<Option<AsyncClient>>,
	connected: Arc<AtomicBool>,
	inbound_tx: mpsc::Sender<ReceivedMessage>,
}

impl RumqttTransport {
	/// Creates the adapter plus the channel inbound publishes arrive on.
	///
	/// The receiver side is typically fed into
	/// [`Router::run`](crate::router::dispatcher::Router::run).
	pub fn connect_channel(
		options: MqttOptions,
		event_loop_capacity: usize,
		inbound_capacity: usize,
	) -> (Arc<Self>, mpsc::Receiver<ReceivedMessage>) {
		let (inbound_tx, inbound_rx) = mpsc::channel(inbound_capacity);
		let transport = Arc::new(Self {
			options,
			event_loop_capacity,
			client: Mutex::new(None),
			connected: Arc::new(AtomicBool::new(false)),
			inbound_tx,
		});
		(transport, inbound_rx)
	}

	fn current_client(&self) -> Result<AsyncClient, TransportError> {
		self.client
			.lock()
			.unwrap()
			.clone()
			.ok_or(TransportError::NotConnected)
	}

	async fn establish_connection(
		mut event_loop: EventLoop,
	) -> Result<(EventLoop, bool), TransportError> {
		loop {
			match event_loop.poll().await {
				| Ok(Incoming(Packet::ConnAck(ConnAck {
					code,
					session_present,
				}))) => {
					if code == ConnectReturnCode::Success {
						debug!(
							session_present,
							"MQTT connection established"
						);
						return Ok((event_loop, session_present));
					}
					debug!(code = ?code, "MQTT connection rejected by broker");
					return Err(TransportError::Rejected {
						reason: format!("{code:?}"),
					});
				}
				| Ok(notification) => {
					debug!(notification = ?notification, "Bootstrap phase notification");
				}
				| Err(connection_err) => {
					debug!(error = %connection_err, "Connection error during bootstrap phase");
					return Err(TransportError::network(connection_err));
				}
			}
		}
	}

	/// Event loop task: forwards publishes until disconnect or error.
	async fn run(
		mut event_loop: EventLoop,
		inbound_tx: mpsc::Sender<ReceivedMessage>,
		connected: Arc<AtomicBool>,
	) {
		loop {
			match event_loop.poll().await {
				| Ok(Incoming(Publish(publish))) => {
					debug!(
						topic = %publish.topic,
						payload_size = publish.payload.len(),
						"Received MQTT message"
					);
					let message = ReceivedMessage {
						topic: ArcStr::from(publish.topic.as_str()),
						payload: publish.payload,
						qos: from_rumqttc_qos(publish.qos),
						retain: publish.retain,
					};
					if inbound_tx.send(message).await.is_err() {
						warn!(
							"Inbound message channel closed, stopping event \
							 loop"
						);
						break;
					}
				}
				| Ok(Incoming(Disconnect)) => {
					info!("Received MQTT Disconnect packet from server");
					break;
				}
				| Ok(Outgoing(rumqttc::Outgoing::Disconnect)) => {
					info!("Sent MQTT Disconnect packet to server");
					break;
				}
				| Ok(notification) => {
					debug!(notification = ?notification, "MQTT notification");
				}
				| Err(err) => {
					// Hand reconnection back to the session engine instead
					// of letting rumqttc retry internally.
					error!(error = %err, "MQTT event loop error, terminating");
					break;
				}
			}
		}
		connected.store(false, Ordering::SeqCst);
		info!("MQTT event loop terminated");
	}
}

#[async_trait]
impl MqttTransport for RumqttTransport {
	async fn connect(
		&self,
		timeout: Duration,
	) -> Result<ConnectAck, TransportError> {
		let (client, event_loop) = AsyncClient::new(
			self.options.clone(),
			self.event_loop_capacity,
		);

		let (event_loop, session_present) = tokio::time::timeout(
			timeout,
			Self::establish_connection(event_loop),
		)
		.await
		.map_err(|_| TransportError::timeout("connect", timeout))??;

		*self.client.lock().unwrap() = Some(client);
		self.connected.store(true, Ordering::SeqCst);

		tokio::spawn(Self::run(
			event_loop,
			self.inbound_tx.clone(),
			Arc::clone(&self.connected),
		));

		Ok(ConnectAck { session_present })
	}

	async fn disconnect(
		&self,
		timeout: Duration,
	) -> Result<(), TransportError> {
		let client = self.current_client()?;
		let result = tokio::time::timeout(timeout, client.disconnect())
			.await
			.map_err(|_| TransportError::timeout("disconnect", timeout))?
			.map_err(TransportError::network);

		self.connected.store(false, Ordering::SeqCst);
		*self.client.lock().unwrap() = None;
		result
	}

	async fn publish(
		&self,
		message: &OutgoingMessage,
		timeout: Duration,
	) -> Result<(), TransportError> {
		let client = self.current_client()?;
		tokio::time::timeout(
			timeout,
			client.publish(
				message.topic.to_string(),
				to_rumqttc_qos(message.qos),
				message.retain,
				message.payload.to_vec(),
			),
		)
		.await
		.map_err(|_| TransportError::timeout("publish", timeout))?
		.map_err(TransportError::network)
	}

	async fn subscribe(
		&self,
		filters: &[TopicFilter],
		timeout: Duration,
	) -> Result<(), TransportError> {
		let client = self.current_client()?;
		let filters: Vec<SubscribeFilter> = filters
			.iter()
			.map(|f| {
				SubscribeFilter::new(
					f.topic.to_string(),
					to_rumqttc_qos(f.qos),
				)
			})
			.collect();

		tokio::time::timeout(timeout, client.subscribe_many(filters))
			.await
			.map_err(|_| TransportError::timeout("subscribe", timeout))?
			.map_err(TransportError::network)
	}

	async fn unsubscribe(
		&self,
		topics: &[ArcStr],
		timeout: Duration,
	) -> Result<(), TransportError> {
		let client = self.current_client()?;
		let unsubscribe_all = async {
			for topic in topics {
				client
					.unsubscribe(topic.to_string())
					.await
					.map_err(TransportError::network)?;
			}
			Ok(())
		};

		tokio::time::timeout(timeout, unsubscribe_all)
			.await
			.map_err(|_| TransportError::timeout("unsubscribe", timeout))?
	}

	fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}
}
