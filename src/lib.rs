//! # MQTT Managed Router
//!
//! A managed MQTT session with attribute-style topic routing: route
//! templates with typed, constrained parameters dispatch incoming
//! messages to registered handlers, while a resilient session engine
//! keeps the connection alive, queues outgoing messages across
//! disconnects and restores subscriptions after reconnects.
//!
//! ## Features
//!
//! - **Route Templates**: `sensors/{deviceId}/{channel:int}` style
//!   templates with optional (`{id?}`) and catch-all (`{*rest}`)
//!   parameters
//! - **Typed Constraints**: `int`, `long`, `float`, `bool`, `guid` and
//!   friends validate segments and bind typed values
//! - **Precedence Routing**: routes sort from most to least specific;
//!   ambiguous pairs are rejected at build time
//! - **Managed Session**: bounded pending queue with overflow
//!   strategies, automatic reconnect, subscription replay and optional
//!   queue persistence
//! - **Observability**: structured `tracing` logs plus observer
//!   callbacks for every lifecycle event
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use futures::FutureExt;
//! use mqtt_managed_router::prelude::*;
//! use mqtt_managed_router::constraint::TargetType;
//! use mqtt_managed_router::transport::rumqtt::RumqttTransport;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Register a handler for a typed route.
//!     let mut registry = HandlerRegistry::new();
//!     registry.register(
//!         HandlerDescriptor::new("SensorController", "Telemetry", |inv| {
//!             async move {
//!                 println!("telemetry: {:?}", inv.args);
//!                 Ok(())
//!             }
//!             .boxed()
//!         })
//!         .with_template("sensors/{deviceId}/{channel:int}")
//!         .with_param(ParamSpec::new("deviceId", TargetType::Str))
//!         .with_param(ParamSpec::new("channel", TargetType::I32)),
//!     );
//!
//!     let table = Arc::new(build_route_table(&registry)?);
//!     let router = Router::new(table, RoutingOptions::default());
//!
//!     // Wire the router to a managed session over rumqttc.
//!     let mqtt_options =
//!         rumqttc::MqttOptions::new("router", "localhost", 1883);
//!     let (transport, inbound) =
//!         RumqttTransport::connect_channel(mqtt_options, 10, 64);
//!     let session =
//!         ManagedSession::new(transport, SessionOptions::default());
//!
//!     session.start().await?;
//!     session.subscribe(vec![TopicFilter::new(
//!         "sensors/#",
//!         QualityOfService::AtLeastOnce,
//!     )])?;
//!     session
//!         .enqueue(OutgoingMessage::new("sensors/dev-1/2", "21.5"))
//!         .await?;
//!
//!     router.run(inbound).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod constraint;
pub mod payload;
pub mod router;
pub mod session;
pub mod template;
pub mod topic;
pub mod transport;

// === Core Public API ===
pub use router::{
	build_route_table, DispatchOutcome, HandlerDescriptor, HandlerError,
	HandlerInvocation, HandlerRegistry, ParamSpec, RouteContext,
	RouteInvocationInterceptor, RouteTable, RouteTableCache,
	RouteTableError, Router, RoutingOptions,
};
pub use session::{
	ManagedSession, OverflowStrategy, SessionError, SessionOptions,
	SessionStorage,
};
pub use transport::{
	MqttTransport, OutgoingMessage, QualityOfService, ReceivedMessage,
	TopicFilter, TransportError,
};

// Typed parameter values
pub use constraint::{ParamValue, TargetType};

// Template parsing (for manual route handling)
pub use template::{parse_template, RouteTemplate, TemplateError};

/// Prelude module for convenient imports
///
/// ```rust
/// use mqtt_managed_router::prelude::*;
/// ```
pub mod prelude {
	//! Essential types for most applications

	pub use crate::{
		build_route_table, HandlerDescriptor, HandlerRegistry,
		ManagedSession, OutgoingMessage, ParamSpec, QualityOfService,
		Router, RoutingOptions, SessionOptions, TopicFilter,
	};
}

/// All error types used in the library
///
/// ```rust
/// use mqtt_managed_router::errors::*;
/// ```
pub mod errors {
	//! Error types re-exported in one place

	pub use crate::router::{
		BindingError, DispatchError, HandlerError, RouteTableError,
	};
	pub use crate::session::{SessionError, StorageError};
	pub use crate::template::TemplateError;
	pub use crate::topic::TopicValidationError;
	pub use crate::transport::TransportError;
	pub use crate::constraint::UnknownConstraintError;
}
