//! Dispatches received messages to their matched handlers.

use std::sync::Arc;

use arcstr::ArcStr;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::context::RouteContext;
use super::interceptor::RouteInvocationInterceptor;
use super::registry::{
	HandlerDescriptor, HandlerError, HandlerInvocation, ParamSpec,
};
use super::route_table::RouteTable;
use crate::constraint::{ParamValue, TargetType};
use crate::payload::PayloadOptions;
use crate::transport::ReceivedMessage;

/// Dispatch-level configuration.
#[derive(Debug, Clone, Default)]
pub struct RoutingOptions {
	/// Treat unmatched topics as accepted instead of failed.
	pub allow_unmatched_routes: bool,
	/// Payload decoding used for payload-bound parameters.
	pub payload: PayloadOptions,
}

/// A parameter could not be bound from the matched route.
#[derive(Debug, Error)]
pub enum BindingError {
	/// The handler declares a required parameter the route did not
	/// capture.
	#[error("no matching route parameter for \"{name}\"")]
	MissingParameter {
		/// Declared parameter name.
		name: ArcStr,
	},
	/// A captured value could not be converted to the declared type.
	#[error(
		"cannot convert value \"{value}\" of parameter \"{name}\" to \
		 {target:?}"
	)]
	Conversion {
		/// Declared parameter name.
		name: ArcStr,
		/// Rendered source value.
		value: String,
		/// Requested representation.
		target: TargetType,
	},
	/// The payload could not be decoded for a payload-bound parameter.
	#[error("failed to decode payload for parameter \"{name}\": {source}")]
	PayloadDecode {
		/// Declared parameter name.
		name: ArcStr,
		/// Decoder error.
		#[source]
		source: serde_json::Error,
	},
}

/// Why a matched message still failed.
#[derive(Debug, Error)]
pub enum DispatchError {
	/// Parameter binding failed before the handler ran.
	#[error(transparent)]
	Binding(#[from] BindingError),
	/// The handler body returned an error.
	#[error(transparent)]
	Handler(#[from] HandlerError),
}

/// Outcome of dispatching one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
	/// The message was handled, or unmatched topics are allowed.
	Accepted,
	/// No route matched, binding failed, or the handler errored.
	Failed,
}

/// Routes received messages through a table to registered handlers.
pub struct Router {
	table: Arc<RouteTable>,
	options: RoutingOptions,
	interceptor: Option<Arc<dyn RouteInvocationInterceptor>>,
}

impl Router {
	/// Creates a router over a built table.
	pub fn new(table: Arc<RouteTable>, options: RoutingOptions) -> Self {
		Self { table, options, interceptor: None }
	}

	/// Installs an invocation interceptor.
	pub fn with_interceptor(
		mut self,
		interceptor: Arc<dyn RouteInvocationInterceptor>,
	) -> Self {
		self.interceptor = Some(interceptor);
		self
	}

	/// Dispatches one message; failures are reported, never propagated.
	pub async fn dispatch(
		&self,
		message: &ReceivedMessage,
	) -> DispatchOutcome {
		let mut context = RouteContext::new(message.topic.clone());
		self.table.route(&mut context);

		let Some(handler) = context.handler.clone() else {
			debug!(topic = %message.topic, "No route matched for topic");
			return if self.options.allow_unmatched_routes {
				DispatchOutcome::Accepted
			} else {
				DispatchOutcome::Failed
			};
		};

		debug!(
			topic = %message.topic,
			handler = %handler.identity(),
			"Route matched for topic"
		);

		let correlation = match &self.interceptor {
			| Some(interceptor) => {
				interceptor.route_executing(message).await
			}
			| None => None,
		};

		let result = self.invoke(&handler, &context, message).await;

		if let Some(interceptor) = &self.interceptor {
			interceptor
				.route_executed(correlation, message, result.as_ref().err())
				.await;
		}

		match result {
			| Ok(()) => DispatchOutcome::Accepted,
			| Err(DispatchError::Binding(bind_err)) => {
				error!(
					topic = %message.topic,
					handler = %handler.identity(),
					error = %bind_err,
					"Unable to match route parameters to all arguments"
				);
				DispatchOutcome::Failed
			}
			| Err(DispatchError::Handler(handler_err)) => {
				error!(
					topic = %message.topic,
					handler = %handler.identity(),
					error = %handler_err,
					"Unhandled handler error"
				);
				DispatchOutcome::Failed
			}
		}
	}

	/// Drains `inbound`, dispatching each message until the channel
	/// closes.
	pub async fn run(&self, mut inbound: mpsc::Receiver<ReceivedMessage>) {
		while let Some(message) = inbound.recv().await {
			self.dispatch(&message).await;
		}
		info!("Inbound message channel closed, dispatch loop stopped");
	}

	async fn invoke(
		&self,
		handler: &Arc<HandlerDescriptor>,
		context: &RouteContext,
		message: &ReceivedMessage,
	) -> Result<(), DispatchError> {
		let args = handler
			.params
			.iter()
			.map(|spec| self.bind_parameter(spec, context, message))
			.collect::<Result<Vec<_>, _>>()?;

		let invocation = HandlerInvocation {
			message: message.clone(),
			args,
			route_params: context.params.clone(),
		};

		(handler.handler)(invocation)
			.await
			.map_err(DispatchError::Handler)
	}

	fn bind_parameter(
		&self,
		spec: &ParamSpec,
		context: &RouteContext,
		message: &ReceivedMessage,
	) -> Result<ParamValue, BindingError> {
		if spec.from_payload {
			return self.bind_from_payload(spec, message);
		}

		match context.param(&spec.name) {
			| Some(value) => {
				value.convert(spec.target).ok_or_else(|| {
					BindingError::Conversion {
						name: spec.name.clone(),
						value: value.render(),
						target: spec.target,
					}
				})
			}
			| None if spec.optional => Ok(ParamValue::Null),
			| None => Err(BindingError::MissingParameter {
				name: spec.name.clone(),
			}),
		}
	}

	fn bind_from_payload(
		&self,
		spec: &ParamSpec,
		message: &ReceivedMessage,
	) -> Result<ParamValue, BindingError> {
		if message.payload.is_empty() {
			return Ok(spec.target.zero_value());
		}

		let value =
			self.options.payload.decode(&message.payload).map_err(
				|source| BindingError::PayloadDecode {
					name: spec.name.clone(),
					source,
				},
			)?;

		if spec.target == TargetType::Json {
			return Ok(ParamValue::Json(value));
		}

		// Scalar payloads: a JSON string binds from its content, other
		// values from their rendered form.
		let text = match &value {
			| serde_json::Value::String(s) => s.clone(),
			| other => other.to_string(),
		};
		spec.target.parse(&text).ok_or_else(|| {
			BindingError::Conversion {
				name: spec.name.clone(),
				value: text,
				target: spec.target,
			}
		})
	}
}
