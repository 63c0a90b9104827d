//! Explicit handler registry.
//!
//! Handlers are registered up front as [`HandlerDescriptor`]s that name
//! their route templates and parameter signatures. The route table is
//! built from the registry contents; nothing is discovered at dispatch
//! time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arcstr::ArcStr;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::constraint::{ParamValue, TargetType};
use crate::transport::ReceivedMessage;

/// Error surfaced by a handler body.
///
/// Handler failures are reported through dispatch events and logging;
/// they never tear down the dispatch loop.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
	message: String,
	#[source]
	source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HandlerError {
	/// Creates an error from a plain message.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into(), source: None }
	}

	/// Creates an error wrapping an underlying cause.
	pub fn with_source(
		message: impl Into<String>,
		source: impl std::error::Error + Send + Sync + 'static,
	) -> Self {
		Self {
			message: message.into(),
			source: Some(Box::new(source)),
		}
	}
}

/// Everything a handler receives for one matched message.
pub struct HandlerInvocation {
	/// The message that matched the route.
	pub message: ReceivedMessage,
	/// Bound arguments, in the order of the descriptor's
	/// [`ParamSpec`] list.
	pub args: Vec<ParamValue>,
	/// Values captured by the route, keyed by parameter name.
	pub route_params: HashMap<ArcStr, ParamValue>,
}

impl HandlerInvocation {
	/// Returns the bound argument at `index`, if present.
	pub fn arg(&self, index: usize) -> Option<&ParamValue> {
		self.args.get(index)
	}
}

/// Boxed async handler entry point.
pub type HandlerFn = Arc<
	dyn Fn(HandlerInvocation) -> BoxFuture<'static, Result<(), HandlerError>>
		+ Send
		+ Sync,
>;

/// One parameter of a handler's signature.
#[derive(Debug, Clone)]
pub struct ParamSpec {
	/// Parameter name, matched case-insensitively against route
	/// parameter names.
	pub name: ArcStr,
	/// Type the bound value must be converted to.
	pub target: TargetType,
	/// Missing route values bind to `Null` instead of failing.
	pub optional: bool,
	/// Bind from the decoded payload instead of the route values.
	pub from_payload: bool,
}

impl ParamSpec {
	/// Required parameter bound from route values.
	pub fn new(name: impl Into<ArcStr>, target: TargetType) -> Self {
		Self {
			name: name.into(),
			target,
			optional: false,
			from_payload: false,
		}
	}

	/// Marks the parameter optional.
	pub fn optional(mut self) -> Self {
		self.optional = true;
		self
	}

	/// Binds the parameter from the message payload.
	pub fn from_payload(mut self) -> Self {
		self.from_payload = true;
		self
	}
}

/// A registered handler: identity, templates and signature.
#[derive(Clone)]
pub struct HandlerDescriptor {
	/// Controller name, used for `[controller]` token replacement.
	pub controller: ArcStr,
	/// Action name, used for `[action]` token replacement and as the
	/// default template when none is given.
	pub action: ArcStr,
	/// Optional route prefix shared by the controller's actions.
	pub group_template: Option<ArcStr>,
	/// Action-level templates. Empty means "use the action name".
	pub templates: Vec<ArcStr>,
	/// Parameter signature, in invocation order.
	pub params: Vec<ParamSpec>,
	/// The handler body.
	pub handler: HandlerFn,
}

impl HandlerDescriptor {
	/// Creates a descriptor with no templates and no parameters.
	pub fn new<F>(
		controller: impl Into<ArcStr>,
		action: impl Into<ArcStr>,
		handler: F,
	) -> Self
	where
		F: Fn(
				HandlerInvocation,
			) -> BoxFuture<'static, Result<(), HandlerError>>
			+ Send
			+ Sync
			+ 'static,
	{
		Self {
			controller: controller.into(),
			action: action.into(),
			group_template: None,
			templates: Vec::new(),
			params: Vec::new(),
			handler: Arc::new(handler),
		}
	}

	/// Sets the controller-level route prefix.
	pub fn with_group_template(
		mut self,
		template: impl Into<ArcStr>,
	) -> Self {
		self.group_template = Some(template.into());
		self
	}

	/// Adds an action-level template.
	pub fn with_template(mut self, template: impl Into<ArcStr>) -> Self {
		self.templates.push(template.into());
		self
	}

	/// Appends a parameter to the signature.
	pub fn with_param(mut self, param: ParamSpec) -> Self {
		self.params.push(param);
		self
	}

	/// `Controller.Action` identity used in diagnostics.
	pub fn identity(&self) -> String {
		format!("{}.{}", self.controller, self.action)
	}
}

impl fmt::Debug for HandlerDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HandlerDescriptor")
			.field("controller", &self.controller)
			.field("action", &self.action)
			.field("group_template", &self.group_template)
			.field("templates", &self.templates)
			.field("params", &self.params)
			.finish_non_exhaustive()
	}
}

/// Collection of registered handlers, input to the route table builder.
#[derive(Debug, Default, Clone)]
pub struct HandlerRegistry {
	handlers: Vec<Arc<HandlerDescriptor>>,
}

impl HandlerRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a handler.
	pub fn register(&mut self, descriptor: HandlerDescriptor) -> &mut Self {
		self.handlers.push(Arc::new(descriptor));
		self
	}

	/// Registered handlers, in registration order.
	pub fn handlers(&self) -> &[Arc<HandlerDescriptor>] {
		&self.handlers
	}
}
