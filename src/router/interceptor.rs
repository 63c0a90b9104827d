//! Hooks around route handler execution.

use std::any::Any;

use async_trait::async_trait;

use super::dispatcher::DispatchError;
use crate::transport::ReceivedMessage;

/// Opaque value passed from the before-hook to the after-hook.
pub type Correlation = Box<dyn Any + Send>;

/// Observes every routed message around handler execution.
///
/// The after-hook runs regardless of outcome: on a handler or binding
/// failure it receives the error, on success `None`.
#[async_trait]
pub trait RouteInvocationInterceptor: Send + Sync {
	/// Runs before the handler. The returned value, if any, is handed
	/// back to [`route_executed`](Self::route_executed) so the two
	/// calls can be correlated.
	async fn route_executing(
		&self,
		message: &ReceivedMessage,
	) -> Option<Correlation>;

	/// Runs after the handler, or after a failed binding attempt.
	async fn route_executed(
		&self,
		correlation: Option<Correlation>,
		message: &ReceivedMessage,
		error: Option<&DispatchError>,
	);
}
