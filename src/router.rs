//! Topic-template routing: registry, compiled routes, precedence table
//! and the dispatcher that binds handler parameters.

pub mod context;
pub mod dispatcher;
pub mod interceptor;
pub mod registry;
pub mod route;
pub mod route_table;
pub mod table_builder;

#[cfg(test)]
mod route_table_tests;

pub use context::RouteContext;
pub use dispatcher::{
	BindingError, DispatchError, DispatchOutcome, Router, RoutingOptions,
};
pub use interceptor::{Correlation, RouteInvocationInterceptor};
pub use registry::{
	HandlerDescriptor, HandlerError, HandlerFn, HandlerInvocation,
	HandlerRegistry, ParamSpec,
};
pub use route::Route;
pub use route_table::{RouteTable, RouteTableError};
pub use table_builder::{build_route_table, RouteTableCache};
