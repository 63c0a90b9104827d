//! End-to-end routing tests: registry to table to dispatched handler,
//! including parameter binding and the invocation interceptor.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::FutureExt;
use mqtt_managed_router::constraint::{ParamValue, TargetType};
use mqtt_managed_router::router::{
	build_route_table, Correlation, DispatchError, DispatchOutcome,
	HandlerDescriptor, HandlerError, HandlerRegistry, ParamSpec,
	RouteInvocationInterceptor, Router, RoutingOptions,
};
use mqtt_managed_router::transport::ReceivedMessage;

#[derive(Default)]
struct Recorder {
	invocations: Mutex<Vec<(String, Vec<ParamValue>)>>,
}

impl Recorder {
	fn record(&self, action: &str, args: Vec<ParamValue>) {
		self.invocations
			.lock()
			.unwrap()
			.push((action.to_string(), args));
	}

	fn taken(&self) -> Vec<(String, Vec<ParamValue>)> {
		std::mem::take(&mut self.invocations.lock().unwrap())
	}
}

fn recording_handler(
	recorder: &Arc<Recorder>,
	action: &'static str,
) -> HandlerDescriptor {
	let recorder = Arc::clone(recorder);
	HandlerDescriptor::new("TestController", action, move |inv| {
		let recorder = Arc::clone(&recorder);
		async move {
			recorder.record(action, inv.args);
			Ok(())
		}
		.boxed()
	})
}

/// Opt-in log output for debugging: `RUST_LOG=debug cargo test`.
fn init_tracing() {
	static INIT: std::sync::Once = std::sync::Once::new();
	INIT.call_once(|| {
		if std::env::var("RUST_LOG").is_ok() {
			let _ = tracing_subscriber::fmt()
				.with_env_filter(
					tracing_subscriber::EnvFilter::from_default_env(),
				)
				.with_test_writer()
				.try_init();
		}
	});
}

fn router_for(registry: &HandlerRegistry) -> Router {
	init_tracing();
	let table = Arc::new(build_route_table(registry).unwrap());
	Router::new(table, RoutingOptions::default())
}

fn message(topic: &str, payload: &str) -> ReceivedMessage {
	ReceivedMessage::new(topic, payload.as_bytes().to_vec())
}

#[tokio::test]
async fn literal_routes_dispatch_to_their_handlers() {
	let recorder = Arc::new(Recorder::default());
	let mut registry = HandlerRegistry::new();
	registry.register(
		recording_handler(&recorder, "Awesome")
			.with_template("super/awesome"),
	);
	registry.register(
		recording_handler(&recorder, "Cool").with_template("super/cool"),
	);
	registry.register(
		recording_handler(&recorder, "Other").with_template("other/route"),
	);
	let router = router_for(&registry);

	let outcome = router.dispatch(&message("super/awesome", "")).await;
	assert_eq!(outcome, DispatchOutcome::Accepted);
	assert_eq!(recorder.taken()[0].0, "Awesome");

	let outcome = router.dispatch(&message("super/miss", "")).await;
	assert_eq!(outcome, DispatchOutcome::Failed);
	assert!(recorder.taken().is_empty());
}

#[tokio::test]
async fn unmatched_topic_accepted_when_allowed() {
	let recorder = Arc::new(Recorder::default());
	let mut registry = HandlerRegistry::new();
	registry.register(
		recording_handler(&recorder, "Cool").with_template("super/cool"),
	);
	let table = Arc::new(build_route_table(&registry).unwrap());
	let router = Router::new(
		table,
		RoutingOptions {
			allow_unmatched_routes: true,
			..RoutingOptions::default()
		},
	);

	let outcome = router.dispatch(&message("super/miss", "")).await;
	assert_eq!(outcome, DispatchOutcome::Accepted);
	assert!(recorder.taken().is_empty());
}

#[tokio::test]
async fn literal_route_preferred_over_catch_all() {
	let recorder = Arc::new(Recorder::default());
	let mut registry = HandlerRegistry::new();
	registry.register(
		recording_handler(&recorder, "Fallback")
			.with_template("{*path}")
			.with_param(ParamSpec::new("path", TargetType::Str)),
	);
	registry.register(
		recording_handler(&recorder, "Cool").with_template("super/cool"),
	);
	registry.register(
		recording_handler(&recorder, "Other").with_template("other/route"),
	);
	let router = router_for(&registry);

	router.dispatch(&message("super/cool", "")).await;
	assert_eq!(recorder.taken()[0].0, "Cool");

	router.dispatch(&message("anything/else/entirely", "")).await;
	let invocations = recorder.taken();
	assert_eq!(invocations[0].0, "Fallback");
	assert_eq!(
		invocations[0].1[0],
		ParamValue::Str("anything/else/entirely".into())
	);
}

#[tokio::test]
async fn int_constraint_binds_integer_and_falls_through() {
	let recorder = Arc::new(Recorder::default());
	let mut registry = HandlerRegistry::new();
	registry.register(
		recording_handler(&recorder, "Numeric")
			.with_template("items/{id:int}")
			.with_param(ParamSpec::new("id", TargetType::I32)),
	);
	registry.register(
		recording_handler(&recorder, "Named")
			.with_template("items/{id}")
			.with_param(ParamSpec::new("id", TargetType::Str)),
	);
	let router = router_for(&registry);

	router.dispatch(&message("items/42", "")).await;
	let invocations = recorder.taken();
	assert_eq!(invocations[0].0, "Numeric");
	assert_eq!(invocations[0].1[0], ParamValue::I32(42));

	router.dispatch(&message("items/foo", "")).await;
	let invocations = recorder.taken();
	assert_eq!(invocations[0].0, "Named");
	assert_eq!(invocations[0].1[0], ParamValue::Str("foo".into()));
}

#[tokio::test]
async fn payload_parameter_binds_decoded_json() {
	let recorder = Arc::new(Recorder::default());
	let mut registry = HandlerRegistry::new();
	registry.register(
		recording_handler(&recorder, "Create")
			.with_template("users/create")
			.with_param(
				ParamSpec::new("body", TargetType::Json).from_payload(),
			),
	);
	let router = router_for(&registry);

	let outcome = router
		.dispatch(&message("users/create", r#"{"name":"foo"}"#))
		.await;
	assert_eq!(outcome, DispatchOutcome::Accepted);

	let invocations = recorder.taken();
	let ParamValue::Json(body) = &invocations[0].1[0] else {
		panic!("expected a Json argument");
	};
	assert_eq!(body["name"], "foo");
}

#[tokio::test]
async fn undecodable_payload_fails_dispatch() {
	let recorder = Arc::new(Recorder::default());
	let mut registry = HandlerRegistry::new();
	registry.register(
		recording_handler(&recorder, "Create")
			.with_template("users/create")
			.with_param(
				ParamSpec::new("body", TargetType::Json).from_payload(),
			),
	);
	let router = router_for(&registry);

	let outcome =
		router.dispatch(&message("users/create", "not json")).await;
	assert_eq!(outcome, DispatchOutcome::Failed);
	assert!(recorder.taken().is_empty());
}

#[tokio::test]
async fn missing_required_parameter_fails_optional_binds_null() {
	let recorder = Arc::new(Recorder::default());
	let mut registry = HandlerRegistry::new();
	registry.register(
		recording_handler(&recorder, "Strict")
			.with_template("strict/{x}")
			.with_param(ParamSpec::new("x", TargetType::Str))
			.with_param(ParamSpec::new("absent", TargetType::Str)),
	);
	registry.register(
		recording_handler(&recorder, "Lenient")
			.with_template("lenient/{x}")
			.with_param(ParamSpec::new("x", TargetType::Str))
			.with_param(
				ParamSpec::new("absent", TargetType::Str).optional(),
			),
	);
	let router = router_for(&registry);

	let outcome = router.dispatch(&message("strict/1", "")).await;
	assert_eq!(outcome, DispatchOutcome::Failed);
	assert!(recorder.taken().is_empty());

	let outcome = router.dispatch(&message("lenient/1", "")).await;
	assert_eq!(outcome, DispatchOutcome::Accepted);
	let invocations = recorder.taken();
	assert_eq!(invocations[0].1[1], ParamValue::Null);
}

#[tokio::test]
async fn handler_error_is_contained() {
	let mut registry = HandlerRegistry::new();
	registry.register(
		HandlerDescriptor::new("TestController", "Broken", |_| {
			async { Err(HandlerError::new("boom")) }.boxed()
		})
		.with_template("broken"),
	);
	let router = router_for(&registry);

	let outcome = router.dispatch(&message("broken", "")).await;
	assert_eq!(outcome, DispatchOutcome::Failed);
}

struct CountingInterceptor {
	executing: AtomicUsize,
	executed: AtomicUsize,
	failures: AtomicUsize,
	correlations: AtomicUsize,
}

impl CountingInterceptor {
	fn new() -> Self {
		Self {
			executing: AtomicUsize::new(0),
			executed: AtomicUsize::new(0),
			failures: AtomicUsize::new(0),
			correlations: AtomicUsize::new(0),
		}
	}
}

#[async_trait]
impl RouteInvocationInterceptor for CountingInterceptor {
	async fn route_executing(
		&self,
		_message: &ReceivedMessage,
	) -> Option<Correlation> {
		let token = self.executing.fetch_add(1, Ordering::SeqCst);
		Some(Box::new(token) as Box<dyn Any + Send>)
	}

	async fn route_executed(
		&self,
		correlation: Option<Correlation>,
		_message: &ReceivedMessage,
		error: Option<&DispatchError>,
	) {
		self.executed.fetch_add(1, Ordering::SeqCst);
		if error.is_some() {
			self.failures.fetch_add(1, Ordering::SeqCst);
		}
		if correlation
			.and_then(|c| c.downcast::<usize>().ok())
			.is_some()
		{
			self.correlations.fetch_add(1, Ordering::SeqCst);
		}
	}
}

#[tokio::test]
async fn interceptor_sees_success_and_failure() {
	let mut registry = HandlerRegistry::new();
	registry.register(
		HandlerDescriptor::new("TestController", "Ok", |_| {
			async { Ok(()) }.boxed()
		})
		.with_template("ok"),
	);
	registry.register(
		HandlerDescriptor::new("TestController", "Broken", |_| {
			async { Err(HandlerError::new("boom")) }.boxed()
		})
		.with_template("broken"),
	);

	let interceptor = Arc::new(CountingInterceptor::new());
	let table = Arc::new(build_route_table(&registry).unwrap());
	let router = Router::new(table, RoutingOptions::default())
		.with_interceptor(Arc::clone(&interceptor)
			as Arc<dyn RouteInvocationInterceptor>);

	router.dispatch(&message("ok", "")).await;
	router.dispatch(&message("broken", "")).await;

	assert_eq!(interceptor.executing.load(Ordering::SeqCst), 2);
	assert_eq!(interceptor.executed.load(Ordering::SeqCst), 2);
	assert_eq!(interceptor.failures.load(Ordering::SeqCst), 1);
	assert_eq!(interceptor.correlations.load(Ordering::SeqCst), 2);
}
