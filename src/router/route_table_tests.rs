use futures::future::ready;
use futures::FutureExt;

use super::context::RouteContext;
use super::registry::{HandlerDescriptor, HandlerRegistry};
use super::route_table::RouteTableError;
use super::table_builder::{build_route_table, RouteTableCache};
use crate::constraint::ParamValue;

fn handler(action: &str, templates: &[&str]) -> HandlerDescriptor {
	let mut descriptor = HandlerDescriptor::new("TestController", action, |_| {
		ready(Ok(())).boxed()
	});
	for template in templates {
		descriptor = descriptor.with_template(*template);
	}
	descriptor
}

fn registry_of(handlers: Vec<HandlerDescriptor>) -> HandlerRegistry {
	let mut registry = HandlerRegistry::new();
	for descriptor in handlers {
		registry.register(descriptor);
	}
	registry
}

fn route_topic(
	registry: &HandlerRegistry,
	topic: &str,
) -> RouteContext {
	let table = build_route_table(registry).unwrap();
	let mut context = RouteContext::new(topic);
	table.route(&mut context);
	context
}

#[test]
fn first_matching_route_wins() {
	let registry = registry_of(vec![
		handler("Awesome", &["super/awesome"]),
		handler("Cool", &["super/cool"]),
		handler("Other", &["other/route"]),
	]);

	let context = route_topic(&registry, "super/awesome");
	let matched = context.handler.unwrap();
	assert_eq!(matched.identity(), "TestController.Awesome");
}

#[test]
fn miss_leaves_handler_unset() {
	let registry = registry_of(vec![
		handler("Awesome", &["super/awesome"]),
		handler("Cool", &["super/cool"]),
	]);

	let context = route_topic(&registry, "super/miss");
	assert!(context.handler.is_none());
}

#[test]
fn catch_all_matches_everything_else() {
	let registry = registry_of(vec![
		handler("Fallback", &["{*path}"]),
		handler("Cool", &["super/cool"]),
	]);

	let context = route_topic(&registry, "super/duper");
	let matched = context.handler.clone().unwrap();
	assert_eq!(matched.identity(), "TestController.Fallback");
	assert_eq!(
		context.param("path"),
		Some(&ParamValue::Str("super/duper".into()))
	);
}

#[test]
fn catch_all_never_outranks_specific_route() {
	// Registration order must not matter; the catch-all sorts last.
	let registry = registry_of(vec![
		handler("Fallback", &["{*path}"]),
		handler("Cool", &["super/cool"]),
		handler("Other", &["other/route"]),
	]);

	let context = route_topic(&registry, "super/cool");
	let matched = context.handler.unwrap();
	assert_eq!(matched.identity(), "TestController.Cool");
}

#[test]
fn literal_outranks_parameter() {
	let registry = registry_of(vec![
		handler("ById", &["product/{id}"]),
		handler("Latest", &["product/latest"]),
	]);

	let context = route_topic(&registry, "product/latest");
	let matched = context.handler.unwrap();
	assert_eq!(matched.identity(), "TestController.Latest");
}

#[test]
fn constrained_parameter_outranks_unconstrained() {
	let registry = registry_of(vec![
		handler("Any", &["product/{id}"]),
		handler("Numeric", &["product/{id:int}"]),
	]);

	let numeric = route_topic(&registry, "product/42");
	assert_eq!(
		numeric.handler.clone().unwrap().identity(),
		"TestController.Numeric"
	);
	assert_eq!(numeric.param("id"), Some(&ParamValue::I32(42)));

	let textual = route_topic(&registry, "product/abc");
	assert_eq!(
		textual.handler.clone().unwrap().identity(),
		"TestController.Any"
	);
	assert_eq!(
		textual.param("id"),
		Some(&ParamValue::Str("abc".into()))
	);
}

#[test]
fn shorter_route_sorts_first() {
	let registry = registry_of(vec![
		handler("Deep", &["a/b/c"]),
		handler("Shallow", &["a/b"]),
	]);

	let table = build_route_table(&registry).unwrap();
	assert_eq!(table.routes()[0].template().text(), "a/b");
	assert_eq!(table.routes()[1].template().text(), "a/b/c");
}

#[test]
fn optional_parameter_may_be_absent() {
	let registry = registry_of(vec![handler("Items", &["items/{id?}"])]);

	let with_id = route_topic(&registry, "items/7");
	assert!(with_id.handler.is_some());
	assert_eq!(with_id.param("id"), Some(&ParamValue::Str("7".into())));

	let without_id = route_topic(&registry, "items");
	assert!(without_id.handler.is_some());
	assert!(without_id.param("id").is_none());
}

#[test]
fn unused_parameter_names_bind_to_null() {
	let registry = registry_of(vec![handler(
		"Multi",
		&["alpha/{x}", "beta/{y}"],
	)]);

	let context = route_topic(&registry, "alpha/1");
	assert_eq!(context.param("x"), Some(&ParamValue::Str("1".into())));
	assert_eq!(context.param("y"), Some(&ParamValue::Null));
}

#[test]
fn ambiguous_parameter_routes_fail_the_build() {
	let registry = registry_of(vec![
		handler("First", &["super/{a}"]),
		handler("Second", &["super/{b}"]),
	]);

	let error = build_route_table(&registry).unwrap_err();
	assert!(matches!(error, RouteTableError::AmbiguousRoutes { .. }));
}

#[test]
fn ambiguous_literals_differ_only_by_case() {
	let registry = registry_of(vec![
		handler("Lower", &["super/cool"]),
		handler("Upper", &["Super/Cool"]),
	]);

	let error = build_route_table(&registry).unwrap_err();
	assert!(matches!(error, RouteTableError::AmbiguousRoutes { .. }));
}

#[test]
fn group_template_prefixes_action_templates() {
	let descriptor = HandlerDescriptor::new(
		"SensorController",
		"Telemetry",
		|_| ready(Ok(())).boxed(),
	)
	.with_group_template("[controller]/{deviceId}")
	.with_template("[action]/{channel}");
	let registry = registry_of(vec![descriptor]);

	let context = route_topic(&registry, "Sensor/dev-1/Telemetry/temp");
	assert!(context.handler.is_some());
	assert_eq!(
		context.param("deviceId"),
		Some(&ParamValue::Str("dev-1".into()))
	);
	assert_eq!(
		context.param("channel"),
		Some(&ParamValue::Str("temp".into()))
	);
	assert_eq!(
		context.matched_group_template.as_deref(),
		Some("Sensor/{deviceId}")
	);
}

#[test]
fn routes_without_a_group_leave_group_metadata_unset() {
	let registry = registry_of(vec![handler("Plain", &["plain/route"])]);

	let context = route_topic(&registry, "plain/route");
	assert!(context.handler.is_some());
	assert!(context.matched_group_template.is_none());
}

#[test]
fn action_name_is_the_default_template() {
	let registry = registry_of(vec![handler("Status", &[])]);

	let context = route_topic(&registry, "Status");
	assert!(context.handler.is_some());
}

#[test]
fn cache_returns_reference_equal_tables() {
	let registry = registry_of(vec![
		handler("Awesome", &["super/awesome"]),
		handler("Cool", &["super/cool"]),
	]);

	let cache = RouteTableCache::default();
	let first = cache.get_or_build(&registry).unwrap();
	let second = cache.get_or_build(&registry).unwrap();
	assert!(std::sync::Arc::ptr_eq(&first, &second));
}
