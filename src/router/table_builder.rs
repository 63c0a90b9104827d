//! Builds route tables from the handler registry.
//!
//! Each handler's group template is crossed with its action templates
//! (`[controller]`/`[action]` tokens replaced first), every expansion is
//! parsed, and the resulting routes are precedence-sorted into a
//! [`RouteTable`]. Built tables are cached by a stable key over the
//! registry contents so repeated construction with the same handlers
//! hands back the same `Arc`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use arcstr::ArcStr;
use lru::LruCache;
use tracing::debug;

use super::registry::HandlerRegistry;
use super::route::Route;
use super::route_table::{RouteTable, RouteTableError};
use crate::template::parse_template;

/// Replaces `[controller]` and `[action]` tokens.
///
/// A controller name ending in `Controller` loses the suffix, so
/// `SensorController` fills `[controller]` as `sensor`-cased `Sensor`.
fn replace_tokens(template: &str, controller: &str, action: &str) -> String {
	let controller =
		controller.strip_suffix("Controller").unwrap_or(controller);
	template
		.replace("[controller]", controller)
		.replace("[action]", action)
}

/// Expands and parses every registered handler into a sorted table.
pub fn build_route_table(
	registry: &HandlerRegistry,
) -> Result<RouteTable, RouteTableError> {
	let mut routes = Vec::new();

	for descriptor in registry.handlers() {
		let expanded_group: Option<ArcStr> =
			descriptor.group_template.as_ref().map(|group| {
				replace_tokens(
					group,
					&descriptor.controller,
					&descriptor.action,
				)
				.into()
			});

		let group_templates: Vec<String> = match &expanded_group {
			| Some(group) => vec![format!("{group}/")],
			| None => vec![String::new()],
		};

		// Without an explicit template the action name is the route.
		let action_templates: Vec<String> =
			if descriptor.templates.is_empty() {
				vec![descriptor.action.to_string()]
			} else {
				descriptor
					.templates
					.iter()
					.map(|template| {
						replace_tokens(
							template,
							&descriptor.controller,
							&descriptor.action,
						)
					})
					.collect()
			};

		let expanded: Vec<String> = group_templates
			.iter()
			.flat_map(|group| {
				action_templates
					.iter()
					.map(move |action| format!("{group}{action}"))
			})
			.collect();

		let parsed = expanded
			.iter()
			.map(|template| parse_template(template))
			.collect::<Result<Vec<_>, _>>()?;

		let mut all_names: Vec<ArcStr> = Vec::new();
		for template in &parsed {
			for name in template.parameter_names() {
				if !all_names
					.iter()
					.any(|known| known.eq_ignore_ascii_case(name.as_str()))
				{
					all_names.push(name.clone());
				}
			}
		}

		for template in parsed {
			let own_names: Vec<ArcStr> =
				template.parameter_names().cloned().collect();
			let unused_names: Vec<ArcStr> = all_names
				.iter()
				.filter(|name| {
					!own_names
						.iter()
						.any(|own| own.eq_ignore_ascii_case(name.as_str()))
				})
				.cloned()
				.collect();

			debug!(
				handler = %descriptor.identity(),
				template = %template.text(),
				"Registered route"
			);
			routes.push(Route::new(
				template,
				Arc::clone(descriptor),
				expanded_group.clone(),
				unused_names,
			));
		}
	}

	RouteTable::from_routes(routes)
}

const DEFAULT_CACHE_CAPACITY: usize = 16;

/// LRU cache of built route tables, keyed by registry contents.
pub struct RouteTableCache {
	tables: Mutex<LruCache<u64, Arc<RouteTable>>>,
}

impl RouteTableCache {
	/// Creates a cache holding up to `capacity` tables.
	pub fn new(capacity: NonZeroUsize) -> Self {
		Self { tables: Mutex::new(LruCache::new(capacity)) }
	}

	/// Returns the cached table for `registry`, building it on a miss.
	///
	/// Registries with identical handlers produce reference-equal
	/// tables.
	pub fn get_or_build(
		&self,
		registry: &HandlerRegistry,
	) -> Result<Arc<RouteTable>, RouteTableError> {
		let key = registry_key(registry);

		if let Some(table) = self.tables.lock().unwrap().get(&key) {
			debug!(key, "Route table cache hit");
			return Ok(Arc::clone(table));
		}

		let table = Arc::new(build_route_table(registry)?);
		self.tables.lock().unwrap().put(key, Arc::clone(&table));
		debug!(key, routes = table.routes().len(), "Route table built");
		Ok(table)
	}
}

impl Default for RouteTableCache {
	fn default() -> Self {
		Self::new(
			NonZeroUsize::new(DEFAULT_CACHE_CAPACITY)
				.unwrap_or(NonZeroUsize::MIN),
		)
	}
}

/// Order-independent key over handler identities and their templates.
fn registry_key(registry: &HandlerRegistry) -> u64 {
	let mut entries: Vec<String> = registry
		.handlers()
		.iter()
		.map(|descriptor| {
			let mut entry = descriptor.identity();
			entry.push('\0');
			if let Some(group) = &descriptor.group_template {
				entry.push_str(group);
			}
			for template in &descriptor.templates {
				entry.push('\0');
				entry.push_str(template);
			}
			entry
		})
		.collect();
	entries.sort_unstable();

	let mut hasher = DefaultHasher::new();
	entries.hash(&mut hasher);
	hasher.finish()
}
