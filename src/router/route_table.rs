//! Precedence-sorted route table.
//!
//! Routes are sorted from most specific to least specific once, at
//! build time; matching walks the sorted list and the first hit wins.
//! Two distinct routes the comparator cannot order are ambiguous and
//! fail the build instead of silently shadowing each other.

use std::cmp::Ordering;

use thiserror::Error;

use super::context::RouteContext;
use super::route::Route;
use crate::template::TemplateError;

/// Errors raised while building a route table.
#[derive(Debug, Error)]
pub enum RouteTableError {
	/// A registered template failed to parse.
	#[error("route template error: {0}")]
	Template(#[from] TemplateError),
	/// Two routes have indistinguishable precedence.
	#[error(
		"the following routes are ambiguous: '{first_template}' in \
		 '{first_handler}' and '{second_template}' in '{second_handler}'"
	)]
	AmbiguousRoutes {
		/// Template text of the first route.
		first_template: String,
		/// `Controller.Action` identity of the first route's handler.
		first_handler: String,
		/// Template text of the second route.
		second_template: String,
		/// `Controller.Action` identity of the second route's handler.
		second_handler: String,
	},
}

/// Immutable, precedence-ordered collection of routes.
#[derive(Debug, Clone)]
pub struct RouteTable {
	routes: Vec<Route>,
}

impl RouteTable {
	/// Sorts `routes` by precedence and rejects ambiguous pairs.
	pub(crate) fn from_routes(
		mut routes: Vec<Route>,
	) -> Result<Self, RouteTableError> {
		routes.sort_by(route_precedence);

		// After sorting, an ambiguous pair is necessarily adjacent.
		for pair in routes.windows(2) {
			if route_precedence(&pair[0], &pair[1]) == Ordering::Equal {
				return Err(RouteTableError::AmbiguousRoutes {
					first_template: pair[0].template().text().to_string(),
					first_handler: pair[0].handler().identity(),
					second_template: pair[1]
						.template()
						.text()
						.to_string(),
					second_handler: pair[1].handler().identity(),
				});
			}
		}

		Ok(Self { routes })
	}

	/// Routes in precedence order, most specific first.
	pub fn routes(&self) -> &[Route] {
		&self.routes
	}

	/// Matches `context` against the table; first match wins.
	pub fn route(&self, context: &mut RouteContext) -> bool {
		self.routes
			.iter()
			.any(|route| route.match_context(context))
	}
}

/// Route precedence. Shorter routes first, except routes ending in a
/// catch-all always sort after routes that do not. At equal length the
/// segments are compared positionwise: literal before parameter,
/// required before optional, more constraints before fewer, literals
/// tie-broken by case-insensitive lexical order.
pub(crate) fn route_precedence(x: &Route, y: &Route) -> Ordering {
	let x_segments = x.template().segments();
	let y_segments = y.template().segments();

	if x_segments.is_empty() && y_segments.is_empty() {
		return Ordering::Equal;
	}

	if x_segments.is_empty() || y_segments.is_empty() {
		return x_segments.len().cmp(&y_segments.len());
	}

	if x_segments.len() != y_segments.len() {
		let x_ends_catch_all =
			x_segments.last().is_some_and(|s| s.is_catch_all());
		let y_ends_catch_all =
			y_segments.last().is_some_and(|s| s.is_catch_all());

		return match (x_ends_catch_all, y_ends_catch_all) {
			| (false, true) => Ordering::Less,
			| (true, false) => Ordering::Greater,
			| _ => x_segments.len().cmp(&y_segments.len()),
		};
	}

	for (x_segment, y_segment) in x_segments.iter().zip(y_segments) {
		match (x_segment.is_catch_all(), y_segment.is_catch_all()) {
			| (false, true) => return Ordering::Less,
			| (true, false) => return Ordering::Greater,
			| _ => {}
		}

		match (x_segment.is_parameter(), y_segment.is_parameter()) {
			| (false, true) => return Ordering::Less,
			| (true, false) => return Ordering::Greater,
			| (true, true) => {
				match (x_segment.is_optional(), y_segment.is_optional())
				{
					| (false, true) => return Ordering::Less,
					| (true, false) => return Ordering::Greater,
					| _ => {}
				}
				// More constraints means more specific.
				match y_segment
					.constraints()
					.len()
					.cmp(&x_segment.constraints().len())
				{
					| Ordering::Equal => {}
					| ordering => return ordering,
				}
			}
			| (false, false) => {
				let ordering = cmp_ignore_ascii_case(
					x_segment.value(),
					y_segment.value(),
				);
				if ordering != Ordering::Equal {
					return ordering;
				}
			}
		}
	}

	Ordering::Equal
}

fn cmp_ignore_ascii_case(a: &str, b: &str) -> Ordering {
	a.bytes()
		.map(|byte| byte.to_ascii_lowercase())
		.cmp(b.bytes().map(|byte| byte.to_ascii_lowercase()))
}
