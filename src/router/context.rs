//! Per-message routing state.

use std::collections::HashMap;

use arcstr::{ArcStr, Substr};
use smallvec::SmallVec;

use crate::constraint::ParamValue;
use std::sync::Arc;

use super::registry::HandlerDescriptor;

/// Mutable state threaded through route matching for one topic.
///
/// Created from the incoming topic, filled in by the first route that
/// matches: captured parameter values plus the winning handler.
#[derive(Debug, Default)]
pub struct RouteContext {
	topic: ArcStr,
	segments: SmallVec<[Substr; 8]>,
	/// Values captured from the topic, keyed by parameter name.
	pub params: HashMap<ArcStr, ParamValue>,
	/// Handler of the matched route, if any.
	pub handler: Option<Arc<HandlerDescriptor>>,
	/// Template text of the matched route, for diagnostics.
	pub matched_template: Option<ArcStr>,
	/// Group template of the matched route, tokens replaced.
	pub matched_group_template: Option<ArcStr>,
}

impl RouteContext {
	/// Splits `topic` into `/`-separated segments.
	///
	/// Leading and trailing slashes are ignored so `/a/b/` routes the
	/// same as `a/b`. Segment storage borrows from the topic without
	/// copying.
	pub fn new(topic: impl Into<ArcStr>) -> Self {
		let topic: ArcStr = topic.into();
		let trimmed = topic.substr_from(topic.trim_matches('/'));
		let segments = if trimmed.is_empty() {
			SmallVec::new()
		} else {
			trimmed
				.split('/')
				.map(|part| trimmed.substr_from(part))
				.collect()
		};
		Self {
			topic,
			segments,
			params: HashMap::new(),
			handler: None,
			matched_template: None,
			matched_group_template: None,
		}
	}

	/// The original topic.
	pub fn topic(&self) -> &ArcStr {
		&self.topic
	}

	/// Topic segments, slashes stripped.
	pub fn segments(&self) -> &[Substr] {
		&self.segments
	}

	/// Case-insensitive parameter lookup.
	pub fn param(&self, name: &str) -> Option<&ParamValue> {
		self.params
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_topic_into_segments() {
		let context = RouteContext::new("devices/abc/telemetry");
		let segments: Vec<&str> =
			context.segments().iter().map(|s| s.as_str()).collect();
		assert_eq!(segments, ["devices", "abc", "telemetry"]);
	}

	#[test]
	fn trims_surrounding_slashes() {
		let context = RouteContext::new("/devices/abc/");
		assert_eq!(context.segments().len(), 2);
	}

	#[test]
	fn empty_topic_has_no_segments() {
		assert!(RouteContext::new("").segments().is_empty());
		assert!(RouteContext::new("/").segments().is_empty());
	}

	#[test]
	fn param_lookup_ignores_case() {
		let mut context = RouteContext::new("a/b");
		context.params.insert(
			arcstr::literal!("DeviceId"),
			ParamValue::Str(arcstr::literal!("abc")),
		);
		assert!(context.param("deviceid").is_some());
		assert!(context.param("missing").is_none());
	}
}
