//! A single compiled route: parsed template plus its handler.

use std::sync::Arc;

use arcstr::ArcStr;
use smallvec::SmallVec;

use super::context::RouteContext;
use super::registry::HandlerDescriptor;
use crate::constraint::ParamValue;
use crate::template::RouteTemplate;

/// Scratch space for captured values during one match attempt.
type CapturedParams = SmallVec<[(ArcStr, ParamValue); 4]>;

/// One entry of the route table.
#[derive(Debug, Clone)]
pub struct Route {
	template: RouteTemplate,
	handler: Arc<HandlerDescriptor>,
	/// Token-replaced group template this route was expanded from.
	group_template: Option<ArcStr>,
	/// Parameter names declared by the handler's other templates but
	/// absent from this one. Bound to `Null` on a match so the
	/// handler's signature always resolves.
	unused_parameter_names: Vec<ArcStr>,
}

impl Route {
	pub(crate) fn new(
		template: RouteTemplate,
		handler: Arc<HandlerDescriptor>,
		group_template: Option<ArcStr>,
		unused_parameter_names: Vec<ArcStr>,
	) -> Self {
		Self { template, handler, group_template, unused_parameter_names }
	}

	/// The parsed template this route matches against.
	pub fn template(&self) -> &RouteTemplate {
		&self.template
	}

	/// The handler invoked when this route matches.
	pub fn handler(&self) -> &Arc<HandlerDescriptor> {
		&self.handler
	}

	/// The group template the route belongs to, tokens replaced.
	pub fn group_template(&self) -> Option<&ArcStr> {
		self.group_template.as_ref()
	}

	/// Attempts to match `context` against this route.
	///
	/// On success the captured parameter values and the handler are
	/// written into the context; on failure the context is left
	/// untouched.
	pub fn match_context(&self, context: &mut RouteContext) -> bool {
		let template_len = self.template.segments().len();
		let topic_len = context.segments().len();

		// Remainder bound to a catch-all parameter, precomputed so the
		// segment loop can short-circuit on it.
		let catch_all_value: Option<ArcStr> =
			if self.template.contains_catch_all()
				&& topic_len >= template_len
			{
				Some(
					context.segments()[template_len - 1..]
						.iter()
						.map(|s| s.as_str())
						.collect::<Vec<_>>()
						.join("/")
						.into(),
				)
			} else {
				None
			};

		if !self.template.contains_catch_all()
			&& self.template.optional_segment_count() == 0
			&& template_len != topic_len
		{
			return false;
		}

		let mut params: CapturedParams = SmallVec::new();
		let matching_segments = self.calculate_matching_segments(
			context,
			&mut params,
			catch_all_value,
		);

		if !self.template.contains_catch_all()
			&& !self.unused_parameter_names.is_empty()
		{
			for name in &self.unused_parameter_names {
				params.push((name.clone(), ParamValue::Null));
			}
		}

		if !self.is_valid_match(topic_len, matching_segments) {
			return false;
		}

		for (name, value) in params {
			context.params.insert(name, value);
		}
		context.handler = Some(Arc::clone(&self.handler));
		context.matched_template = Some(self.template.text().clone());
		context.matched_group_template = self.group_template.clone();
		true
	}

	fn calculate_matching_segments(
		&self,
		context: &RouteContext,
		params: &mut CapturedParams,
		catch_all_value: Option<ArcStr>,
	) -> usize {
		let mut matching = 0;
		for (i, segment) in self.template.segments().iter().enumerate() {
			if segment.is_catch_all() {
				matching += 1;
				let value = match catch_all_value {
					| Some(remainder) => ParamValue::Str(remainder),
					| None => ParamValue::Null,
				};
				params.push((segment.value().clone(), value));
				break;
			}

			let matched = context
				.segments()
				.get(i)
				.and_then(|topic_segment| {
					segment.match_segment(topic_segment.as_str())
				});
			let Some(value) = matched else {
				break;
			};

			matching += 1;
			if segment.is_parameter() {
				params.push((segment.value().clone(), value));
			}
		}
		matching
	}

	fn is_valid_match(
		&self,
		topic_len: usize,
		matching_segments: usize,
	) -> bool {
		let all_topic_segments_match = matching_segments >= topic_len;
		let all_non_optional_match = matching_segments
			>= self.template.segments().len()
				- self.template.optional_segment_count();

		self.template.contains_catch_all()
			|| (all_topic_segments_match && all_non_optional_match)
	}
}
