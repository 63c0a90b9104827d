//! One path element of a route template.

use arcstr::ArcStr;

use super::error::TemplateError;
use crate::constraint::{ParamValue, RouteConstraint};

/// A single `/`-separated element of a route template.
///
/// Literal segments match by case-insensitive text comparison; parameter
/// segments bind the corresponding topic segment (after passing their
/// constraints, which may also transform the value).
#[derive(Debug, Clone)]
pub struct TemplateSegment {
	value: ArcStr,
	is_parameter: bool,
	is_optional: bool,
	is_catch_all: bool,
	constraints: Vec<RouteConstraint>,
}

impl TemplateSegment {
	/// Builds a segment from its raw token.
	///
	/// `token` is the segment text with parameter braces already stripped
	/// when `is_parameter` is set (`*path`, `id:int?`, `room`).
	pub fn new(
		template: &str,
		token: &str,
		is_parameter: bool,
	) -> Result<Self, TemplateError> {
		let is_catch_all = token.starts_with('*');
		// Only one '*' allowed, and only at the very start
		let mut value = if is_catch_all { &token[1 ..] } else { token };
		if is_catch_all && value.contains('*') {
			return Err(TemplateError::InvalidCatchAllToken {
				template: template.to_string(),
				segment: token.to_string(),
			});
		}

		let mut is_optional = false;
		let mut constraints = Vec::new();

		if !is_parameter || !value.contains(':') {
			match value.find('?') {
				| Some(pos) if pos == value.len() - 1 => {
					is_optional = true;
					value = &value[.. value.len() - 1];
				}
				| Some(_) => {
					return Err(TemplateError::MalformedOptionalMarker {
						template: template.to_string(),
						segment: token.to_string(),
					});
				}
				| None => {}
			}
		} else {
			let mut tokens = value.split(':');
			let name = tokens.next().unwrap_or_default();
			if name.is_empty() {
				return Err(TemplateError::MissingNameBeforeConstraints {
					template: template.to_string(),
					segment: token.to_string(),
				});
			}

			for constraint_token in tokens {
				is_optional |= constraint_token.ends_with('?');
				constraints.push(RouteConstraint::parse(
					template,
					token,
					constraint_token,
				)?);
			}
			value = name;
		}

		let segment = Self {
			value: ArcStr::from(value),
			is_parameter,
			is_optional,
			is_catch_all,
			constraints,
		};

		if !is_parameter {
			return Ok(segment);
		}
		if segment.is_optional && segment.is_catch_all {
			return Err(TemplateError::OptionalCatchAll {
				template: template.to_string(),
				segment: token.to_string(),
			});
		}
		if segment.value.contains('*') {
			return Err(TemplateError::InvalidCatchAllToken {
				template: template.to_string(),
				segment: token.to_string(),
			});
		}
		Ok(segment)
	}

	/// Segment text: the literal to match, or the parameter name.
	pub fn value(&self) -> &ArcStr {
		&self.value
	}

	/// Returns true for `{name}`-style segments.
	pub fn is_parameter(&self) -> bool {
		self.is_parameter
	}

	/// Returns true for `{name?}`-style segments.
	pub fn is_optional(&self) -> bool {
		self.is_optional
	}

	/// Returns true for `{*name}`-style segments.
	pub fn is_catch_all(&self) -> bool {
		self.is_catch_all
	}

	/// Ordered constraints attached to this parameter.
	pub fn constraints(&self) -> &[RouteConstraint] {
		&self.constraints
	}

	/// Matches one topic segment against this template segment.
	///
	/// Literals compare case-insensitively and bind nothing. Parameters
	/// always match the text, provided every constraint accepts it; the
	/// last constraint's converted value wins, or the raw text when the
	/// parameter is unconstrained.
	pub fn match_segment(&self, path_segment: &str) -> Option<ParamValue> {
		if self.is_parameter {
			let mut matched = ParamValue::Str(ArcStr::from(path_segment));
			for constraint in &self.constraints {
				matched = constraint.match_segment(path_segment)?;
			}
			return Some(matched);
		}

		self.value
			.eq_ignore_ascii_case(path_segment)
			.then_some(ParamValue::Null)
	}
}

impl PartialEq for TemplateSegment {
	fn eq(&self, other: &Self) -> bool {
		self.is_catch_all == other.is_catch_all
			&& self.is_optional == other.is_optional
			&& self.is_parameter == other.is_parameter
			&& self.value == other.value
			&& self.constraints.len() == other.constraints.len()
			&& self.constraints.iter().all(|constraint| {
				other
					.constraints
					.iter()
					.any(|c| c.name() == constraint.name())
			})
	}
}

impl Eq for TemplateSegment {}
