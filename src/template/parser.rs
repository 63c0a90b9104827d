//! Route template parsing.
//!
//! Pure functions, no side effects; safe to call concurrently and
//! repeatedly. Callers are expected to cache parsed templates.

use super::error::TemplateError;
use super::route_template::RouteTemplate;
use super::segment::TemplateSegment;

/// Characters not allowed inside a parameter name.
pub const INVALID_PARAMETER_NAME_CHARACTERS: [char; 4] =
	['{', '}', '=', '.'];

/// Parses a route template string into a [`RouteTemplate`].
///
/// Leading and trailing `/` are trimmed before splitting; the empty
/// template parses to zero segments.
pub fn parse_template(template: &str) -> Result<RouteTemplate, TemplateError> {
	let trimmed = template.trim_matches('/');
	if trimmed.is_empty() {
		return Ok(RouteTemplate::new(trimmed, Vec::new()));
	}

	let mut segments = Vec::new();
	for segment in trimmed.split('/') {
		segments.push(parse_segment(trimmed, segment)?);
	}

	validate_segment_order(trimmed, &segments)?;
	Ok(RouteTemplate::new(trimmed, segments))
}

fn parse_segment(
	template: &str,
	segment: &str,
) -> Result<TemplateSegment, TemplateError> {
	if segment.is_empty() {
		return Err(TemplateError::EmptySegment {
			template: template.to_string(),
		});
	}

	if !segment.starts_with('{') {
		return parse_literal_segment(template, segment);
	}
	parse_parameter_segment(template, segment)
}

fn parse_literal_segment(
	template: &str,
	segment: &str,
) -> Result<TemplateSegment, TemplateError> {
	if segment.ends_with('}') {
		return Err(TemplateError::MissingOpeningBrace {
			template: template.to_string(),
			segment: segment.to_string(),
		});
	}
	TemplateSegment::new(template, segment, false)
}

fn parse_parameter_segment(
	template: &str,
	segment: &str,
) -> Result<TemplateSegment, TemplateError> {
	if !segment.ends_with('}') {
		return Err(TemplateError::MissingClosingBrace {
			template: template.to_string(),
			segment: segment.to_string(),
		});
	}
	if segment.len() < 3 {
		return Err(TemplateError::EmptyParameterName {
			template: template.to_string(),
			segment: segment.to_string(),
		});
	}

	let inner = &segment[1 .. segment.len() - 1];
	if let Some(character) = inner
		.chars()
		.find(|c| INVALID_PARAMETER_NAME_CHARACTERS.contains(c))
	{
		return Err(TemplateError::InvalidParameterCharacter {
			template: template.to_string(),
			segment: segment.to_string(),
			character,
		});
	}

	TemplateSegment::new(template, inner, true)
}

fn validate_segment_order(
	template: &str,
	segments: &[TemplateSegment],
) -> Result<(), TemplateError> {
	for (i, current) in segments.iter().enumerate() {
		if current.is_catch_all() && i != segments.len() - 1 {
			return Err(TemplateError::CatchAllNotLast {
				template: template.to_string(),
			});
		}

		if !current.is_parameter() {
			continue;
		}

		for next in &segments[i + 1 ..] {
			if current.is_optional() && !next.is_optional() {
				return Err(TemplateError::OptionalBeforeRequired {
					template: template.to_string(),
				});
			}

			if current.value().eq_ignore_ascii_case(next.value()) {
				return Err(TemplateError::DuplicateParameter {
					template: template.to_string(),
					name: current.value().to_string(),
				});
			}
		}
	}
	Ok(())
}
