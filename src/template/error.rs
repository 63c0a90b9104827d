//! Template parsing error types.

use thiserror::Error;

use crate::constraint::UnknownConstraintError;

/// Errors raised while parsing a route template.
///
/// All variants are configuration errors: they surface synchronously at
/// route-table build time and are never recovered from per-message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
	/// Two consecutive slashes produced an empty segment
	#[error("Invalid template '{template}'. Empty segments are not allowed.")]
	EmptySegment {
		/// The offending template
		template: String,
	},

	/// A literal segment ends with `}` without an opening brace
	#[error(
		"Invalid template '{template}'. Missing '{{' in parameter segment \
		 '{segment}'."
	)]
	MissingOpeningBrace {
		/// The offending template
		template: String,
		/// The offending segment
		segment: String,
	},

	/// A parameter segment is missing its closing brace
	#[error(
		"Invalid template '{template}'. Missing '}}' in parameter segment \
		 '{segment}'."
	)]
	MissingClosingBrace {
		/// The offending template
		template: String,
		/// The offending segment
		segment: String,
	},

	/// `{}` with no name between the braces
	#[error(
		"Invalid template '{template}'. Empty parameter name in segment \
		 '{segment}' is not allowed."
	)]
	EmptyParameterName {
		/// The offending template
		template: String,
		/// The offending segment
		segment: String,
	},

	/// A parameter name contains `{`, `}`, `=` or `.`
	#[error(
		"Invalid template '{template}'. The character '{character}' in \
		 parameter segment '{segment}' is not allowed."
	)]
	InvalidParameterCharacter {
		/// The offending template
		template: String,
		/// The offending segment
		segment: String,
		/// The illegal character
		character: char,
	},

	/// `?` appearing anywhere but the end of a parameter name
	#[error(
		"Malformed parameter '{segment}' in template '{template}'. '?' can \
		 only appear at the end of a parameter name."
	)]
	MalformedOptionalMarker {
		/// The offending template
		template: String,
		/// The offending segment
		segment: String,
	},

	/// `*` used anywhere but the very start of a catch-all token
	#[error(
		"Invalid template '{template}'. A catch-all parameter may only have \
		 one '*' at the beginning of the segment '{segment}'."
	)]
	InvalidCatchAllToken {
		/// The offending template
		template: String,
		/// The offending segment
		segment: String,
	},

	/// Catch-all parameters cannot be optional
	#[error(
		"Invalid segment '{segment}' in template '{template}'. A catch-all \
		 parameter cannot be marked optional."
	)]
	OptionalCatchAll {
		/// The offending template
		template: String,
		/// The offending segment
		segment: String,
	},

	/// A catch-all segment must be the last segment
	#[error(
		"Invalid template '{template}'. A catch-all parameter can only \
		 appear as the last segment of the route template."
	)]
	CatchAllNotLast {
		/// The offending template
		template: String,
	},

	/// A required segment follows an optional parameter
	#[error(
		"Invalid template '{template}'. Non-optional parameters or literal \
		 routes cannot appear after optional parameters."
	)]
	OptionalBeforeRequired {
		/// The offending template
		template: String,
	},

	/// The same parameter name appears twice (case-insensitive)
	#[error(
		"Invalid template '{template}'. The parameter '{name}' appears \
		 multiple times."
	)]
	DuplicateParameter {
		/// The offending template
		template: String,
		/// The duplicated parameter name
		name: String,
	},

	/// A constraint name was not recognized
	#[error(transparent)]
	UnknownConstraint(#[from] UnknownConstraintError),

	/// A constraint list has no parameter name before it (`{:int}`)
	#[error(
		"Malformed parameter '{segment}' in template '{template}' has no \
		 name before the constraints list."
	)]
	MissingNameBeforeConstraints {
		/// The offending template
		template: String,
		/// The offending segment
		segment: String,
	},
}
