//! Route parameter constraints and the typed-value conversion table.
//!
//! Constraints attach to template parameters (`{id:int}`) and double as the
//! conversion dispatch used when binding handler parameters: both paths go
//! through the same pure parse functions keyed by [`TargetType`].

use std::fmt;

use arcstr::ArcStr;
use thiserror::Error;
use uuid::Uuid;

/// Target representation for a bound route parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
	/// Keep the raw segment text
	Str,
	/// 32-bit signed integer
	I32,
	/// 64-bit signed integer
	I64,
	/// 32-bit unsigned integer
	U32,
	/// 64-bit unsigned integer
	U64,
	/// 32-bit float
	F32,
	/// 64-bit float
	F64,
	/// Boolean (`true`/`false`, case-insensitive)
	Bool,
	/// Unique identifier (UUID/GUID textual forms)
	Uuid,
	/// Structured payload value (JSON)
	Json,
}

impl TargetType {
	/// Parses `text` into a value of this target type.
	///
	/// Pure function; returns `None` when the text is not a valid
	/// representation. Used both by route constraints (during matching)
	/// and by the dispatcher's parameter conversion.
	pub fn parse(self, text: &str) -> Option<ParamValue> {
		match self {
			| TargetType::Str => Some(ParamValue::Str(ArcStr::from(text))),
			| TargetType::I32 => {
				text.parse::<i32>().ok().map(ParamValue::I32)
			}
			| TargetType::I64 => {
				text.parse::<i64>().ok().map(ParamValue::I64)
			}
			| TargetType::U32 => {
				text.parse::<u32>().ok().map(ParamValue::U32)
			}
			| TargetType::U64 => {
				text.parse::<u64>().ok().map(ParamValue::U64)
			}
			| TargetType::F32 => {
				text.parse::<f32>().ok().map(ParamValue::F32)
			}
			| TargetType::F64 => {
				text.parse::<f64>().ok().map(ParamValue::F64)
			}
			| TargetType::Bool => match text.to_ascii_lowercase().as_str() {
				| "true" | "1" => Some(ParamValue::Bool(true)),
				| "false" | "0" => Some(ParamValue::Bool(false)),
				| _ => None,
			},
			| TargetType::Uuid => {
				Uuid::parse_str(text).ok().map(ParamValue::Uuid)
			}
			| TargetType::Json => {
				serde_json::from_str(text).ok().map(ParamValue::Json)
			}
		}
	}

	/// Zero value bound when a payload parameter receives an empty payload.
	pub fn zero_value(self) -> ParamValue {
		match self {
			| TargetType::Str => ParamValue::Null,
			| TargetType::I32 => ParamValue::I32(0),
			| TargetType::I64 => ParamValue::I64(0),
			| TargetType::U32 => ParamValue::U32(0),
			| TargetType::U64 => ParamValue::U64(0),
			| TargetType::F32 => ParamValue::F32(0.0),
			| TargetType::F64 => ParamValue::F64(0.0),
			| TargetType::Bool => ParamValue::Bool(false),
			| TargetType::Uuid => ParamValue::Uuid(Uuid::nil()),
			| TargetType::Json => ParamValue::Null,
		}
	}
}

/// Value bound to a route or handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
	/// Declared but absent parameter
	Null,
	/// Raw segment text
	Str(ArcStr),
	/// 32-bit signed integer
	I32(i32),
	/// 64-bit signed integer
	I64(i64),
	/// 32-bit unsigned integer
	U32(u32),
	/// 64-bit unsigned integer
	U64(u64),
	/// 32-bit float
	F32(f32),
	/// 64-bit float
	F64(f64),
	/// Boolean
	Bool(bool),
	/// Unique identifier
	Uuid(Uuid),
	/// Structured payload value
	Json(serde_json::Value),
}

impl ParamValue {
	/// Returns true when this value already has the given representation.
	pub fn is_of(&self, target: TargetType) -> bool {
		matches!(
			(self, target),
			(ParamValue::Str(_), TargetType::Str)
				| (ParamValue::I32(_), TargetType::I32)
				| (ParamValue::I64(_), TargetType::I64)
				| (ParamValue::U32(_), TargetType::U32)
				| (ParamValue::U64(_), TargetType::U64)
				| (ParamValue::F32(_), TargetType::F32)
				| (ParamValue::F64(_), TargetType::F64)
				| (ParamValue::Bool(_), TargetType::Bool)
				| (ParamValue::Uuid(_), TargetType::Uuid)
				| (ParamValue::Json(_), TargetType::Json)
		)
	}

	/// Converts this value to the given target representation.
	///
	/// Values already of the right representation pass through unchanged;
	/// `Null` stays `Null` (declared-but-unused parameters bind to null).
	/// Everything else is rendered to text and re-parsed through the
	/// conversion table.
	pub fn convert(&self, target: TargetType) -> Option<ParamValue> {
		if self.is_of(target) || matches!(self, ParamValue::Null) {
			return Some(self.clone());
		}
		target.parse(&self.render())
	}

	/// Textual form used for conversions and error reporting.
	pub fn render(&self) -> String {
		match self {
			| ParamValue::Null => String::new(),
			| ParamValue::Str(s) => s.to_string(),
			| ParamValue::I32(v) => v.to_string(),
			| ParamValue::I64(v) => v.to_string(),
			| ParamValue::U32(v) => v.to_string(),
			| ParamValue::U64(v) => v.to_string(),
			| ParamValue::F32(v) => v.to_string(),
			| ParamValue::F64(v) => v.to_string(),
			| ParamValue::Bool(v) => v.to_string(),
			| ParamValue::Uuid(v) => v.to_string(),
			| ParamValue::Json(v) => v.to_string(),
		}
	}

	/// Returns the string content when this value is textual.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			| ParamValue::Str(s) => Some(s.as_str()),
			| _ => None,
		}
	}
}

impl fmt::Display for ParamValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.render())
	}
}

/// Unknown constraint name in a route template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
	"Unsupported constraint '{constraint}' in segment '{segment}' of \
	 template '{template}'"
)]
pub struct UnknownConstraintError {
	/// The template containing the bad constraint
	pub template: String,
	/// The offending segment token
	pub segment: String,
	/// The constraint name that was not recognized
	pub constraint: String,
}

/// A named, typed validator/converter attached to a route parameter.
///
/// Matching a constraint both validates the segment text and transforms it
/// into the constraint's target representation (`id:int` binds `I32(42)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConstraint {
	name: ArcStr,
	target: TargetType,
}

impl RouteConstraint {
	/// Resolves a constraint token (optionally suffixed with `?`) from a
	/// template segment.
	pub fn parse(
		template: &str,
		segment: &str,
		token: &str,
	) -> Result<Self, UnknownConstraintError> {
		let name = token.strip_suffix('?').unwrap_or(token);
		let target = match name {
			| "int" => TargetType::I32,
			| "long" => TargetType::I64,
			| "uint" => TargetType::U32,
			| "ulong" => TargetType::U64,
			| "float" => TargetType::F32,
			| "double" => TargetType::F64,
			| "bool" => TargetType::Bool,
			| "guid" | "uuid" => TargetType::Uuid,
			| "alpha" => TargetType::Str,
			| _ => {
				return Err(UnknownConstraintError {
					template: template.to_string(),
					segment: segment.to_string(),
					constraint: name.to_string(),
				});
			}
		};
		Ok(Self {
			name: ArcStr::from(name),
			target,
		})
	}

	/// Constraint name as written in the template.
	pub fn name(&self) -> &ArcStr {
		&self.name
	}

	/// Target representation produced by this constraint.
	pub fn target(&self) -> TargetType {
		self.target
	}

	/// Validates and converts one path segment.
	pub fn match_segment(&self, segment: &str) -> Option<ParamValue> {
		if self.name.as_str() == "alpha"
			&& !segment.chars().all(|c| c.is_ascii_alphabetic())
		{
			return None;
		}
		self.target.parse(segment)
	}
}
