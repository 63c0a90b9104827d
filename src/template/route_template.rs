//! A parsed route template.

use arcstr::ArcStr;

use super::segment::TemplateSegment;

/// An ordered sequence of [`TemplateSegment`]s plus the original text.
///
/// Two templates are equal iff their text and segment sequences are equal.
#[derive(Debug, Clone)]
pub struct RouteTemplate {
	text: ArcStr,
	segments: Vec<TemplateSegment>,
	optional_segment_count: usize,
	contains_catch_all: bool,
}

impl RouteTemplate {
	pub(crate) fn new(
		text: impl Into<ArcStr>,
		segments: Vec<TemplateSegment>,
	) -> Self {
		let optional_segment_count =
			segments.iter().filter(|s| s.is_optional()).count();
		let contains_catch_all =
			segments.iter().any(|s| s.is_catch_all());
		Self {
			text: text.into(),
			segments,
			optional_segment_count,
			contains_catch_all,
		}
	}

	/// Trimmed template text this instance was parsed from.
	pub fn text(&self) -> &ArcStr {
		&self.text
	}

	/// Ordered template segments.
	pub fn segments(&self) -> &[TemplateSegment] {
		&self.segments
	}

	/// Number of optional segments.
	pub fn optional_segment_count(&self) -> usize {
		self.optional_segment_count
	}

	/// Returns true when the last segment is a catch-all.
	pub fn contains_catch_all(&self) -> bool {
		self.contains_catch_all
	}

	/// Names of all parameter segments, in template order.
	pub fn parameter_names(&self) -> impl Iterator<Item = &ArcStr> {
		self.segments
			.iter()
			.filter(|s| s.is_parameter())
			.map(|s| s.value())
	}
}

impl PartialEq for RouteTemplate {
	fn eq(&self, other: &Self) -> bool {
		self.text == other.text && self.segments == other.segments
	}
}

impl Eq for RouteTemplate {}

impl std::fmt::Display for RouteTemplate {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.text)
	}
}
