//! Topic and topic-filter validation.
//!
//! Route templates are this crate's own mini-language; topic filters use
//! the transport's wildcard syntax (`+`, `#`) and are validated here
//! before they reach the pending-subscription sets.

use thiserror::Error;

/// Maximum topic length accepted by the transport contract.
pub const MAX_TOPIC_LENGTH: usize = 65_535;

/// Errors raised by topic and topic-filter validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicValidationError {
	/// Topic is empty or exceeds the protocol length limit
	#[error("Topic '{topic}' is empty or too long")]
	InvalidLength {
		/// The offending topic
		topic: String,
	},

	/// Publish topics may not contain wildcards or NUL bytes
	#[error(
		"Topic '{topic}' contains illegal characters ('#', '+', or null \
		 byte)"
	)]
	IllegalCharacters {
		/// The offending topic
		topic: String,
	},

	/// Wildcard placement broke the filter grammar
	#[error("Invalid topic filter '{filter}': {reason}")]
	InvalidFilter {
		/// The offending filter
		filter: String,
		/// What was wrong with it
		reason: String,
	},
}

/// Validates a topic used for publishing.
pub fn validate_publish_topic(topic: &str) -> Result<(), TopicValidationError> {
	if topic.is_empty() || topic.len() > MAX_TOPIC_LENGTH {
		return Err(TopicValidationError::InvalidLength {
			topic: topic.to_string(),
		});
	}
	if topic.chars().any(|c| matches!(c, '\0' | '#' | '+')) {
		return Err(TopicValidationError::IllegalCharacters {
			topic: topic.to_string(),
		});
	}
	Ok(())
}

/// Validates a subscription topic filter.
///
/// `+` must occupy an entire level; `#` must occupy the entire last level.
pub fn validate_topic_filter(filter: &str) -> Result<(), TopicValidationError> {
	if filter.is_empty() || filter.len() > MAX_TOPIC_LENGTH {
		return Err(TopicValidationError::InvalidLength {
			topic: filter.to_string(),
		});
	}
	if filter.contains('\0') {
		return Err(TopicValidationError::InvalidFilter {
			filter: filter.to_string(),
			reason: "null byte is not allowed".to_string(),
		});
	}

	let levels: Vec<&str> = filter.split('/').collect();
	for (i, level) in levels.iter().enumerate() {
		if level.contains('+') && *level != "+" {
			return Err(TopicValidationError::InvalidFilter {
				filter: filter.to_string(),
				reason: "'+' must occupy an entire level".to_string(),
			});
		}
		if level.contains('#') {
			if *level != "#" {
				return Err(TopicValidationError::InvalidFilter {
					filter: filter.to_string(),
					reason: "'#' must occupy an entire level".to_string(),
				});
			}
			if i != levels.len() - 1 {
				return Err(TopicValidationError::InvalidFilter {
					filter: filter.to_string(),
					reason: "'#' can only be the last level".to_string(),
				});
			}
		}
	}
	Ok(())
}
