//! Payload decoding hook used by parameter binding.
//!
//! Handlers that bind a parameter from the message body need the raw
//! bytes decoded into a [`serde_json::Value`] first. The default decoder
//! treats the payload as UTF-8 JSON; callers with a different wire
//! format (compressed, enveloped, ...) can install their own decoder.

use std::fmt;
use std::sync::Arc;

/// Payload decoder function signature.
pub type PayloadDecoder = dyn Fn(&[u8]) -> Result<serde_json::Value, serde_json::Error>
	+ Send
	+ Sync;

/// Configures how message payloads are decoded for parameter binding.
#[derive(Clone)]
pub struct PayloadOptions {
	decoder: Arc<PayloadDecoder>,
}

impl PayloadOptions {
	/// Creates options with a custom decoder.
	pub fn with_decoder<F>(decoder: F) -> Self
	where
		F: Fn(&[u8]) -> Result<serde_json::Value, serde_json::Error>
			+ Send
			+ Sync
			+ 'static,
	{
		Self { decoder: Arc::new(decoder) }
	}

	/// Decodes raw payload bytes into a JSON value.
	pub fn decode(
		&self,
		payload: &[u8],
	) -> Result<serde_json::Value, serde_json::Error> {
		(self.decoder)(payload)
	}
}

impl Default for PayloadOptions {
	fn default() -> Self {
		Self::with_decoder(|bytes| serde_json::from_slice(bytes))
	}
}

impl fmt::Debug for PayloadOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PayloadOptions").finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_decoder_parses_json() {
		let options = PayloadOptions::default();
		let value = options.decode(br#"{"speed": 42}"#).unwrap();
		assert_eq!(value["speed"], 42);
	}

	#[test]
	fn default_decoder_rejects_garbage() {
		let options = PayloadOptions::default();
		assert!(options.decode(b"\xff\xfe not json").is_err());
	}

	#[test]
	fn custom_decoder_is_used() {
		let options = PayloadOptions::with_decoder(|bytes| {
			Ok(serde_json::Value::from(bytes.len()))
		});
		assert_eq!(options.decode(b"abc").unwrap(), 3);
	}
}
