//! Versioned envelope for persisted records.
//!
//! Every blob is written as `{"version": N, "data": ...}`. A blob carrying any other version is
//! read as absent rather than migrated.

use crate::offline::OfflineSyncError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Schema version written with every record.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct Envelope<'a, T> {
	version: u32,
	data: &'a T,
}

#[derive(Deserialize)]
struct RawEnvelope {
	version: u32,
	data: serde_json::Value,
}

/// Serializes `value` inside a versioned envelope.
pub fn encode<T: Serialize>(value: &T) -> Result<String, OfflineSyncError> {
	Ok(serde_json::to_string(&Envelope {
		version: SCHEMA_VERSION,
		data: value,
	})?)
}

/// Deserializes a versioned blob.
///
/// Returns `Ok(None)` for a well-formed envelope with an unknown version, and an error for
/// anything that is not a valid envelope of `T`.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<Option<T>, OfflineSyncError> {
	let envelope: RawEnvelope = serde_json::from_str(raw)?;
	if envelope.version != SCHEMA_VERSION {
		warn!(
			"Ignoring record with unsupported schema version {} (expected {})",
			envelope.version, SCHEMA_VERSION
		);
		return Ok(None);
	}
	Ok(Some(serde_json::from_value(envelope.data)?))
}
