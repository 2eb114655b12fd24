use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{Error, Result};

pub const DESCRIPTOR_VERSION: u64 = 1;

/// A request to summarize one note.
///
/// The wire form is `{"v":1,"note_id":"<uuid>"}`. Workers re-read the note by id, so nothing else
/// travels with the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobDescriptor {
	pub note_id: Uuid,
}
impl JobDescriptor {
	pub fn new(note_id: Uuid) -> Self {
		Self { note_id }
	}

	pub fn to_json(&self) -> Value {
		serde_json::json!({ "v": DESCRIPTOR_VERSION, "note_id": self.note_id })
	}

	pub fn encode(&self) -> String {
		self.to_json().to_string()
	}

	pub fn decode(raw: &str) -> Result<Self> {
		let value: Value =
			serde_json::from_str(raw).map_err(|err| Error::InvalidPayload(err.to_string()))?;

		Self::from_json(value)
	}

	pub fn from_json(value: Value) -> Result<Self> {
		let version = value
			.get("v")
			.and_then(Value::as_u64)
			.ok_or_else(|| Error::InvalidPayload("missing numeric field v.".to_string()))?;

		if version != DESCRIPTOR_VERSION {
			return Err(Error::UnsupportedVersion(version));
		}

		let wire: WireDescriptor =
			serde_json::from_value(value).map_err(|err| Error::InvalidPayload(err.to_string()))?;

		Ok(Self { note_id: wire.note_id })
	}
}

#[derive(Debug, Serialize, Deserialize)]
struct WireDescriptor {
	v: u64,
	note_id: Uuid,
}
