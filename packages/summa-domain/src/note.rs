use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::transition::{Transition, TransitionOutcome};

/// Processing state of a note's summary.
///
/// The lowercase names are the stored and wire representation and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
	Queued,
	Processing,
	Done,
	Failed,
}
impl NoteStatus {
	pub const ALL: [Self; 4] = [Self::Queued, Self::Processing, Self::Done, Self::Failed];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Queued => "queued",
			Self::Processing => "processing",
			Self::Done => "done",
			Self::Failed => "failed",
		}
	}

	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Done | Self::Failed)
	}
}
impl fmt::Display for NoteStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for NoteStatus {
	type Err = ParseStatusError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|status| status.as_str() == value)
			.ok_or_else(|| ParseStatusError { value: value.to_string() })
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown note status {value:?}.")]
pub struct ParseStatusError {
	pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
	pub note_id: Uuid,
	pub owner_id: String,
	pub raw_text: String,
	pub status: NoteStatus,
	pub summary: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl Note {
	/// A freshly created note, waiting for its summary job.
	pub fn queued(
		note_id: Uuid,
		owner_id: impl Into<String>,
		raw_text: impl Into<String>,
		now: OffsetDateTime,
	) -> Self {
		Self {
			note_id,
			owner_id: owner_id.into(),
			raw_text: raw_text.into(),
			status: NoteStatus::Queued,
			summary: None,
			created_at: now,
			updated_at: now,
		}
	}

	/// Applies `transition` in place when the current status allows it.
	///
	/// Stores without a native conditional update call this while holding exclusive access to
	/// the note.
	pub fn apply(&mut self, transition: &Transition, now: OffsetDateTime) -> TransitionOutcome {
		if !transition.allows(self.status) {
			return TransitionOutcome::Conflict { current: self.status };
		}

		self.status = transition.to();
		self.summary = transition.summary().map(str::to_string);
		self.updated_at = now;

		TransitionOutcome::Applied(self.clone())
	}
}
