//! The only sanctioned way to change a note's `status` and `summary`.
//!
//! A [`Transition`] names the statuses it may start from, the status it moves to and the summary
//! it writes. Its constructors reject every combination that would break the note invariants:
//!
//! - `summary` is non-empty if and only if the target is [`NoteStatus::Done`].
//! - A terminal note (`done` or `failed`) may only be reset to [`NoteStatus::Queued`].
//!
//! Stores apply a transition atomically and report [`TransitionOutcome::Conflict`] when the
//! current status is not in the allowed source set.

use crate::note::{Note, NoteStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
	from_allowed: Vec<NoteStatus>,
	to: NoteStatus,
	summary: Option<String>,
}
impl Transition {
	pub fn new(
		from_allowed: impl IntoIterator<Item = NoteStatus>,
		to: NoteStatus,
		summary: Option<String>,
	) -> Result<Self, TransitionError> {
		let mut from = Vec::new();

		for status in from_allowed {
			if !from.contains(&status) {
				from.push(status);
			}
		}

		if from.is_empty() {
			return Err(TransitionError::EmptySourceSet);
		}
		if to != NoteStatus::Queued && from.iter().any(|status| status.is_terminal()) {
			return Err(TransitionError::LeavesTerminal { to });
		}

		match (to, summary.as_deref()) {
			(NoteStatus::Done, Some(text)) if !text.trim().is_empty() => {},
			(NoteStatus::Done, _) => return Err(TransitionError::SummaryRequired),
			(_, Some(_)) => return Err(TransitionError::UnexpectedSummary { to }),
			(_, None) => {},
		}

		Ok(Self { from_allowed: from, to, summary })
	}

	/// A worker takes ownership of a note before summarizing it.
	///
	/// `processing` is an allowed source so a redelivered job can finish a note whose previous
	/// worker died mid-job.
	pub fn claim() -> Self {
		Self {
			from_allowed: vec![NoteStatus::Queued, NoteStatus::Processing],
			to: NoteStatus::Processing,
			summary: None,
		}
	}

	pub fn complete(summary: impl Into<String>) -> Result<Self, TransitionError> {
		Self::new([NoteStatus::Processing], NoteStatus::Done, Some(summary.into()))
	}

	pub fn execution_failed() -> Self {
		Self {
			from_allowed: vec![NoteStatus::Processing],
			to: NoteStatus::Failed,
			summary: None,
		}
	}

	pub fn submission_failed() -> Self {
		Self { from_allowed: vec![NoteStatus::Queued], to: NoteStatus::Failed, summary: None }
	}

	pub fn from_allowed(&self) -> &[NoteStatus] {
		&self.from_allowed
	}

	pub fn to(&self) -> NoteStatus {
		self.to
	}

	pub fn summary(&self) -> Option<&str> {
		self.summary.as_deref()
	}

	pub fn allows(&self, current: NoteStatus) -> bool {
		self.from_allowed.contains(&current)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
	#[error("A transition needs at least one allowed source status.")]
	EmptySourceSet,
	#[error("A transition to done requires a non-empty summary.")]
	SummaryRequired,
	#[error("A transition to {to} must not carry a summary.")]
	UnexpectedSummary { to: NoteStatus },
	#[error("Terminal notes may only be reset to queued, not moved to {to}.")]
	LeavesTerminal { to: NoteStatus },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
	Applied(Note),
	/// The note exists but its status was not in the allowed source set.
	Conflict {
		current: NoteStatus,
	},
	NotFound,
}
impl TransitionOutcome {
	pub fn is_applied(&self) -> bool {
		matches!(self, Self::Applied(_))
	}
}
