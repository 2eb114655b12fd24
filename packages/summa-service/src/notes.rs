use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use summa_domain::{Note, NoteStatus};

use crate::{Error, NoteService, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteRequest {
	pub owner_id: String,
	pub raw_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteFetchRequest {
	pub owner_id: String,
	pub note_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteResponse {
	#[serde(rename = "id")]
	pub note_id: Uuid,
	pub raw_text: String,
	pub status: NoteStatus,
	pub summary: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl From<Note> for NoteResponse {
	fn from(note: Note) -> Self {
		Self {
			note_id: note.note_id,
			raw_text: note.raw_text,
			status: note.status,
			summary: note.summary,
			created_at: note.created_at,
			updated_at: note.updated_at,
		}
	}
}

impl NoteService {
	/// Persists the note in `queued` state and submits its summary job.
	///
	/// The response is the note as created. Pipeline failures never fail this call; they show up
	/// as `failed` on a later retrieval.
	pub async fn create_note(&self, req: CreateNoteRequest) -> Result<NoteResponse> {
		let owner_id = validate_owner(&req.owner_id)?;
		let max_chars = self.cfg.notes.max_raw_text_chars as usize;

		if req.raw_text.chars().count() > max_chars {
			return Err(Error::invalid_field(
				"$.raw_text",
				format!("raw_text must be at most {max_chars} characters."),
			));
		}

		let note = self.store.insert_note(owner_id, &req.raw_text).await?;

		tracing::info!(note_id = %note.note_id, "Note created.");

		self.enqueuer.submit(&note).await;

		Ok(note.into())
	}

	/// Fetches a note owned by `owner_id`. Notes of other owners look exactly like missing ones.
	pub async fn get_note(&self, req: NoteFetchRequest) -> Result<NoteResponse> {
		let owner_id = validate_owner(&req.owner_id)?;
		let note = self.store.fetch_note(req.note_id).await?;

		match note {
			Some(note) if note.owner_id == owner_id => Ok(note.into()),
			_ => Err(Error::NotFound { message: format!("Note {} not found.", req.note_id) }),
		}
	}
}

pub(crate) fn validate_owner(owner_id: &str) -> Result<&str> {
	let owner_id = owner_id.trim();

	if owner_id.is_empty() {
		return Err(Error::InvalidRequest { message: "owner_id is required.".to_string() });
	}

	Ok(owner_id)
}
