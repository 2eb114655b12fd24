use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use summa_domain::{Note, NoteStatus};

use crate::Error;

#[derive(Debug, sqlx::FromRow)]
pub struct NoteRow {
	pub note_id: Uuid,
	pub owner_id: String,
	pub raw_text: String,
	pub status: String,
	pub summary: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl TryFrom<NoteRow> for Note {
	type Error = Error;

	fn try_from(row: NoteRow) -> Result<Self, Self::Error> {
		let status = row
			.status
			.parse::<NoteStatus>()
			.map_err(|err| Error::InvalidRow(format!("note {}: {err}", row.note_id)))?;

		Ok(Self {
			note_id: row.note_id,
			owner_id: row.owner_id,
			raw_text: row.raw_text,
			status,
			summary: row.summary,
			created_at: row.created_at,
			updated_at: row.updated_at,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct SummaryJob {
	pub job_id: Uuid,
	pub queue: String,
	pub payload: Value,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
