use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use summa_domain::{Note, NoteStatus, Transition, TransitionOutcome};

use crate::{BoxFuture, Error, Result, db::Db, models::NoteRow};

const NOTE_COLUMNS: &str = "note_id, owner_id, raw_text, status, summary, created_at, updated_at";

/// Durable note records.
///
/// `transition` is the only write path for `status`, `summary` and `updated_at` after creation.
/// Implementations must apply it atomically per note, without application-level locks shared
/// across processes.
pub trait NoteStore
where
	Self: Send + Sync,
{
	/// Persists a new note in `queued` state and returns it with its assigned id.
	fn insert_note<'a>(&'a self, owner_id: &'a str, raw_text: &'a str)
	-> BoxFuture<'a, Result<Note>>;

	fn fetch_note(&self, note_id: Uuid) -> BoxFuture<'_, Result<Option<Note>>>;

	fn list_notes<'a>(&'a self, query: &'a NoteQuery) -> BoxFuture<'a, Result<NotePage>>;

	fn transition<'a>(
		&'a self,
		note_id: Uuid,
		transition: &'a Transition,
	) -> BoxFuture<'a, Result<TransitionOutcome>>;
}

/// Filters for listing notes. Every bound is inclusive.
#[derive(Debug, Clone, Default)]
pub struct NoteQuery {
	pub owner_id: Option<String>,
	/// Case-insensitive substring matched against `raw_text` and `summary`.
	pub search: Option<String>,
	pub status: Option<NoteStatus>,
	pub created_after: Option<OffsetDateTime>,
	pub created_before: Option<OffsetDateTime>,
	pub limit: u32,
	pub offset: u64,
}

#[derive(Debug, Clone)]
pub struct NotePage {
	pub notes: Vec<Note>,
	pub total: u64,
}

impl NoteStore for Db {
	fn insert_note<'a>(
		&'a self,
		owner_id: &'a str,
		raw_text: &'a str,
	) -> BoxFuture<'a, Result<Note>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let sql = format!(
				"\
INSERT INTO notes (note_id, owner_id, raw_text, status, summary, created_at, updated_at)
VALUES ($1, $2, $3, $4, NULL, $5, $5)
RETURNING {NOTE_COLUMNS}"
			);
			let row: NoteRow = sqlx::query_as(&sql)
				.bind(Uuid::new_v4())
				.bind(owner_id)
				.bind(raw_text)
				.bind(NoteStatus::Queued.as_str())
				.bind(now)
				.fetch_one(&self.pool)
				.await?;

			Note::try_from(row)
		})
	}

	fn fetch_note(&self, note_id: Uuid) -> BoxFuture<'_, Result<Option<Note>>> {
		Box::pin(async move {
			let sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE note_id = $1");
			let row: Option<NoteRow> =
				sqlx::query_as(&sql).bind(note_id).fetch_optional(&self.pool).await?;

			row.map(Note::try_from).transpose()
		})
	}

	fn list_notes<'a>(&'a self, query: &'a NoteQuery) -> BoxFuture<'a, Result<NotePage>> {
		Box::pin(async move {
			if query.limit == 0 {
				return Err(Error::InvalidArgument("limit must be greater than zero.".to_string()));
			}

			let offset = i64::try_from(query.offset)
				.map_err(|_| Error::InvalidArgument("offset is out of range.".to_string()))?;
			let mut count = QueryBuilder::<Postgres>::new("SELECT count(*) FROM notes WHERE TRUE");

			push_filters(&mut count, query);

			let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;
			let mut select = QueryBuilder::<Postgres>::new(format!(
				"SELECT {NOTE_COLUMNS} FROM notes WHERE TRUE"
			));

			push_filters(&mut select, query);
			select.push(" ORDER BY created_at DESC, note_id DESC LIMIT ");
			select.push_bind(i64::from(query.limit));
			select.push(" OFFSET ");
			select.push_bind(offset);

			let rows: Vec<NoteRow> = select.build_query_as().fetch_all(&self.pool).await?;
			let notes = rows.into_iter().map(Note::try_from).collect::<Result<Vec<_>>>()?;

			Ok(NotePage { notes, total: total.max(0) as u64 })
		})
	}

	fn transition<'a>(
		&'a self,
		note_id: Uuid,
		transition: &'a Transition,
	) -> BoxFuture<'a, Result<TransitionOutcome>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let from_allowed = transition
				.from_allowed()
				.iter()
				.map(|status| status.as_str().to_string())
				.collect::<Vec<_>>();
			let sql = format!(
				"\
UPDATE notes
SET
	status = $1,
	summary = $2,
	updated_at = $3
WHERE note_id = $4 AND status = ANY($5)
RETURNING {NOTE_COLUMNS}"
			);
			let row: Option<NoteRow> = sqlx::query_as(&sql)
				.bind(transition.to().as_str())
				.bind(transition.summary())
				.bind(now)
				.bind(note_id)
				.bind(&from_allowed)
				.fetch_optional(&self.pool)
				.await?;

			if let Some(row) = row {
				return Ok(TransitionOutcome::Applied(Note::try_from(row)?));
			}

			let current: Option<String> =
				sqlx::query_scalar("SELECT status FROM notes WHERE note_id = $1")
					.bind(note_id)
					.fetch_optional(&self.pool)
					.await?;

			match current {
				Some(status) => {
					let current = status
						.parse::<NoteStatus>()
						.map_err(|err| Error::InvalidRow(format!("note {note_id}: {err}")))?;

					Ok(TransitionOutcome::Conflict { current })
				},
				None => Ok(TransitionOutcome::NotFound),
			}
		})
	}
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, query: &'a NoteQuery) {
	if let Some(owner_id) = query.owner_id.as_deref() {
		builder.push(" AND owner_id = ");
		builder.push_bind(owner_id);
	}
	if let Some(search) = query.search.as_deref() {
		let pattern = format!("%{}%", escape_like(search));

		builder.push(" AND (raw_text ILIKE ");
		builder.push_bind(pattern.clone());
		builder.push(" OR summary ILIKE ");
		builder.push_bind(pattern);
		builder.push(")");
	}
	if let Some(status) = query.status {
		builder.push(" AND status = ");
		builder.push_bind(status.as_str());
	}
	if let Some(created_after) = query.created_after {
		builder.push(" AND created_at >= ");
		builder.push_bind(created_after);
	}
	if let Some(created_before) = query.created_before {
		builder.push(" AND created_at <= ");
		builder.push_bind(created_before);
	}
}

fn escape_like(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for ch in raw.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn like_wildcards_are_escaped() {
		assert_eq!(escape_like("50%_off\\now"), "50\\%\\_off\\\\now");
		assert_eq!(escape_like("meeting"), "meeting");
	}
}
