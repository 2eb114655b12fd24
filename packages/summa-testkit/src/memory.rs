use std::{
	collections::HashMap,
	sync::{
		Mutex,
		atomic::{AtomicBool, Ordering},
	},
};

use time::OffsetDateTime;
use uuid::Uuid;

use summa_domain::{Note, NoteStatus, Transition, TransitionOutcome};
use summa_storage::{BoxFuture, Error, NotePage, NoteQuery, NoteStore, Result};

/// In-process [`NoteStore`] applying the same transition rules as the Postgres store.
#[derive(Default)]
pub struct MemoryNoteStore {
	notes: Mutex<HashMap<Uuid, Note>>,
	applied: Mutex<Vec<(Uuid, NoteStatus)>>,
	unavailable: AtomicBool,
	transitions_unavailable: AtomicBool,
}
impl MemoryNoteStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn seed(&self, note: Note) {
		self.notes.lock().unwrap_or_else(|err| err.into_inner()).insert(note.note_id, note);
	}

	pub fn get(&self, note_id: Uuid) -> Option<Note> {
		self.notes.lock().unwrap_or_else(|err| err.into_inner()).get(&note_id).cloned()
	}

	/// Every applied transition in order, as `(note_id, target status)`.
	pub fn applied_transitions(&self) -> Vec<(Uuid, NoteStatus)> {
		self.applied.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	/// Makes every operation fail as if the database were unreachable.
	pub fn set_unavailable(&self, unavailable: bool) {
		self.unavailable.store(unavailable, Ordering::SeqCst);
	}

	/// Makes only `transition` fail as if the database were unreachable.
	pub fn set_transitions_unavailable(&self, unavailable: bool) {
		self.transitions_unavailable.store(unavailable, Ordering::SeqCst);
	}

	fn check_available(&self) -> Result<()> {
		if self.unavailable.load(Ordering::SeqCst) {
			return Err(Error::Sqlx(sqlx::Error::PoolTimedOut));
		}

		Ok(())
	}
}
impl NoteStore for MemoryNoteStore {
	fn insert_note<'a>(
		&'a self,
		owner_id: &'a str,
		raw_text: &'a str,
	) -> BoxFuture<'a, Result<Note>> {
		Box::pin(async move {
			self.check_available()?;

			let note = Note::queued(Uuid::new_v4(), owner_id, raw_text, OffsetDateTime::now_utc());

			self.seed(note.clone());

			Ok(note)
		})
	}

	fn fetch_note(&self, note_id: Uuid) -> BoxFuture<'_, Result<Option<Note>>> {
		Box::pin(async move {
			self.check_available()?;

			Ok(self.get(note_id))
		})
	}

	fn list_notes<'a>(&'a self, query: &'a NoteQuery) -> BoxFuture<'a, Result<NotePage>> {
		Box::pin(async move {
			self.check_available()?;

			if query.limit == 0 {
				return Err(Error::InvalidArgument("limit must be greater than zero.".to_string()));
			}

			let search = query.search.as_deref().map(str::to_lowercase);
			let mut matched = self
				.notes
				.lock()
				.unwrap_or_else(|err| err.into_inner())
				.values()
				.filter(|note| matches_query(note, query, search.as_deref()))
				.cloned()
				.collect::<Vec<_>>();

			matched.sort_by(|a, b| {
				b.created_at.cmp(&a.created_at).then_with(|| b.note_id.cmp(&a.note_id))
			});

			let total = matched.len() as u64;
			let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
			let notes =
				matched.into_iter().skip(offset).take(query.limit as usize).collect::<Vec<_>>();

			Ok(NotePage { notes, total })
		})
	}

	fn transition<'a>(
		&'a self,
		note_id: Uuid,
		transition: &'a Transition,
	) -> BoxFuture<'a, Result<TransitionOutcome>> {
		Box::pin(async move {
			self.check_available()?;

			if self.transitions_unavailable.load(Ordering::SeqCst) {
				return Err(Error::Sqlx(sqlx::Error::PoolTimedOut));
			}

			let mut notes = self.notes.lock().unwrap_or_else(|err| err.into_inner());
			let Some(note) = notes.get_mut(&note_id) else {
				return Ok(TransitionOutcome::NotFound);
			};
			let outcome = note.apply(transition, OffsetDateTime::now_utc());

			if outcome.is_applied() {
				self.applied
					.lock()
					.unwrap_or_else(|err| err.into_inner())
					.push((note_id, transition.to()));
			}

			Ok(outcome)
		})
	}
}

fn matches_query(note: &Note, query: &NoteQuery, search: Option<&str>) -> bool {
	if let Some(owner_id) = query.owner_id.as_deref()
		&& note.owner_id != owner_id
	{
		return false;
	}
	if let Some(status) = query.status
		&& note.status != status
	{
		return false;
	}
	if let Some(created_after) = query.created_after
		&& note.created_at < created_after
	{
		return false;
	}
	if let Some(created_before) = query.created_before
		&& note.created_at > created_before
	{
		return false;
	}
	if let Some(search) = search {
		let in_text = note.raw_text.to_lowercase().contains(search);
		let in_summary =
			note.summary.as_deref().is_some_and(|summary| summary.to_lowercase().contains(search));

		return in_text || in_summary;
	}

	true
}
