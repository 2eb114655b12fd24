use std::{sync::Arc, time::Duration};

use summa_domain::{Note, Transition, TransitionOutcome};
use summa_queue::{JobDescriptor, JobQueue};
use summa_storage::NoteStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
	/// `job_ref` locates the job in the queue backend.
	Submitted { job_ref: String },
	/// The job never reached the queue. The note was moved to `failed` when that write succeeded.
	Failed,
}

/// Hands freshly created notes to the job queue from the request path.
///
/// Never returns an error: a queue outage turns into `status = failed` on the note, which readers
/// observe on their next retrieval.
#[derive(Clone)]
pub struct Enqueuer {
	store: Arc<dyn NoteStore>,
	queue: Arc<dyn JobQueue>,
	submit_timeout: Duration,
}
impl Enqueuer {
	pub fn new(
		store: Arc<dyn NoteStore>,
		queue: Arc<dyn JobQueue>,
		submit_timeout: Duration,
	) -> Self {
		Self { store, queue, submit_timeout }
	}

	pub async fn submit(&self, note: &Note) -> SubmitOutcome {
		let descriptor = JobDescriptor::new(note.note_id);
		let cause =
			match tokio::time::timeout(self.submit_timeout, self.queue.enqueue(&descriptor)).await {
				Ok(Ok(job_ref)) => {
					tracing::info!(note_id = %note.note_id, %job_ref, "Summary job submitted.");

					return SubmitOutcome::Submitted { job_ref };
				},
				Ok(Err(err)) => err.to_string(),
				Err(_) => format!(
					"Submission timed out after {} ms.",
					self.submit_timeout.as_millis()
				),
			};

		tracing::error!(note_id = %note.note_id, error = %cause, "Summary job submission failed.");

		match self.store.transition(note.note_id, &Transition::submission_failed()).await {
			Ok(TransitionOutcome::Applied(_)) => {},
			// A timed-out submission may still have landed and been picked up.
			Ok(TransitionOutcome::Conflict { current }) => {
				tracing::warn!(
					note_id = %note.note_id,
					%current,
					"Note left its queued state before the submission failure was recorded."
				);
			},
			Ok(TransitionOutcome::NotFound) => {
				tracing::warn!(note_id = %note.note_id, "Note vanished before the submission failure was recorded.");
			},
			Err(err) => {
				tracing::error!(
					note_id = %note.note_id,
					error = %err,
					"Failed to record submission failure on the note."
				);
			},
		}

		SubmitOutcome::Failed
	}
}
