use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task, time as tokio_time};
use uuid::Uuid;

use summa_domain::{NoteStatus, SummaryRules, Transition, TransitionOutcome, summarize};
use summa_queue::{JobQueue, retry::backoff_for_attempt};
use summa_storage::NoteStore;

use crate::Result;

pub type SummaryFn = dyn Fn(&str) -> String + Send + Sync;

#[derive(Clone)]
pub struct WorkerState {
	pub store: Arc<dyn NoteStore>,
	pub queue: Arc<dyn JobQueue>,
	/// Runs on a blocking thread. A panic marks the note `failed`.
	pub transform: Arc<SummaryFn>,
	pub pull_timeout: Duration,
}
impl WorkerState {
	pub fn new(
		store: Arc<dyn NoteStore>,
		queue: Arc<dyn JobQueue>,
		rules: SummaryRules,
		pull_timeout: Duration,
	) -> Self {
		let transform = Arc::new(move |raw_text: &str| summarize(raw_text, &rules));

		Self { store, queue, transform, pull_timeout }
	}

	pub fn with_transform(mut self, transform: Arc<SummaryFn>) -> Self {
		self.transform = transform;

		self
	}
}

/// How one delivery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
	Done,
	Failed,
	/// Another delivery already owns or finished the note.
	Conflict,
	/// The note no longer exists.
	Missing,
	/// The payload could not be decoded.
	Dropped,
	/// The store was unreachable; the delivery was handed back to the queue.
	Retried,
}

/// Pulls and processes deliveries until `shutdown` flips to `true`.
///
/// A delivery in progress always runs to completion; shutdown stops the next pull and cuts any
/// backoff sleep short.
pub async fn run_worker(state: WorkerState, mut shutdown: watch::Receiver<bool>) {
	let mut consecutive_failures = 0_u32;

	while !*shutdown.borrow() {
		let failed = match process_once(&state).await {
			Ok(Some(JobOutcome::Retried)) => true,
			Ok(_) => false,
			Err(err) => {
				tracing::error!(error = %err, "Summary job processing failed.");

				true
			},
		};

		if failed {
			consecutive_failures = consecutive_failures.saturating_add(1);

			tokio::select! {
				_ = tokio_time::sleep(backoff_for_attempt(consecutive_failures)) => {},
				_ = shutdown.changed() => break,
			}
		} else {
			consecutive_failures = 0;
		}
	}

	tracing::info!("Worker loop stopped.");
}

/// Periodically drops bookkeeping for finished jobs.
pub async fn run_cleanup(
	queue: Arc<dyn JobQueue>,
	retention: Duration,
	interval: Duration,
	mut shutdown: watch::Receiver<bool>,
) {
	loop {
		tokio::select! {
			_ = tokio_time::sleep(interval) => {},
			_ = shutdown.changed() => break,
		}

		match queue.purge_completed(retention).await {
			Ok(0) => {},
			Ok(purged) => tracing::info!(purged, "Purged completed summary jobs."),
			Err(err) => tracing::error!(error = %err, "Summary job cleanup failed."),
		}
	}
}

/// Waits for one delivery and settles it. `None` means the pull timed out empty.
pub async fn process_once(state: &WorkerState) -> Result<Option<JobOutcome>> {
	let Some(delivery) = state.queue.dequeue(state.pull_timeout).await? else {
		return Ok(None);
	};
	let descriptor = match delivery.descriptor() {
		Ok(descriptor) => descriptor,
		Err(err) => {
			tracing::warn!(
				error = %err,
				attempts = delivery.attempts,
				"Dropping summary job with an unreadable payload."
			);
			state.queue.ack(&delivery).await?;

			return Ok(Some(JobOutcome::Dropped));
		},
	};

	match process_job(state, descriptor.note_id).await {
		Ok(outcome) => {
			state.queue.ack(&delivery).await?;

			Ok(Some(outcome))
		},
		Err(err) => {
			tracing::error!(
				note_id = %descriptor.note_id,
				attempts = delivery.attempts,
				error = %err,
				"Summary job hit an infrastructure error. Handing it back for redelivery."
			);
			state.queue.retry(&delivery, &err.to_string()).await?;

			Ok(Some(JobOutcome::Retried))
		},
	}
}

/// Claims the note, summarizes it and writes the terminal state.
///
/// Safe to run any number of times for the same note: once the note is terminal every later
/// run ends in [`JobOutcome::Conflict`] without writing.
pub async fn process_job(state: &WorkerState, note_id: Uuid) -> Result<JobOutcome> {
	let Some(note) = state.store.fetch_note(note_id).await? else {
		tracing::info!(%note_id, "Note missing for summary job. Dropping it.");

		return Ok(JobOutcome::Missing);
	};

	match state.store.transition(note_id, &Transition::claim()).await? {
		TransitionOutcome::Applied(_) => {},
		TransitionOutcome::Conflict { current } => {
			tracing::warn!(%note_id, %current, "Note is not claimable. Dropping duplicate job.");

			return Ok(JobOutcome::Conflict);
		},
		TransitionOutcome::NotFound => {
			tracing::info!(%note_id, "Note vanished before it was claimed.");

			return Ok(JobOutcome::Missing);
		},
	}

	let transition = summarize_on_blocking_thread(state, note_id, note.raw_text).await;
	let outcome = match transition.to() {
		NoteStatus::Done => JobOutcome::Done,
		_ => JobOutcome::Failed,
	};

	match state.store.transition(note_id, &transition).await? {
		TransitionOutcome::Applied(_) => {
			tracing::info!(%note_id, status = %transition.to(), "Summary job finished.");

			Ok(outcome)
		},
		TransitionOutcome::Conflict { current } => {
			tracing::warn!(%note_id, %current, "Another delivery finished the note first.");

			Ok(JobOutcome::Conflict)
		},
		TransitionOutcome::NotFound => {
			tracing::info!(%note_id, "Note vanished while it was being summarized.");

			Ok(JobOutcome::Missing)
		},
	}
}

async fn summarize_on_blocking_thread(
	state: &WorkerState,
	note_id: Uuid,
	raw_text: String,
) -> Transition {
	let transform = state.transform.clone();

	match task::spawn_blocking(move || transform(&raw_text)).await {
		Ok(summary) => match Transition::complete(summary) {
			Ok(transition) => transition,
			Err(err) => {
				tracing::error!(%note_id, error = %err, "Summary transform returned an empty summary.");

				Transition::execution_failed()
			},
		},
		Err(err) => {
			tracing::error!(%note_id, error = %err, "Summary transform panicked.");

			Transition::execution_failed()
		},
	}
}
