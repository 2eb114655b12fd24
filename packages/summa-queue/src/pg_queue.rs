use std::time::Duration as StdDuration;

use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;
use uuid::Uuid;

use summa_storage::{db::Db, jobs};

use crate::{
	BoxFuture, Delivery, Error, JobDescriptor, JobQueue, Result,
	retry::{backoff_for_attempt, sanitize_error},
};

/// Job queue on the `summary_jobs` table.
///
/// Claims use `FOR UPDATE SKIP LOCKED` plus a lease, so any number of consumers may poll the same
/// queue and a job whose consumer died becomes visible again when its lease expires.
#[derive(Clone)]
pub struct PgJobQueue {
	db: Db,
	name: String,
	poll_interval: StdDuration,
	lease: Duration,
}
impl PgJobQueue {
	pub fn new(db: Db, cfg: &summa_config::Queue) -> Self {
		Self::with_settings(
			db,
			&cfg.name,
			StdDuration::from_millis(cfg.poll_interval_ms),
			Duration::seconds(cfg.lease_seconds),
		)
	}

	pub fn with_settings(
		db: Db,
		name: &str,
		poll_interval: StdDuration,
		lease: Duration,
	) -> Self {
		Self { db, name: name.to_string(), poll_interval, lease }
	}

	async fn claim_within(&self, wait: StdDuration) -> Result<Option<Delivery>> {
		let deadline = tokio_time::Instant::now() + wait;

		loop {
			let now = OffsetDateTime::now_utc();

			if let Some(job) = jobs::claim_next_job(&self.db, &self.name, now, self.lease).await? {
				return Ok(Some(Delivery {
					receipt: job.job_id.to_string(),
					payload: job.payload.to_string(),
					attempts: u32::try_from(job.attempts).unwrap_or(0),
				}));
			}

			let remaining = deadline.saturating_duration_since(tokio_time::Instant::now());

			if remaining.is_zero() {
				return Ok(None);
			}

			tokio_time::sleep(remaining.min(self.poll_interval)).await;
		}
	}
}
impl JobQueue for PgJobQueue {
	fn enqueue<'a>(&'a self, descriptor: &'a JobDescriptor) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move {
			let job_id = jobs::enqueue_job(&self.db, &self.name, &descriptor.to_json()).await?;

			tracing::debug!(%job_id, note_id = %descriptor.note_id, "Summary job enqueued.");

			Ok(job_id.to_string())
		})
	}

	fn dequeue(&self, wait: StdDuration) -> BoxFuture<'_, Result<Option<Delivery>>> {
		Box::pin(self.claim_within(wait))
	}

	fn ack<'a>(&'a self, delivery: &'a Delivery) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let job_id = parse_receipt(&delivery.receipt)?;

			if !jobs::mark_job_done(&self.db, job_id, claim_attempts(delivery)?).await? {
				tracing::warn!(
					%job_id,
					attempts = delivery.attempts,
					"Ignoring ack for a superseded claim."
				);
			}

			Ok(())
		})
	}

	fn retry<'a>(&'a self, delivery: &'a Delivery, error: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let job_id = parse_receipt(&delivery.receipt)?;
			let available_at = OffsetDateTime::now_utc() + backoff_for_attempt(delivery.attempts);
			let applied = jobs::mark_job_failed(
				&self.db,
				job_id,
				claim_attempts(delivery)?,
				&sanitize_error(error),
				available_at,
			)
			.await?;

			if !applied {
				tracing::warn!(
					%job_id,
					attempts = delivery.attempts,
					"Ignoring retry for a superseded claim."
				);
			}

			Ok(())
		})
	}

	fn purge_completed(&self, retention: StdDuration) -> BoxFuture<'_, Result<u64>> {
		Box::pin(async move {
			let retention = Duration::try_from(retention)
				.map_err(|err| Error::Config(format!("Invalid retention window: {err}.")))?;
			let cutoff = OffsetDateTime::now_utc() - retention;

			Ok(jobs::purge_done_jobs(&self.db, &self.name, cutoff).await?)
		})
	}
}

fn parse_receipt(receipt: &str) -> Result<Uuid> {
	Uuid::parse_str(receipt).map_err(|_| Error::InvalidReceipt(receipt.to_string()))
}

// The attempt counter identifies the claim; every redelivery bumps it.
fn claim_attempts(delivery: &Delivery) -> Result<i32> {
	i32::try_from(delivery.attempts).map_err(|_| Error::InvalidReceipt(delivery.receipt.clone()))
}
