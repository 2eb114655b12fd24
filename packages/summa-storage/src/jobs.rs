//! Row-level helpers for the `summary_jobs` table that backs the Postgres job queue.

use serde_json::Value;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{Result, db::Db, models::SummaryJob};

const JOB_COLUMNS: &str =
	"job_id, queue, payload, status, attempts, last_error, available_at, created_at, updated_at";

pub async fn enqueue_job(db: &Db, queue: &str, payload: &Value) -> Result<Uuid> {
	let job_id = Uuid::new_v4();
	let now = OffsetDateTime::now_utc();

	sqlx::query(
		"\
INSERT INTO summary_jobs (job_id, queue, payload, status, attempts, available_at, created_at, updated_at)
VALUES ($1, $2, $3, 'PENDING', 0, $4, $4, $4)",
	)
	.bind(job_id)
	.bind(queue)
	.bind(payload)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(job_id)
}

/// Claims the oldest available job and hides it from other consumers for `lease`.
///
/// The returned row already carries the incremented `attempts` and the leased `available_at`.
pub async fn claim_next_job(
	db: &Db,
	queue: &str,
	now: OffsetDateTime,
	lease: Duration,
) -> Result<Option<SummaryJob>> {
	let mut tx = db.pool.begin().await?;
	let sql = format!(
		"\
SELECT {JOB_COLUMNS}
FROM summary_jobs
WHERE queue = $1 AND status IN ('PENDING','FAILED') AND available_at <= $2
ORDER BY available_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED"
	);
	let row: Option<SummaryJob> =
		sqlx::query_as(&sql).bind(queue).bind(now).fetch_optional(&mut *tx).await?;
	let job = if let Some(mut job) = row {
		let lease_until = now + lease;
		let attempts = job.attempts.saturating_add(1);

		sqlx::query(
			"UPDATE summary_jobs SET attempts = $1, available_at = $2, updated_at = $3 WHERE job_id = $4",
		)
		.bind(attempts)
		.bind(lease_until)
		.bind(now)
		.bind(job.job_id)
		.execute(&mut *tx)
		.await?;

		job.attempts = attempts;
		job.available_at = lease_until;
		job.updated_at = now;

		Some(job)
	} else {
		None
	};

	tx.commit().await?;

	Ok(job)
}

/// Marks the claim identified by `attempts` as finished.
///
/// Returns `false` when the job was claimed again since or is already `DONE`.
pub async fn mark_job_done(db: &Db, job_id: Uuid, attempts: i32) -> Result<bool> {
	let now = OffsetDateTime::now_utc();
	let result = sqlx::query(
		"\
UPDATE summary_jobs
SET status = 'DONE', updated_at = $1
WHERE job_id = $2 AND attempts = $3 AND status <> 'DONE'",
	)
	.bind(now)
	.bind(job_id)
	.bind(attempts)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() == 1)
}

/// Records a failed claim and delays the job until `available_at`.
///
/// Same guard as [`mark_job_done`]: a stale claim never touches the row.
pub async fn mark_job_failed(
	db: &Db,
	job_id: Uuid,
	attempts: i32,
	error_text: &str,
	available_at: OffsetDateTime,
) -> Result<bool> {
	let now = OffsetDateTime::now_utc();
	let result = sqlx::query(
		"\
UPDATE summary_jobs
SET status = 'FAILED',
	last_error = $1,
	available_at = $2,
	updated_at = $3
WHERE job_id = $4 AND attempts = $5 AND status <> 'DONE'",
	)
	.bind(error_text)
	.bind(available_at)
	.bind(now)
	.bind(job_id)
	.bind(attempts)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() == 1)
}

/// Deletes finished jobs last touched before `cutoff`. Returns the number of rows removed.
pub async fn purge_done_jobs(db: &Db, queue: &str, cutoff: OffsetDateTime) -> Result<u64> {
	let result = sqlx::query(
		"DELETE FROM summary_jobs WHERE queue = $1 AND status = 'DONE' AND updated_at < $2",
	)
	.bind(queue)
	.bind(cutoff)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected())
}

pub async fn fetch_job(db: &Db, job_id: Uuid) -> Result<Option<SummaryJob>> {
	let sql = format!("SELECT {JOB_COLUMNS} FROM summary_jobs WHERE job_id = $1");
	let row = sqlx::query_as(&sql).bind(job_id).fetch_optional(&db.pool).await?;

	Ok(row)
}
