//! Durable, at-least-once delivery of summary jobs.
//!
//! Producers call [`JobQueue::enqueue`]. Consumers loop over [`JobQueue::dequeue`] and settle
//! every delivery with either [`JobQueue::ack`] or [`JobQueue::retry`]. A delivery that is never
//! settled is redelivered by the Postgres backend once its lease runs out.

pub mod descriptor;
pub mod pg_queue;
pub mod redis_queue;
pub mod retry;

mod error;

pub use descriptor::{DESCRIPTOR_VERSION, JobDescriptor};
pub use error::{Error, Result};
pub use pg_queue::PgJobQueue;
pub use redis_queue::RedisJobQueue;

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use summa_config::QueueBackend;
use summa_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One handed-out job. Settle it with `ack` or `retry` on the queue that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
	/// Backend-specific handle identifying this delivery.
	pub receipt: String,
	pub payload: String,
	/// Number of times this job has been handed out, including this one.
	pub attempts: u32,
}
impl Delivery {
	pub fn descriptor(&self) -> Result<JobDescriptor> {
		JobDescriptor::decode(&self.payload)
	}
}

pub trait JobQueue
where
	Self: Send + Sync,
{
	/// Returns a reference to the stored job: the row id on Postgres, the list key on Redis.
	fn enqueue<'a>(&'a self, descriptor: &'a JobDescriptor) -> BoxFuture<'a, Result<String>>;

	/// Waits up to `wait` for a job. `None` means the wait elapsed with nothing available.
	fn dequeue(&self, wait: Duration) -> BoxFuture<'_, Result<Option<Delivery>>>;

	/// Marks the job finished. Settling a delivery that was already superseded is a no-op.
	fn ack<'a>(&'a self, delivery: &'a Delivery) -> BoxFuture<'a, Result<()>>;

	/// Hands the delivery back so it is delivered again later.
	fn retry<'a>(&'a self, delivery: &'a Delivery, error: &'a str) -> BoxFuture<'a, Result<()>>;

	/// Drops bookkeeping for jobs acknowledged more than `retention` ago.
	fn purge_completed(&self, retention: Duration) -> BoxFuture<'_, Result<u64>> {
		let _ = retention;

		Box::pin(async { Ok(0) })
	}
}

/// Builds the configured backend.
///
/// `consumer` names this process (or worker loop) and only matters for backends that track
/// in-flight deliveries per consumer.
pub fn connect(cfg: &summa_config::Queue, db: &Db, consumer: &str) -> Result<Arc<dyn JobQueue>> {
	match cfg.backend {
		QueueBackend::Postgres => Ok(Arc::new(PgJobQueue::new(db.clone(), cfg))),
		QueueBackend::Redis => {
			let Some(redis) = cfg.redis.as_ref() else {
				return Err(Error::Config(
					"queue.redis.url is required when queue.backend is redis.".to_string(),
				));
			};

			Ok(Arc::new(RedisJobQueue::open(&redis.url, &cfg.name, consumer)?))
		},
	}
}
