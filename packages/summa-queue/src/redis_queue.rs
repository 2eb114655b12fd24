use std::time::Duration;

use redis::{Client, aio::ConnectionManager};
use tokio::sync::OnceCell;

use crate::{BoxFuture, Delivery, JobDescriptor, JobQueue, Result};

const KEY_PREFIX: &str = "summa:queue";
const MIN_BLOCK_SECONDS: f64 = 0.1;

/// Job queue on Redis lists.
///
/// Producers `LPUSH` onto `summa:queue:<name>`. A consumer atomically moves the oldest entry into
/// its own `summa:queue:<name>:processing:<consumer>` list with `BLMOVE`, and removes it from
/// there on ack. Entries left in a processing list by a consumer that died stay there.
///
/// The connection is opened on first use so a process can start while Redis is down.
pub struct RedisJobQueue {
	client: Client,
	queue_key: String,
	processing_key: String,
	conn: OnceCell<ConnectionManager>,
}
impl RedisJobQueue {
	pub fn open(url: &str, name: &str, consumer: &str) -> Result<Self> {
		let client = Client::open(url)?;

		Ok(Self {
			client,
			queue_key: queue_key(name),
			processing_key: processing_key(name, consumer),
			conn: OnceCell::new(),
		})
	}

	pub fn queue_key(&self) -> &str {
		&self.queue_key
	}

	pub fn processing_key(&self) -> &str {
		&self.processing_key
	}

	async fn connection(&self) -> Result<ConnectionManager> {
		let conn = self
			.conn
			.get_or_try_init(|| async { ConnectionManager::new(self.client.clone()).await })
			.await?;

		Ok(conn.clone())
	}
}
impl JobQueue for RedisJobQueue {
	fn enqueue<'a>(&'a self, descriptor: &'a JobDescriptor) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move {
			let mut conn = self.connection().await?;
			let _: i64 = redis::cmd("LPUSH")
				.arg(&self.queue_key)
				.arg(descriptor.encode())
				.query_async(&mut conn)
				.await?;

			tracing::debug!(note_id = %descriptor.note_id, queue = %self.queue_key, "Summary job enqueued.");

			Ok(self.queue_key.clone())
		})
	}

	fn dequeue(&self, wait: Duration) -> BoxFuture<'_, Result<Option<Delivery>>> {
		Box::pin(async move {
			let mut conn = self.connection().await?;
			let block_seconds = wait.as_secs_f64().max(MIN_BLOCK_SECONDS);
			let payload: Option<String> = redis::cmd("BLMOVE")
				.arg(&self.queue_key)
				.arg(&self.processing_key)
				.arg("RIGHT")
				.arg("LEFT")
				.arg(block_seconds)
				.query_async(&mut conn)
				.await?;

			Ok(payload.map(|payload| Delivery { receipt: payload.clone(), payload, attempts: 1 }))
		})
	}

	fn ack<'a>(&'a self, delivery: &'a Delivery) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut conn = self.connection().await?;
			let _: i64 = redis::cmd("LREM")
				.arg(&self.processing_key)
				.arg(1)
				.arg(&delivery.receipt)
				.query_async(&mut conn)
				.await?;

			Ok(())
		})
	}

	fn retry<'a>(&'a self, delivery: &'a Delivery, error: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut conn = self.connection().await?;
			let _: () = redis::pipe()
				.atomic()
				.cmd("LREM")
				.arg(&self.processing_key)
				.arg(1)
				.arg(&delivery.receipt)
				.ignore()
				.cmd("LPUSH")
				.arg(&self.queue_key)
				.arg(&delivery.payload)
				.ignore()
				.query_async(&mut conn)
				.await?;

			tracing::debug!(queue = %self.queue_key, error, "Summary job handed back for redelivery.");

			Ok(())
		})
	}
}

fn queue_key(name: &str) -> String {
	format!("{KEY_PREFIX}:{name}")
}

fn processing_key(name: &str, consumer: &str) -> String {
	format!("{KEY_PREFIX}:{name}:processing:{consumer}")
}
