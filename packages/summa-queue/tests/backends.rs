use std::time::Duration as StdDuration;

use time::Duration;
use uuid::Uuid;

use summa_queue::{JobDescriptor, JobQueue, PgJobQueue, RedisJobQueue};
use summa_storage::{db::Db, jobs};
use summa_testkit::TestDatabase;

#[tokio::test]
#[ignore = "Requires external Postgres. Set SUMMA_PG_DSN to run."]
async fn postgres_queue_leases_retries_and_acks() {
	let Some(base_dsn) = summa_testkit::env_dsn() else {
		eprintln!("Skipping postgres_queue_leases_retries_and_acks; set SUMMA_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = Db::connect(&test_db.postgres_config(2)).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let queue = PgJobQueue::with_settings(
		db.clone(),
		"summarization",
		StdDuration::from_millis(50),
		Duration::seconds(30),
	);
	let descriptor = JobDescriptor::new(Uuid::new_v4());

	queue.enqueue(&descriptor).await.expect("Failed to enqueue.");

	let delivery = queue
		.dequeue(StdDuration::from_millis(500))
		.await
		.expect("Failed to dequeue.")
		.expect("Expected a delivery.");

	assert_eq!(delivery.descriptor().expect("Failed to decode."), descriptor);
	assert_eq!(delivery.attempts, 1);

	let leased = queue.dequeue(StdDuration::from_millis(200)).await.expect("Failed to dequeue.");

	assert!(leased.is_none(), "A leased job must not be handed out twice.");

	queue.retry(&delivery, "store unreachable password=hunter2").await.expect("Failed to retry.");

	let job_id = Uuid::parse_str(&delivery.receipt).expect("Receipt should be a job id.");
	let job = jobs::fetch_job(&db, job_id).await.expect("Failed to fetch job.").expect("Job row.");

	assert_eq!(job.status, "FAILED");
	assert_eq!(job.last_error.as_deref(), Some("store unreachable password=[REDACTED]"));

	let again = queue
		.dequeue(StdDuration::from_secs(3))
		.await
		.expect("Failed to dequeue.")
		.expect("Expected a redelivery after backoff.");

	assert_eq!(again.receipt, delivery.receipt);
	assert_eq!(again.attempts, 2);

	queue.ack(&again).await.expect("Failed to ack.");

	let job = jobs::fetch_job(&db, job_id).await.expect("Failed to fetch job.").expect("Job row.");

	assert_eq!(job.status, "DONE");

	tokio::time::sleep(StdDuration::from_millis(20)).await;

	let purged = queue.purge_completed(StdDuration::ZERO).await.expect("Failed to purge.");

	assert_eq!(purged, 1);
	assert!(jobs::fetch_job(&db, job_id).await.expect("Failed to fetch job.").is_none());

	drop(queue);
	drop(db);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SUMMA_PG_DSN to run."]
async fn postgres_queue_redelivers_after_lease_expiry() {
	let Some(base_dsn) = summa_testkit::env_dsn() else {
		eprintln!("Skipping postgres_queue_redelivers_after_lease_expiry; set SUMMA_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = Db::connect(&test_db.postgres_config(2)).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let queue = PgJobQueue::with_settings(
		db.clone(),
		"summarization",
		StdDuration::from_millis(50),
		Duration::milliseconds(300),
	);

	queue.enqueue(&JobDescriptor::new(Uuid::new_v4())).await.expect("Failed to enqueue.");

	let first = queue
		.dequeue(StdDuration::from_millis(500))
		.await
		.expect("Failed to dequeue.")
		.expect("Expected a delivery.");
	let second = queue
		.dequeue(StdDuration::from_secs(2))
		.await
		.expect("Failed to dequeue.")
		.expect("Expected a redelivery once the lease expired.");

	assert_eq!(first.receipt, second.receipt);
	assert_eq!(second.attempts, 2);

	drop(queue);
	drop(db);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SUMMA_PG_DSN to run."]
async fn postgres_queue_ignores_settles_from_an_expired_claim() {
	let Some(base_dsn) = summa_testkit::env_dsn() else {
		eprintln!("Skipping postgres_queue_ignores_settles_from_an_expired_claim; set SUMMA_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = Db::connect(&test_db.postgres_config(2)).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let queue = PgJobQueue::with_settings(
		db.clone(),
		"summarization",
		StdDuration::from_millis(50),
		Duration::milliseconds(200),
	);
	let job_ref =
		queue.enqueue(&JobDescriptor::new(Uuid::new_v4())).await.expect("Failed to enqueue.");
	let job_id = Uuid::parse_str(&job_ref).expect("Postgres job references are row ids.");
	let stale = queue
		.dequeue(StdDuration::from_millis(500))
		.await
		.expect("Failed to dequeue.")
		.expect("Expected a delivery.");

	tokio::time::sleep(StdDuration::from_millis(300)).await;

	let current = queue
		.dequeue(StdDuration::from_millis(500))
		.await
		.expect("Failed to dequeue.")
		.expect("Expected a redelivery once the lease expired.");

	assert_eq!(current.attempts, 2);

	queue.ack(&stale).await.expect("Failed to ack.");

	let job = jobs::fetch_job(&db, job_id).await.expect("Failed to fetch job.").expect("Job row.");

	assert_eq!(job.status, "PENDING", "An expired claim must not finish the job.");

	queue.ack(&current).await.expect("Failed to ack.");
	queue.retry(&stale, "late failure").await.expect("Failed to retry.");

	let job = jobs::fetch_job(&db, job_id).await.expect("Failed to fetch job.").expect("Job row.");

	assert_eq!(job.status, "DONE");
	assert_eq!(job.attempts, 2);
	assert_eq!(job.last_error, None);

	let again = queue.dequeue(StdDuration::from_millis(500)).await.expect("Failed to dequeue.");

	assert!(again.is_none(), "An acknowledged job must not be delivered again.");

	drop(queue);
	drop(db);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Redis. Set SUMMA_REDIS_URL to run."]
async fn redis_queue_moves_jobs_through_processing_list() {
	let Some(url) = summa_testkit::env_redis_url() else {
		eprintln!("Skipping redis_queue_moves_jobs_through_processing_list; set SUMMA_REDIS_URL.");

		return;
	};
	let name = format!("test_{}", Uuid::new_v4().simple());
	let queue = RedisJobQueue::open(&url, &name, "consumer-1").expect("Failed to open queue.");
	let descriptor = JobDescriptor::new(Uuid::new_v4());

	queue.enqueue(&descriptor).await.expect("Failed to enqueue.");

	let delivery = queue
		.dequeue(StdDuration::from_secs(1))
		.await
		.expect("Failed to dequeue.")
		.expect("Expected a delivery.");

	assert_eq!(delivery.descriptor().expect("Failed to decode."), descriptor);

	let client = redis::Client::open(url.as_str()).expect("Failed to open Redis client.");
	let mut conn =
		client.get_multiplexed_async_connection().await.expect("Failed to connect to Redis.");
	let in_flight: i64 = redis::cmd("LLEN")
		.arg(queue.processing_key())
		.query_async(&mut conn)
		.await
		.expect("Failed to read processing list.");

	assert_eq!(in_flight, 1);

	queue.retry(&delivery, "store unreachable").await.expect("Failed to retry.");

	let again = queue
		.dequeue(StdDuration::from_secs(1))
		.await
		.expect("Failed to dequeue.")
		.expect("Expected a redelivery.");

	queue.ack(&again).await.expect("Failed to ack.");

	let in_flight: i64 = redis::cmd("LLEN")
		.arg(queue.processing_key())
		.query_async(&mut conn)
		.await
		.expect("Failed to read processing list.");
	let pending: i64 = redis::cmd("LLEN")
		.arg(queue.queue_key())
		.query_async(&mut conn)
		.await
		.expect("Failed to read queue list.");

	assert_eq!(in_flight, 0);
	assert_eq!(pending, 0);

	let empty = queue.dequeue(StdDuration::from_millis(200)).await.expect("Failed to dequeue.");

	assert!(empty.is_none());
}
