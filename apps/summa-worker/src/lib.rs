pub mod worker;

mod error;

pub use error::{Error, Result};

use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinSet};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use summa_cli::Args;
use summa_domain::SummaryRules;
use summa_storage::{NoteStore, db::Db};

use crate::worker::WorkerState;

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = summa_config::load(&args.config)?;

	init_tracing(&config);

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let store: Arc<dyn NoteStore> = Arc::new(db.clone());
	let rules = SummaryRules::from(&config.summary);
	let pull_timeout = Duration::from_millis(config.queue.pull_timeout_ms);
	let consumer = format!("worker-{}", Uuid::new_v4().simple());
	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	let mut tasks = JoinSet::new();

	for index in 0..config.worker.concurrency {
		let queue = summa_queue::connect(&config.queue, &db, &format!("{consumer}-{index}"))?;
		let state = WorkerState::new(store.clone(), queue, rules.clone(), pull_timeout);

		tasks.spawn(worker::run_worker(state, shutdown_rx.clone()));
	}

	let cleanup_queue = summa_queue::connect(&config.queue, &db, &format!("{consumer}-cleanup"))?;
	let retention = Duration::from_secs(config.worker.job_retention_hours as u64 * 3_600);
	let interval = Duration::from_secs(config.worker.cleanup_interval_seconds as u64);

	tasks.spawn(worker::run_cleanup(cleanup_queue, retention, interval, shutdown_rx));

	tracing::info!(
		%consumer,
		concurrency = config.worker.concurrency,
		queue = %config.queue.name,
		"Summary worker started."
	);

	tokio::signal::ctrl_c().await?;
	tracing::info!("Shutdown requested. Finishing in-flight jobs.");

	let _ = shutdown_tx.send(true);

	while let Some(joined) = tasks.join_next().await {
		joined?;
	}

	Ok(())
}

fn init_tracing(config: &summa_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}
