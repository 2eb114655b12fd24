use std::sync::Arc;

use uuid::Uuid;

use summa_config::Config;
use summa_queue::JobQueue;
use summa_service::NoteService;
use summa_storage::{NoteStore, db::Db};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<NoteService>,
	pub api_auth_token: Option<String>,
}
impl AppState {
	pub async fn new(config: Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let consumer = format!("api-{}", Uuid::new_v4().simple());
		let queue = summa_queue::connect(&config.queue, &db, &consumer)?;

		Ok(Self::from_parts(config, Arc::new(db), queue))
	}

	pub fn from_parts(config: Config, store: Arc<dyn NoteStore>, queue: Arc<dyn JobQueue>) -> Self {
		let api_auth_token = config.security.api_auth_token.clone();
		let service = NoteService::new(config, store, queue);

		Self { service: Arc::new(service), api_auth_token }
	}
}
