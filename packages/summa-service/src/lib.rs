pub mod enqueue;
pub mod list;
pub mod notes;
pub mod time_serde;

mod error;

pub use enqueue::{Enqueuer, SubmitOutcome};
pub use error::{Error, Result};
pub use list::{ListNotesRequest, ListNotesResponse};
pub use notes::{CreateNoteRequest, NoteFetchRequest, NoteResponse};

use std::{sync::Arc, time::Duration};

use summa_config::Config;
use summa_queue::JobQueue;
use summa_storage::NoteStore;

pub struct NoteService {
	pub cfg: Config,
	pub store: Arc<dyn NoteStore>,
	pub enqueuer: Enqueuer,
}
impl NoteService {
	pub fn new(cfg: Config, store: Arc<dyn NoteStore>, queue: Arc<dyn JobQueue>) -> Self {
		let submit_timeout = Duration::from_millis(cfg.queue.submit_timeout_ms);
		let enqueuer = Enqueuer::new(store.clone(), queue, submit_timeout);

		Self { cfg, store, enqueuer }
	}
}
