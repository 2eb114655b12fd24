pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Storage(#[from] summa_storage::Error),
	#[error(transparent)]
	Queue(#[from] summa_queue::Error),
}
