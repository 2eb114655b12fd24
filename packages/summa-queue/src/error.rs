pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Storage(#[from] summa_storage::Error),

	#[error(transparent)]
	Redis(#[from] redis::RedisError),

	#[error("Invalid job payload: {0}")]
	InvalidPayload(String),

	#[error("Unsupported job payload version {0}.")]
	UnsupportedVersion(u64),

	#[error("Invalid delivery receipt {0:?}.")]
	InvalidReceipt(String),

	#[error("Queue is unavailable: {0}")]
	Unavailable(String),

	#[error("Queue configuration error: {0}")]
	Config(String),
}
