pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Invalid value at {field}: {message}")]
	InvalidField { field: String, message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	pub(crate) fn invalid_field(field: &str, message: impl Into<String>) -> Self {
		Self::InvalidField { field: field.to_string(), message: message.into() }
	}
}

impl From<summa_storage::Error> for Error {
	fn from(err: summa_storage::Error) -> Self {
		match err {
			summa_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			summa_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			summa_storage::Error::InvalidRow(message) => Self::Storage { message },
		}
	}
}
