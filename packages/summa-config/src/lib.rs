mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Notes, Postgres, Queue, QueueBackend, Redis, Security, Service, Storage, Summary,
	Worker,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	validate_queue(cfg)?;

	if cfg.worker.concurrency == 0 {
		return Err(Error::Validation {
			message: "worker.concurrency must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.job_retention_hours <= 0 {
		return Err(Error::Validation {
			message: "worker.job_retention_hours must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.cleanup_interval_seconds <= 0 {
		return Err(Error::Validation {
			message: "worker.cleanup_interval_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.notes.max_raw_text_chars == 0 {
		return Err(Error::Validation {
			message: "notes.max_raw_text_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.notes.default_page_size == 0 || cfg.notes.max_page_size == 0 {
		return Err(Error::Validation {
			message: "notes page sizes must be greater than zero.".to_string(),
		});
	}
	if cfg.notes.default_page_size > cfg.notes.max_page_size {
		return Err(Error::Validation {
			message: "notes.default_page_size must not exceed notes.max_page_size.".to_string(),
		});
	}
	if cfg.summary.max_chars == 0 {
		return Err(Error::Validation {
			message: "summary.max_chars must be greater than zero.".to_string(),
		});
	}

	for (label, keywords) in [
		("summary.priority_keywords", &cfg.summary.priority_keywords),
		("summary.meeting_keywords", &cfg.summary.meeting_keywords),
	] {
		if keywords.iter().any(|keyword| keyword.trim().is_empty()) {
			return Err(Error::Validation {
				message: format!("{label} must not contain empty keywords."),
			});
		}
	}

	Ok(())
}

fn validate_queue(cfg: &Config) -> Result<()> {
	let queue = &cfg.queue;

	if queue.name.trim().is_empty() {
		return Err(Error::Validation { message: "queue.name must be non-empty.".to_string() });
	}
	if queue.name.contains(char::is_whitespace) {
		return Err(Error::Validation {
			message: "queue.name must not contain whitespace.".to_string(),
		});
	}

	for (label, value) in [
		("queue.submit_timeout_ms", queue.submit_timeout_ms),
		("queue.pull_timeout_ms", queue.pull_timeout_ms),
		("queue.poll_interval_ms", queue.poll_interval_ms),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if queue.lease_seconds <= 0 {
		return Err(Error::Validation {
			message: "queue.lease_seconds must be greater than zero.".to_string(),
		});
	}
	if queue.backend == QueueBackend::Redis {
		let url = queue.redis.as_ref().map(|redis| redis.url.trim()).unwrap_or("");

		if url.is_empty() {
			return Err(Error::Validation {
				message: "queue.redis.url is required when queue.backend is redis.".to_string(),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}

	for keywords in [&mut cfg.summary.priority_keywords, &mut cfg.summary.meeting_keywords] {
		for keyword in keywords.iter_mut() {
			*keyword = keyword.trim().to_lowercase();
		}
	}
}
