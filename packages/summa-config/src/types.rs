use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub queue: Queue,
	#[serde(default)]
	pub worker: Worker,
	#[serde(default)]
	pub notes: Notes,
	#[serde(default)]
	pub summary: Summary,
	pub security: Security,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
	Postgres,
	Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Queue {
	pub backend: QueueBackend,
	#[serde(default = "default_queue_name")]
	pub name: String,
	/// Upper bound on a single submission from the request path.
	#[serde(default = "default_submit_timeout_ms")]
	pub submit_timeout_ms: u64,
	/// How long a worker waits for a job before looping.
	#[serde(default = "default_pull_timeout_ms")]
	pub pull_timeout_ms: u64,
	/// Postgres backend only.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// Postgres backend only. A claimed job becomes visible again after this long.
	#[serde(default = "default_lease_seconds")]
	pub lease_seconds: i64,
	pub redis: Option<Redis>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Redis {
	pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Worker {
	#[serde(default = "default_concurrency")]
	pub concurrency: u32,
	#[serde(default = "default_job_retention_hours")]
	pub job_retention_hours: i64,
	#[serde(default = "default_cleanup_interval_seconds")]
	pub cleanup_interval_seconds: i64,
}
impl Default for Worker {
	fn default() -> Self {
		Self {
			concurrency: default_concurrency(),
			job_retention_hours: default_job_retention_hours(),
			cleanup_interval_seconds: default_cleanup_interval_seconds(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Notes {
	#[serde(default = "default_max_raw_text_chars")]
	pub max_raw_text_chars: u32,
	#[serde(default = "default_page_size")]
	pub default_page_size: u32,
	#[serde(default = "default_max_page_size")]
	pub max_page_size: u32,
}
impl Default for Notes {
	fn default() -> Self {
		Self {
			max_raw_text_chars: default_max_raw_text_chars(),
			default_page_size: default_page_size(),
			max_page_size: default_max_page_size(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Summary {
	/// Length of the leading excerpt, counted in grapheme clusters.
	#[serde(default = "default_summary_max_chars")]
	pub max_chars: u32,
	#[serde(default = "default_priority_keywords")]
	pub priority_keywords: Vec<String>,
	#[serde(default = "default_meeting_keywords")]
	pub meeting_keywords: Vec<String>,
}
impl Default for Summary {
	fn default() -> Self {
		Self {
			max_chars: default_summary_max_chars(),
			priority_keywords: default_priority_keywords(),
			meeting_keywords: default_meeting_keywords(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	/// Optional. When set, note routes require `Authorization: Bearer <token>`.
	pub api_auth_token: Option<String>,
}

fn default_queue_name() -> String {
	"summarization".to_string()
}

fn default_submit_timeout_ms() -> u64 {
	2_000
}

fn default_pull_timeout_ms() -> u64 {
	5_000
}

fn default_poll_interval_ms() -> u64 {
	500
}

fn default_lease_seconds() -> i64 {
	60
}

fn default_concurrency() -> u32 {
	1
}

fn default_job_retention_hours() -> i64 {
	24
}

fn default_cleanup_interval_seconds() -> i64 {
	900
}

fn default_max_raw_text_chars() -> u32 {
	10_000
}

fn default_page_size() -> u32 {
	10
}

fn default_max_page_size() -> u32 {
	100
}

fn default_summary_max_chars() -> u32 {
	100
}

fn default_priority_keywords() -> Vec<String> {
	vec!["important".to_string(), "urgent".to_string()]
}

fn default_meeting_keywords() -> Vec<String> {
	vec!["meeting".to_string()]
}
