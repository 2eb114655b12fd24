use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use summa_domain::NoteStatus;
use summa_storage::NoteQuery;

use crate::{Error, NoteResponse, NoteService, Result, notes::validate_owner};

const MAX_SEARCH_CHARS: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListNotesRequest {
	pub owner_id: String,
	/// 1-based. Defaults to the first page.
	pub page: Option<u32>,
	pub size: Option<u32>,
	pub search: Option<String>,
	pub status: Option<String>,
	#[serde(default, with = "crate::time_serde::option")]
	pub created_after: Option<OffsetDateTime>,
	#[serde(default, with = "crate::time_serde::option")]
	pub created_before: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListNotesResponse {
	pub items: Vec<NoteResponse>,
	pub total: u64,
	pub page: u32,
	pub size: u32,
	pub pages: u64,
}

impl NoteService {
	/// Lists the caller's notes, newest first.
	pub async fn list_notes(&self, req: ListNotesRequest) -> Result<ListNotesResponse> {
		let owner_id = validate_owner(&req.owner_id)?;
		let page = req.page.unwrap_or(1);

		if page == 0 {
			return Err(Error::invalid_field("$.page", "page must be at least 1."));
		}

		let max_size = self.cfg.notes.max_page_size;
		let size = req.size.unwrap_or(self.cfg.notes.default_page_size);

		if size == 0 || size > max_size {
			return Err(Error::invalid_field(
				"$.size",
				format!("size must be between 1 and {max_size}."),
			));
		}

		let search = match req.search.as_deref() {
			Some(raw) => Some(validate_search(raw)?),
			None => None,
		};
		let status = req
			.status
			.as_deref()
			.map(str::parse::<NoteStatus>)
			.transpose()
			.map_err(|err| Error::invalid_field("$.status", err.to_string()))?;

		if let (Some(after), Some(before)) = (req.created_after, req.created_before)
			&& after > before
		{
			return Err(Error::InvalidRequest {
				message: "created_after must not be later than created_before.".to_string(),
			});
		}

		let query = NoteQuery {
			owner_id: Some(owner_id.to_string()),
			search,
			status,
			created_after: req.created_after,
			created_before: req.created_before,
			limit: size,
			offset: u64::from(page - 1) * u64::from(size),
		};
		let found = self.store.list_notes(&query).await?;
		let pages = found.total.div_ceil(u64::from(size));

		Ok(ListNotesResponse {
			items: found.notes.into_iter().map(NoteResponse::from).collect(),
			total: found.total,
			page,
			size,
			pages,
		})
	}
}

fn validate_search(raw: &str) -> Result<String> {
	let trimmed = raw.trim();
	let chars = trimmed.chars().count();

	if chars == 0 || chars > MAX_SEARCH_CHARS {
		return Err(Error::invalid_field(
			"$.search",
			format!("search must be between 1 and {MAX_SEARCH_CHARS} characters."),
		));
	}

	Ok(trimmed.to_string())
}
