use axum::{
	Json, Router,
	extract::{
		Path, Query, State,
		rejection::{JsonRejection, PathRejection, QueryRejection},
	},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::get,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use summa_service::{
	CreateNoteRequest, Error as ServiceError, ListNotesRequest, ListNotesResponse,
	NoteFetchRequest, NoteResponse, time_serde,
};

use crate::state::AppState;

pub const HEADER_OWNER_ID: &str = "X-Summa-Owner-Id";

const HEADER_AUTHORIZATION: &str = "Authorization";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/notes", get(list_notes).post(create_note))
		.route("/v1/notes/{note_id}", get(get_note))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteBody {
	pub raw_text: String,
}

#[derive(Debug, Deserialize)]
pub struct ListNotesQuery {
	pub page: Option<u32>,
	pub size: Option<u32>,
	pub search: Option<String>,
	pub status: Option<String>,
	pub created_after: Option<String>,
	pub created_before: Option<String>,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn create_note(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<CreateNoteBody>, JsonRejection>,
) -> Result<(StatusCode, Json<NoteResponse>), ApiError> {
	let owner_id = authenticate(&state, &headers)?;
	let Json(body) = payload.map_err(|err| {
		json_error(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_REQUEST", err.body_text(), None)
	})?;
	let note =
		state.service.create_note(CreateNoteRequest { owner_id, raw_text: body.raw_text }).await?;

	Ok((StatusCode::CREATED, Json(note)))
}

async fn get_note(
	State(state): State<AppState>,
	headers: HeaderMap,
	note_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<NoteResponse>, ApiError> {
	let owner_id = authenticate(&state, &headers)?;
	let Ok(Path(note_id)) = note_id else {
		return Err(json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Note not found.", None));
	};
	let note = state.service.get_note(NoteFetchRequest { owner_id, note_id }).await?;

	Ok(Json(note))
}

async fn list_notes(
	State(state): State<AppState>,
	headers: HeaderMap,
	query: Result<Query<ListNotesQuery>, QueryRejection>,
) -> Result<Json<ListNotesResponse>, ApiError> {
	let owner_id = authenticate(&state, &headers)?;
	let Query(query) = query.map_err(|err| {
		json_error(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_REQUEST", err.body_text(), None)
	})?;
	let created_after = parse_timestamp(query.created_after.as_deref(), "$.created_after")?;
	let created_before = parse_timestamp(query.created_before.as_deref(), "$.created_before")?;
	let response = state
		.service
		.list_notes(ListNotesRequest {
			owner_id,
			page: query.page,
			size: query.size,
			search: query.search,
			status: query.status,
			created_after,
			created_before,
		})
		.await?;

	Ok(Json(response))
}

/// Resolves the caller's owner id, enforcing the bearer token when one is configured.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
	if let Some(expected) = state.api_auth_token.as_deref() {
		let presented = headers
			.get(HEADER_AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.and_then(|value| value.strip_prefix("Bearer "))
			.map(str::trim);

		if presented != Some(expected) {
			return Err(json_error(
				StatusCode::UNAUTHORIZED,
				"UNAUTHENTICATED",
				"A valid bearer token is required.",
				None,
			));
		}
	}

	let owner_id = headers
		.get(HEADER_OWNER_ID)
		.and_then(|value| value.to_str().ok())
		.map(str::trim)
		.filter(|value| !value.is_empty());

	match owner_id {
		Some(owner_id) => Ok(owner_id.to_string()),
		None => Err(json_error(
			StatusCode::UNAUTHORIZED,
			"UNAUTHENTICATED",
			format!("{HEADER_OWNER_ID} header is required."),
			None,
		)),
	}
}

fn parse_timestamp(
	raw: Option<&str>,
	field: &str,
) -> Result<Option<time::OffsetDateTime>, ApiError> {
	raw.map(time_serde::parse).transpose().map_err(|_| {
		json_error(
			StatusCode::UNPROCESSABLE_ENTITY,
			"INVALID_REQUEST",
			"Timestamps must be RFC 3339.",
			Some(vec![field.to_string()]),
		)
	})
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				json_error(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_REQUEST", message, None),
			ServiceError::InvalidField { field, message } => json_error(
				StatusCode::UNPROCESSABLE_ENTITY,
				"INVALID_REQUEST",
				message,
				Some(vec![field]),
			),
			ServiceError::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			ServiceError::Storage { message } => {
				tracing::error!(error = %message, "Storage error while serving request.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"INTERNAL_ERROR",
					"Internal storage error.",
					None,
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}
