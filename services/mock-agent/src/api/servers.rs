//! Mock CN endpoints.
//!
//! - `GET /servers`: list servers (always empty)
//! - `GET /servers/{uuid}`: server stub
//! - `POST /servers/{uuid}`: validate and complete an inventory record
//! - `DELETE /servers/{uuid}`: acknowledge a delete

use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    routing::{get, on, MethodFilter},
    Json, Router,
};
use mockcn_id::ServerUuid;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use super::error::ApiError;
use crate::context::AppState;
use crate::inventory::InventoryRecord;

/// Create server routes.
///
/// HEAD is routed explicitly so it does not inherit the GET handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/servers",
            on(MethodFilter::HEAD, not_found)
                .get(list_servers)
                .fallback(not_found),
        )
        .route(
            "/servers/{id}",
            on(MethodFilter::HEAD, not_found)
                .get(get_server)
                .post(create_server)
                .delete(delete_server)
                .fallback(not_found),
        )
}

/// Fallback for unknown paths, methods and ids.
pub async fn not_found() -> ApiError {
    ApiError::not_found("not_found", "resource not found")
}

fn parse_server_uuid(id: &str) -> Result<ServerUuid, ApiError> {
    id.parse()
        .map_err(|_| ApiError::not_found("not_found", format!("no server {id:?}")))
}

/// An id segment that cannot be decoded names no server either.
fn server_uuid_from_path(
    path: Result<Path<String>, PathRejection>,
) -> Result<ServerUuid, ApiError> {
    match path {
        Ok(Path(id)) => parse_server_uuid(&id),
        Err(rejection) => {
            debug!(error = %rejection, "Undecodable server id");
            Err(ApiError::not_found("not_found", "resource not found"))
        }
    }
}

/// Parse a request body as an inventory record; an empty body is `{}`.
fn parse_record(body: &[u8]) -> Result<InventoryRecord, ApiError> {
    if body.is_empty() {
        return Ok(InventoryRecord::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(_) => Err(ApiError::bad_request(
            "malformed_request",
            "request body must be a JSON object",
        )),
        Err(e) => Err(ApiError::bad_request(
            "malformed_request",
            format!("invalid JSON body: {e}"),
        )),
    }
}

async fn list_servers() -> Json<Vec<Value>> {
    Json(Vec::new())
}

async fn get_server(
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let server_uuid = server_uuid_from_path(path)?;
    Ok(Json(json!({ "uuid": server_uuid.to_string() })))
}

async fn create_server(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> Result<(StatusCode, Json<InventoryRecord>), ApiError> {
    let server_uuid = server_uuid_from_path(path)?;

    let snapshot = state.store().load().await.map_err(|e| {
        error!(server_uuid = %server_uuid, error = %e, "Failed to load state");
        ApiError::from(e)
    })?;

    let record = parse_record(&body)?;
    let validated = state
        .validator()
        .validate(&server_uuid, &record)
        .map_err(|e| {
            info!(server_uuid = %server_uuid, error = %e, "Rejected inventory");
            ApiError::from(e)
        })?;

    let record = state
        .defaults()
        .apply_defaults(&server_uuid, validated, &snapshot)
        .await;

    info!(server_uuid = %server_uuid, fields = record.len(), "Created mock CN");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn delete_server(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let server_uuid = server_uuid_from_path(path)?;

    state.store().load().await.map_err(|e| {
        error!(server_uuid = %server_uuid, error = %e, "Failed to load state");
        ApiError::from(e)
    })?;

    info!(server_uuid = %server_uuid, "Deleted mock CN");
    Ok((StatusCode::OK, [(CONTENT_TYPE, "application/json")]))
}
