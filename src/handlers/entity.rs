//! Entity CRUD handlers: list, read, create, update, delete.

use crate::error::AppError;
use crate::response::{success_many, success_one};
use crate::service::{Operations, RecordId};
use crate::sql::ID;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::sync::Arc;

fn operations(state: &AppState, entity: &str) -> Result<Arc<dyn Operations>, AppError> {
    state
        .registry
        .get(entity)
        .cloned()
        .ok_or_else(|| AppError::NotFound(entity.to_string()))
}

fn parse_id(id_str: &str) -> Result<RecordId, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id: {}", id_str)))
}

fn require_object(body: &Value) -> Result<(), AppError> {
    if body.is_object() {
        Ok(())
    } else {
        Err(AppError::BadRequest("body must be a JSON object".into()))
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(entity): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ops = operations(&state, &entity)?;
    let rows = ops.get_all().await?;
    Ok(success_many(rows))
}

pub async fn read(
    State(state): State<AppState>,
    Path((entity, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let ops = operations(&state, &entity)?;
    let id = parse_id(&id_str)?;
    let row = ops.get_by_id(id).await?;
    Ok(success_one(row))
}

pub async fn create(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let ops = operations(&state, &entity)?;
    let Json(body) = body?;
    require_object(&body)?;
    let result = ops.create(&body).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// The path id is the update key; an `id` in the body must agree with it.
pub async fn update(
    State(state): State<AppState>,
    Path((entity, id_str)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let ops = operations(&state, &entity)?;
    let id = parse_id(&id_str)?;
    let Json(body) = body?;
    let Value::Object(mut payload) = body else {
        return Err(AppError::BadRequest("body must be a JSON object".into()));
    };
    if let Some(body_id) = payload.get(ID) {
        if body_id.as_i64() != Some(id) {
            return Err(AppError::BadRequest("body id does not match path id".into()));
        }
    }
    payload.insert(ID.to_string(), Value::from(id));
    let result = ops.update(&Value::Object(payload)).await?;
    Ok((StatusCode::OK, Json(result)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((entity, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let ops = operations(&state, &entity)?;
    let id = parse_id(&id_str)?;
    let ack = ops.delete(id).await?;
    Ok((StatusCode::OK, Json(ack)))
}
