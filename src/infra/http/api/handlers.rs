//! Client handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::domain::clients::{ClientPatch, NewClient};

use super::error::ApiError;
use super::models::{
    ClientCreateRequest, ClientEnvelope, ClientListEnvelope, ClientUpdateRequest,
};
use super::state::ApiState;

pub async fn create_client(
    State(state): State<ApiState>,
    payload: Result<Json<ClientCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let client = NewClient::try_from(payload)?;
    let client = state.clients.create(client).await?;
    Ok((StatusCode::CREATED, Json(ClientEnvelope { client })))
}

pub async fn list_clients(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let clients = state.clients.list().await?;
    Ok(Json(ClientListEnvelope { clients }))
}

pub async fn get_client(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.clients.get_by_id(&id).await? {
        Some(client) => Ok(Json(ClientEnvelope { client })),
        None => Err(ApiError::not_found("client not found")),
    }
}

pub async fn update_client(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    payload: Result<Json<ClientUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let patch = ClientPatch::try_from(payload)?;
    let client = state.clients.update(&id, patch).await?;
    Ok(Json(ClientEnvelope { client }))
}

pub async fn delete_client(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let client = state.clients.delete(&id).await?;
    Ok(Json(ClientEnvelope { client }))
}

pub async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn db_health(State(state): State<ApiState>) -> Response {
    let Some(db) = state.db.as_ref() else {
        return StatusCode::NO_CONTENT.into_response();
    };

    match db.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
