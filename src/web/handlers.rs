use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppState, Result, WebError};
use crate::gateway::{RequestEnvelope, RequestList, Stats, StatusUpdate, SubmitReceipt};

#[derive(Debug, Default, Deserialize)]
pub struct GetRequestQuery {
    pub id: Option<String>,
}

pub async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// The body is taken raw so unparseable JSON surfaces as our own error payload.
pub async fn submit_request(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SubmitReceipt>> {
    let receipt = state.gateway.submit_json(&body).await?;
    Ok(Json(receipt))
}

pub async fn list_requests(State(state): State<AppState>) -> Json<RequestList> {
    Json(state.gateway.list().await)
}

pub async fn get_request(
    State(state): State<AppState>,
    query: std::result::Result<Query<GetRequestQuery>, QueryRejection>,
) -> Result<Json<RequestEnvelope>> {
    let Query(query) = query.map_err(|_| WebError::Input("Bad request".to_string()))?;
    let envelope = state.gateway.get(query.id.as_deref()).await?;
    Ok(Json(envelope))
}

pub async fn update_status(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StatusUpdate>> {
    let update = state.gateway.update_status_json(&body).await?;
    Ok(Json(update))
}

pub async fn stats(State(state): State<AppState>) -> Json<Stats> {
    Json(state.gateway.stats().await)
}

pub async fn unknown_route() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "requests": [] })))
}
