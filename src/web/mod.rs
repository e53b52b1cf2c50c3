//! HTTP binding for the request gateway.
//!
//! Routes:
//! - `POST  /api/request`      submit a guest request
//! - `GET   /api/request?id=`  fetch one request
//! - `PATCH /api/request`      update a request's status
//! - `GET   /api/requests`     list retained requests
//! - `GET   /api/stats`        request numbers issued so far
//! - `GET   /health`           liveness probe

pub mod handlers;
pub mod state;

pub use state::AppState;

use crate::core::DeskError;
use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use http::Method;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum WebError {
    Desk(DeskError),
    /// Request shape the extractor could not make sense of.
    Input(String),
}

impl From<DeskError> for WebError {
    fn from(err: DeskError) -> Self {
        WebError::Desk(err)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            WebError::Desk(DeskError::MalformedInput(msg)) => {
                (StatusCode::BAD_REQUEST, msg, "invalid_json")
            }
            WebError::Desk(DeskError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, msg, "validation_error")
            }
            WebError::Desk(DeskError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg, "not_found"),
            WebError::Input(msg) => (StatusCode::BAD_REQUEST, msg, "input_error"),
        };

        let body = Json(ErrorResponse {
            ok: false,
            error: message,
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any);

    let mut router = Router::new().route("/health", get(handlers::healthcheck));

    // Clients in the field call these with and without a trailing slash.
    for path in ["/api/request", "/api/request/"] {
        router = router.route(
            path,
            get(handlers::get_request)
                .post(handlers::submit_request)
                .patch(handlers::update_status),
        );
    }
    for path in ["/api/requests", "/api/requests/"] {
        router = router.route(path, get(handlers::list_requests));
    }
    for path in ["/api/stats", "/api/stats/"] {
        router = router.route(path, get(handlers::stats));
    }

    router
        .fallback(handlers::unknown_route)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desk_errors_map_to_client_statuses() {
        let cases = [
            (DeskError::malformed("Invalid JSON"), StatusCode::BAD_REQUEST),
            (DeskError::validation("Missing id"), StatusCode::BAD_REQUEST),
            (DeskError::not_found("Not found"), StatusCode::NOT_FOUND),
        ];
        for (err, expected) in cases {
            assert_eq!(WebError::from(err).into_response().status(), expected);
        }
        assert_eq!(
            WebError::Input("Bad request".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
