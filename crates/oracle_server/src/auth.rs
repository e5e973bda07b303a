//! Bearer API-key authentication for every non-health route

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::{models::error_response, AppState};

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    // Liveness probes stay unauthenticated
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let Some(expected) = state.config.server.api_key.as_deref() else {
        tracing::error!("server.api_key is not configured");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(error_response::<()>("Server configuration error".to_string())),
        )
            .into_response();
    };

    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match header.and_then(|value| value.strip_prefix("Bearer ")) {
        Some(token) if token == expected => next.run(request).await,
        Some(_) => {
            tracing::warn!("auth failed: invalid API key");
            (
                StatusCode::UNAUTHORIZED,
                Json(error_response::<()>("Invalid API key".to_string())),
            )
                .into_response()
        }
        None => {
            tracing::warn!("auth failed: missing or malformed Authorization header");
            (
                StatusCode::UNAUTHORIZED,
                Json(error_response::<()>(
                    "Expected Authorization: Bearer <token>".to_string(),
                )),
            )
                .into_response()
        }
    }
}
