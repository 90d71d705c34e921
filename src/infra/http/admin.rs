//! Admin surface: cache invalidation behind a bearer token.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
};
use bytes::Bytes;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::application::error::{AppError, ErrorReport};
use crate::application::invalidation::{self, InvalidationOutcome, InvalidationRequest};
use crate::cache::TaggedStore;

use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct AdminState {
    /// Absent when caching is disabled; invalidation becomes a no-op.
    pub store: Option<Arc<TaggedStore>>,
    /// Absent when no token is configured; the surface is then locked shut.
    pub token: Option<Arc<String>>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/cache/invalidate", post(invalidate))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
        .with_state(state)
}

async fn admin_auth(
    State(state): State<AdminState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.token.as_ref() else {
        warn!("admin request rejected: no admin token configured");
        return unauthorized("admin surface disabled");
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    // Constant-time comparison: latency must not reveal how much of the
    // token matched.
    match presented {
        Some(token) if token.as_bytes().ct_eq(expected.as_bytes()).unwrap_u8() == 1 => {
            next.run(request).await
        }
        _ => unauthorized("invalid or missing bearer token"),
    }
}

fn unauthorized(detail: &str) -> Response {
    let mut response = StatusCode::UNAUTHORIZED.into_response();
    ErrorReport::from_message("infra::http::admin_auth", StatusCode::UNAUTHORIZED, detail)
        .attach(&mut response);
    response
}

/// Body is parsed by hand so malformed requests answer 400, not the JSON
/// extractor's 422.
async fn invalidate(
    State(state): State<AdminState>,
    body: Bytes,
) -> Result<Json<InvalidationOutcome>, AppError> {
    let request: InvalidationRequest = serde_json::from_slice(&body)
        .map_err(|err| AppError::validation(format!("malformed invalidation request: {err}")))?;

    if let InvalidationRequest::Tags { tags } = &request
        && tags.is_empty()
    {
        return Err(AppError::validation("invalidation request names no tags"));
    }

    let outcome = match &state.store {
        Some(store) => invalidation::apply(store, &request),
        None => InvalidationOutcome {
            purged: 0,
            tags: request.resolve().iter().map(|t| t.to_string()).collect(),
        },
    };

    Ok(Json(outcome))
}
