//! Public read-only API surface.
//!
//! Every data route answers JSON from the cached services and stamps the
//! `Cache-Control` header for its duration class, so CDN behavior follows
//! the same classification as the in-process cache.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, Query, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    middleware,
    response::Response,
    routing::get,
};
use bytes::Bytes;
use serde::Deserialize;

use crate::application::directory::DirectoryService;
use crate::application::error::AppError;
use crate::application::repos::OrganizationQueryFilter;
use crate::application::snapshots::{SnapshotKind, SnapshotService};
use crate::cache::DurationClass;

use super::middleware::{log_responses, set_request_context};
use super::{HealthProbe, db_health_response};

#[derive(Clone)]
pub struct HttpState {
    pub directory: DirectoryService,
    pub snapshots: SnapshotService,
    pub health: Arc<dyn HealthProbe>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/organizations", get(list_organizations))
        .route("/api/organizations/{slug}", get(organization_detail))
        .route("/api/years/{year}", get(year_view))
        .route("/api/tech", get(tech_index))
        .route("/api/tech/{slug}", get(tech_detail))
        .route("/api/topics", get(topic_index))
        .route("/api/topics/{slug}", get(topic_detail))
        .route("/api/stats", get(homepage_stats))
        .route("/_health/db", get(db_health))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ListParams {
    year: Option<i32>,
    search: Option<String>,
    category: Option<String>,
}

impl From<ListParams> for OrganizationQueryFilter {
    fn from(params: ListParams) -> Self {
        Self {
            year: params.year,
            search: params.search.filter(|s| !s.trim().is_empty()),
            category: params.category.filter(|c| !c.trim().is_empty()),
        }
    }
}

fn json_response(payload: Bytes, class: DurationClass) -> Response {
    Response::builder()
        .header(CONTENT_TYPE, "application/json")
        .header(CACHE_CONTROL, class.cache_control())
        .body(Body::from(payload))
        // Infallible for static header values.
        .unwrap_or_default()
}

async fn list_organizations(
    State(state): State<HttpState>,
    Query(params): Query<ListParams>,
) -> Result<Response, AppError> {
    let filter = OrganizationQueryFilter::from(params);
    let (payload, class) = state.directory.list(&filter).await?;
    Ok(json_response(payload, class))
}

async fn organization_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let (payload, class) = state.directory.organization(&slug).await?;
    Ok(json_response(payload, class))
}

async fn year_view(
    State(state): State<HttpState>,
    Path(year): Path<i32>,
) -> Result<Response, AppError> {
    let (payload, class) = state.directory.year(year).await?;
    Ok(json_response(payload, class))
}

async fn tech_index(State(state): State<HttpState>) -> Result<Response, AppError> {
    let (payload, class) = state.snapshots.index(SnapshotKind::Tech).await?;
    Ok(json_response(payload, class))
}

async fn tech_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let (payload, class) = state.snapshots.detail(SnapshotKind::Tech, &slug).await?;
    Ok(json_response(payload, class))
}

async fn topic_index(State(state): State<HttpState>) -> Result<Response, AppError> {
    let (payload, class) = state.snapshots.index(SnapshotKind::Topic).await?;
    Ok(json_response(payload, class))
}

async fn topic_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let (payload, class) = state.snapshots.detail(SnapshotKind::Topic, &slug).await?;
    Ok(json_response(payload, class))
}

async fn homepage_stats(State(state): State<HttpState>) -> Result<Response, AppError> {
    let (payload, class) = state.snapshots.stats().await?;
    Ok(json_response(payload, class))
}

async fn db_health(State(state): State<HttpState>) -> Response {
    let mut response = db_health_response(state.health.ping().await);
    response.headers_mut().insert(
        CACHE_CONTROL,
        axum::http::HeaderValue::from_static(DurationClass::NoCache.cache_control()),
    );
    response
}
