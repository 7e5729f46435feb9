//! Admin API: stash CRUD, connectivity probes, and cache management.
//!
//! Edits apply to the in-memory registry only; the config file on disk stays
//! untouched and reseeds the registry on the next restart.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::config::StashConfig;
use crate::error::Error;
use crate::registry::StashUpdate;

use super::AppContext;

pub fn config_routes() -> Router<AppContext> {
    Router::new()
        // Stash CRUD
        .route("/stashes", get(list_stashes).post(create_stash))
        .route(
            "/stashes/:id",
            get(get_stash).put(update_stash).delete(delete_stash),
        )
        // Stash operations
        .route("/stashes/:id/ping", post(ping_stash))
        .route("/stashes/reorder", put(reorder_stashes))
        // Cache management
        .route("/cache", get(cache_stats).delete(clear_cache))
}

// ===========================================================================
// Helpers
// ===========================================================================

fn not_found(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": format!("Stash \"{id}\" not found"),
        })),
    )
        .into_response()
}

fn validation_error(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Validation Error", "message": message })),
    )
        .into_response()
}

fn validate_stash(stash: &StashConfig) -> Result<(), Response> {
    if stash.id.trim().is_empty() {
        return Err(validation_error("id must not be empty"));
    }
    match Url::parse(&stash.endpoint) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        _ => Err(validation_error("endpoint must be an http(s) URL")),
    }
}

// ===========================================================================
// Handlers
// ===========================================================================

/// GET /api/config/stashes — list all stashes, sorted by priority
async fn list_stashes(State(ctx): State<AppContext>) -> Response {
    let mut stashes = ctx.registry.list();
    stashes.sort_by_key(|s| s.priority);
    Json(json!({ "stashes": stashes })).into_response()
}

/// GET /api/config/stashes/:id
async fn get_stash(State(ctx): State<AppContext>, Path(id): Path<String>) -> Response {
    match ctx.registry.get(&id) {
        Some(stash) => Json(json!({ "stash": stash })).into_response(),
        None => not_found(&id),
    }
}

/// POST /api/config/stashes — register a new stash
async fn create_stash(
    State(ctx): State<AppContext>,
    Json(stash): Json<StashConfig>,
) -> Response {
    if let Err(rejection) = validate_stash(&stash) {
        return rejection;
    }

    match ctx.registry.insert(stash.clone()) {
        Ok(()) => {
            ctx.log
                .info(format!("Stash \"{}\" registered", stash.id), Some(&stash.id));
            (StatusCode::CREATED, Json(json!({ "stash": stash }))).into_response()
        }
        Err(e @ Error::Conflict(_)) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "Conflict", "message": e.to_string() })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// PUT /api/config/stashes/:id — partial update
async fn update_stash(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(update): Json<StashUpdate>,
) -> Response {
    if let Some(endpoint) = &update.endpoint {
        match Url::parse(endpoint) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => return validation_error("endpoint must be an http(s) URL"),
        }
    }

    match ctx.registry.update(&id, update) {
        Ok(stash) => Json(json!({ "stash": stash })).into_response(),
        Err(_) => not_found(&id),
    }
}

/// DELETE /api/config/stashes/:id
async fn delete_stash(State(ctx): State<AppContext>, Path(id): Path<String>) -> Response {
    if ctx.registry.remove(&id) {
        ctx.log.info(format!("Stash \"{id}\" removed"), Some(&id));
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found(&id)
    }
}

/// POST /api/config/stashes/:id/ping — connectivity probe
async fn ping_stash(State(ctx): State<AppContext>, Path(id): Path<String>) -> Response {
    let Some(stash) = ctx.registry.get(&id) else {
        return not_found(&id);
    };
    Json(ctx.client.ping(&stash).await).into_response()
}

#[derive(Debug, Deserialize)]
struct ReorderRequest {
    order: Vec<String>,
}

/// PUT /api/config/stashes/reorder — batch-assign priorities by position
async fn reorder_stashes(
    State(ctx): State<AppContext>,
    Json(request): Json<ReorderRequest>,
) -> Response {
    for (position, id) in request.order.iter().enumerate() {
        // Unknown ids are skipped; the rest still land.
        let _ = ctx.registry.update(
            id,
            StashUpdate {
                priority: Some(position as i32),
                ..StashUpdate::default()
            },
        );
    }

    let mut stashes = ctx.registry.list();
    stashes.sort_by_key(|s| s.priority);
    Json(json!({ "stashes": stashes })).into_response()
}

/// GET /api/config/cache — cache stats
async fn cache_stats(State(ctx): State<AppContext>) -> Response {
    Json(ctx.cache.stats()).into_response()
}

/// DELETE /api/config/cache — drop every cached entry
async fn clear_cache(State(ctx): State<AppContext>) -> Response {
    ctx.cache.clear();
    ctx.log.info("Cache cleared", None);
    Json(json!({ "cleared": true })).into_response()
}
