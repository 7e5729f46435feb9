//! Plex-facing provider routes.
//!
//! Everything under `/providers/:stash_id` speaks the Plex custom metadata
//! provider protocol. Provider operations never surface upstream failures as
//! error statuses; only the route-level guards (unknown/disabled stash, bad
//! proxy URL) return non-2xx responses.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::config::StashConfig;
use crate::plex::MatchRequest;

use super::AppContext;

/// How long Plex may cache a proxied image (6 hours).
const IMAGE_CACHE_CONTROL: &str = "public, max-age=21600";

pub fn provider_routes() -> Router<AppContext> {
    Router::new()
        // Provider root — Plex discovery
        .route("/:stash_id", get(provider_root))
        // Match — Plex sends title/year/type, returns candidates
        .route("/:stash_id/library/metadata/matches", post(match_metadata))
        // Metadata — fetch Movie / Show / Season / Episode by ratingKey
        .route("/:stash_id/library/metadata/:id", get(get_metadata))
        // Children — traverse the Show → Season → Episode hierarchy
        .route(
            "/:stash_id/library/metadata/:id/children",
            get(get_children),
        )
        // Images — proxied image URLs for any item type
        .route("/:stash_id/library/metadata/:id/images", get(get_images))
        // Image proxy — streams images from Stash with API key auth
        .route("/:stash_id/imageProxy", get(image_proxy))
}

// ===========================================================================
// Guards and helpers
// ===========================================================================

/// Resolve the addressed stash, rejecting unknown and disabled ones with a
/// 404 so Plex drops the provider instead of retrying.
fn require_enabled_stash(ctx: &AppContext, stash_id: &str) -> Result<StashConfig, Response> {
    let Some(stash) = ctx.registry.get(stash_id) else {
        return Err(not_found(format!(
            "Stash \"{stash_id}\" not found in configuration"
        )));
    };
    if !stash.enabled {
        return Err(not_found(format!(
            "Provider \"{stash_id}\" is currently disabled"
        )));
    }
    Ok(stash)
}

fn not_found(message: String) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not Found", "message": message })),
    )
        .into_response()
}

/// Merge query-string and body match parameters, body winning on conflicts.
///
/// Plex sends title/year/type either as query parameters or as a JSON body
/// depending on server version, and numeric values arrive as strings in the
/// query string.
fn merge_match_payload(
    query: &HashMap<String, String>,
    body: Option<&Value>,
) -> Option<MatchRequest> {
    let mut title = query.get("title").cloned();
    let mut year = query.get("year").and_then(|v| v.parse::<i32>().ok());
    let mut metadata_type = query.get("type").and_then(|v| v.parse::<i64>().ok());

    if let Some(Value::Object(body)) = body {
        if let Some(v) = body.get("title").and_then(Value::as_str) {
            title = Some(v.to_string());
        }
        if let Some(v) = body.get("year") {
            year = coerce_int(v).map(|n| n as i32).or(year);
        }
        if let Some(v) = body.get("type") {
            metadata_type = coerce_int(v).or(metadata_type);
        }
    }

    let title = title.filter(|t| !t.trim().is_empty())?;
    Some(MatchRequest {
        title,
        year,
        metadata_type,
    })
}

/// Accept both JSON numbers and numeric strings.
fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

// ===========================================================================
// Handlers
// ===========================================================================

/// GET /providers/:stash_id — provider root (Plex discovery)
async fn provider_root(
    State(ctx): State<AppContext>,
    Path(stash_id): Path<String>,
) -> Response {
    if let Err(rejection) = require_enabled_stash(&ctx, &stash_id) {
        return rejection;
    }
    Json(ctx.provider.provider_root(&stash_id)).into_response()
}

/// POST /providers/:stash_id/library/metadata/matches — match with fallback
async fn match_metadata(
    State(ctx): State<AppContext>,
    Path(stash_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    body: Option<Json<Value>>,
) -> Response {
    if let Err(rejection) = require_enabled_stash(&ctx, &stash_id) {
        return rejection;
    }

    let Some(request) = merge_match_payload(&query, body.as_deref()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Validation Error",
                "message": "title is required",
            })),
        )
            .into_response();
    };

    Json(ctx.provider.match_with_fallback(&stash_id, &request).await).into_response()
}

/// GET /providers/:stash_id/library/metadata/:id — metadata for any item type
async fn get_metadata(
    State(ctx): State<AppContext>,
    Path((stash_id, id)): Path<(String, String)>,
) -> Response {
    if let Err(rejection) = require_enabled_stash(&ctx, &stash_id) {
        return rejection;
    }
    Json(ctx.provider.metadata(&stash_id, &id).await).into_response()
}

/// GET /providers/:stash_id/library/metadata/:id/children
async fn get_children(
    State(ctx): State<AppContext>,
    Path((stash_id, id)): Path<(String, String)>,
) -> Response {
    if let Err(rejection) = require_enabled_stash(&ctx, &stash_id) {
        return rejection;
    }
    Json(ctx.provider.children(&stash_id, &id).await).into_response()
}

/// GET /providers/:stash_id/library/metadata/:id/images
async fn get_images(
    State(ctx): State<AppContext>,
    Path((stash_id, id)): Path<(String, String)>,
) -> Response {
    if let Err(rejection) = require_enabled_stash(&ctx, &stash_id) {
        return rejection;
    }
    Json(ctx.provider.images(&stash_id, &id).await).into_response()
}

#[derive(Debug, Deserialize)]
struct ImageProxyQuery {
    url: Option<String>,
}

/// GET /providers/:stash_id/imageProxy?url=<encoded>
///
/// Proxies images from Stash with authentication so Plex can fetch them
/// without knowing the Stash API key. Only URLs on the configured stash
/// origin are proxied; anything else is rejected to keep this from becoming
/// an open relay.
async fn image_proxy(
    State(ctx): State<AppContext>,
    Path(stash_id): Path<String>,
    Query(query): Query<ImageProxyQuery>,
) -> Response {
    let Some(raw_url) = query.url.filter(|u| !u.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "url query parameter is required" })),
        )
            .into_response();
    };

    let Some(stash) = ctx.registry.get(&stash_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Stash not found" })),
        )
            .into_response();
    };

    let Ok(endpoint) = Url::parse(&stash.endpoint) else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "stash endpoint is not a valid URL" })),
        )
            .into_response();
    };

    // Relative URLs resolve against the stash endpoint.
    let target = match Url::parse(&raw_url) {
        Ok(url) => url,
        Err(_) => match endpoint.join(&raw_url) {
            Ok(url) => url,
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "url is not a valid URL" })),
                )
                    .into_response();
            }
        },
    };

    if target.origin() != endpoint.origin() {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "URL origin does not match stash endpoint" })),
        )
            .into_response();
    }

    match ctx.provider.fetch_image_cached(&stash, target.as_str()).await {
        Ok(image) => (
            [
                (header::CONTENT_TYPE, image.content_type),
                (header::CACHE_CONTROL, IMAGE_CACHE_CONTROL.to_string()),
            ],
            image.bytes,
        )
            .into_response(),
        Err(e) => (
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::BAD_GATEWAY),
            Json(json!({ "error": format!("Image fetch failed: {e}") })),
        )
            .into_response(),
    }
}
