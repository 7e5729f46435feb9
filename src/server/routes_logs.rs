//! Activity log read API.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::activity_log::LogLevel;

use super::AppContext;

/// Entries returned when no explicit limit is given.
const DEFAULT_LIMIT: usize = 200;

pub fn log_routes() -> Router<AppContext> {
    Router::new().route("/", get(get_logs))
}

#[derive(Debug, Deserialize)]
struct LogQuery {
    level: Option<String>,
    stash_id: Option<String>,
    limit: Option<usize>,
}

/// GET /api/logs?level=&stash_id=&limit= — newest entries first
///
/// An unrecognized level is ignored rather than rejected.
async fn get_logs(State(ctx): State<AppContext>, Query(query): Query<LogQuery>) -> Response {
    let level = query.level.as_deref().and_then(parse_level);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let logs = ctx.log.recent(level, query.stash_id.as_deref(), limit);
    Json(json!({ "count": logs.len(), "logs": logs })).into_response()
}

fn parse_level(raw: &str) -> Option<LogLevel> {
    match raw {
        "trace" => Some(LogLevel::Trace),
        "debug" => Some(LogLevel::Debug),
        "info" => Some(LogLevel::Info),
        "warning" => Some(LogLevel::Warning),
        "error" => Some(LogLevel::Error),
        _ => None,
    }
}
