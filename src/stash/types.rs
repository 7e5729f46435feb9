//! Stash GraphQL data types.
//!
//! Field names mirror the Stash GraphQL schema (snake_case), so these
//! deserialize directly from query responses. They also serialize, which the
//! integration tests use to build mock Stash responses.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Performer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Studio {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenePaths {
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub stream: Option<String>,
}

/// A single scene record fetched from a Stash server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub details: Option<String>,
    /// ISO date string, `YYYY-MM-DD`.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub rating100: Option<i32>,
    #[serde(default)]
    pub organized: Option<bool>,
    #[serde(default)]
    pub studio: Option<Studio>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub performers: Vec<Performer>,
    #[serde(default)]
    pub paths: ScenePaths,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub updated_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Query response envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    #[serde(default = "none")]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

fn none<T>() -> Option<T> {
    None
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FindScenesData {
    #[serde(rename = "findScenes")]
    pub find_scenes: FindScenesResult,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FindScenesResult {
    #[allow(dead_code)]
    pub count: i64,
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FindSceneData {
    #[serde(rename = "findScene")]
    pub find_scene: Option<Scene>,
}
