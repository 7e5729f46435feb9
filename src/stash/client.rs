//! GraphQL client for Stash servers.
//!
//! One [`StashClient`] serves every configured stash; connection settings
//! travel with the [`StashConfig`] passed per call. Every query is a single
//! POST under a fixed 10-second deadline with no retries — a transient
//! failure surfaces once and callers degrade to an empty result instead of
//! amplifying load on the backend.

use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::config::StashConfig;
use crate::error::{Error, Result};

use super::types::{
    FindSceneData, FindScenesData, GraphQlResponse, Scene,
};

/// Deadline for a single Stash request, connection through body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum scenes requested per search.
pub const SEARCH_LIMIT: usize = 10;

/// Characters of an upstream error body kept in error messages.
const BODY_SNIPPET_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Query documents
// ---------------------------------------------------------------------------

const SCENE_FRAGMENT: &str = r#"
  fragment SceneData on Scene {
    id
    title
    details
    date
    rating100
    organized
    studio { id name image_path }
    tags { id name }
    performers { id name image_path }
    paths { screenshot preview stream }
    created_at
    updated_at
  }
"#;

const FIND_SCENES_QUERY: &str = r#"
  query FindScenes($filter: FindFilterType, $scene_filter: SceneFilterType) {
    findScenes(filter: $filter, scene_filter: $scene_filter) {
      count
      scenes { ...SceneData }
    }
  }
"#;

const FIND_SCENE_QUERY: &str = r#"
  query FindScene($id: ID!) {
    findScene(id: $id) { ...SceneData }
  }
"#;

const SYSTEM_STATUS_QUERY: &str = r#"
  query SystemStatus {
    systemStatus {
      appSchema
      status
      databasePath
    }
  }
"#;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Outcome of a connectivity probe against one stash.
#[derive(Debug, Clone, Serialize)]
pub struct PingOutcome {
    pub ok: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Shared GraphQL client for all configured stashes.
#[derive(Clone)]
pub struct StashClient {
    http: reqwest::Client,
}

impl Default for StashClient {
    fn default() -> Self {
        Self::new()
    }
}

impl StashClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");
        Self { http }
    }

    /// Execute one GraphQL query against a stash.
    ///
    /// At-most-once: a deadline or transport failure is returned immediately,
    /// never retried.
    async fn graphql<T: serde::de::DeserializeOwned>(
        &self,
        stash: &StashConfig,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}/graphql", stash.endpoint.trim_end_matches('/'));

        let mut request = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(&json!({ "query": query, "variables": variables }));
        if !stash.api_key.is_empty() {
            request = request.header("ApiKey", &stash.api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::SourceTimeout(REQUEST_TIMEOUT)
            } else {
                Error::SourceProtocol(format!("request to {url} failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(BODY_SNIPPET_LEN).collect();
            return Err(Error::SourceProtocol(format!(
                "Stash API {status}: {snippet}"
            )));
        }

        let envelope: GraphQlResponse<T> = response.json().await.map_err(|e| {
            if e.is_timeout() {
                Error::SourceTimeout(REQUEST_TIMEOUT)
            } else {
                Error::SourceProtocol(format!("malformed Stash response: {e}"))
            }
        })?;

        if !envelope.errors.is_empty() {
            let joined = envelope
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::SourceProtocol(format!("Stash GraphQL: {joined}")));
        }

        envelope
            .data
            .ok_or_else(|| Error::SourceProtocol("Stash GraphQL: empty response data".into()))
    }

    /// Search scenes by title, newest first.
    ///
    /// `year` is a soft filter: when at least one returned scene's date starts
    /// with that year the list narrows to those scenes, otherwise the
    /// unfiltered list is kept. A search that finds nothing stays empty.
    pub async fn find_scenes(
        &self,
        stash: &StashConfig,
        title: &str,
        year: Option<i32>,
        limit: usize,
    ) -> Result<Vec<Scene>> {
        let variables = json!({
            "filter": {
                "q": title,
                "per_page": limit,
                "sort": "date",
                "direction": "DESC",
            },
        });

        let query = format!("{SCENE_FRAGMENT}{FIND_SCENES_QUERY}");
        let data: FindScenesData = self.graphql(stash, &query, variables).await?;
        debug!(
            stash = %stash.id,
            title,
            found = data.find_scenes.scenes.len(),
            "scene search"
        );

        Ok(filter_by_year(data.find_scenes.scenes, year))
    }

    /// Fetch a single scene by id.
    ///
    /// Any failure — network, not-found, malformed response — collapses to
    /// `None`; callers never distinguish between them.
    pub async fn find_scene(&self, stash: &StashConfig, scene_id: &str) -> Option<Scene> {
        let query = format!("{SCENE_FRAGMENT}{FIND_SCENE_QUERY}");
        match self
            .graphql::<FindSceneData>(stash, &query, json!({ "id": scene_id }))
            .await
        {
            Ok(data) => data.find_scene,
            Err(e) => {
                debug!(stash = %stash.id, scene_id, error = %e, "scene fetch failed");
                None
            }
        }
    }

    /// Probe connectivity with a lightweight status query.
    ///
    /// Never errors; failures are folded into the outcome so the admin UI can
    /// display them.
    pub async fn ping(&self, stash: &StashConfig) -> PingOutcome {
        let start = Instant::now();
        let result = self
            .graphql::<serde_json::Value>(stash, SYSTEM_STATUS_QUERY, json!({}))
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => PingOutcome {
                ok: true,
                latency_ms,
                error: None,
            },
            Err(e) => PingOutcome {
                ok: false,
                latency_ms,
                error: Some(e.to_string()),
            },
        }
    }

    /// Fetch raw image bytes from a stash, attaching the API key.
    ///
    /// Used by the image proxy so Plex never needs Stash credentials.
    pub async fn fetch_image(
        &self,
        stash: &StashConfig,
        target_url: &str,
    ) -> Result<(String, bytes::Bytes)> {
        let mut request = self.http.get(target_url);
        if !stash.api_key.is_empty() {
            request = request.header("ApiKey", &stash.api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::SourceTimeout(REQUEST_TIMEOUT)
            } else {
                Error::SourceProtocol(format!("image fetch failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::SourceProtocol(format!("Stash returned {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::SourceProtocol(format!("image read failed: {e}")))?;

        Ok((content_type, bytes))
    }
}

/// Apply the soft year filter to a search result.
fn filter_by_year(scenes: Vec<Scene>, year: Option<i32>) -> Vec<Scene> {
    let Some(year) = year else {
        return scenes;
    };
    let prefix = year.to_string();
    let matching: Vec<Scene> = scenes
        .iter()
        .filter(|s| {
            s.date
                .as_deref()
                .map(|d| d.starts_with(&prefix))
                .unwrap_or(false)
        })
        .cloned()
        .collect();

    if matching.is_empty() {
        scenes
    } else {
        matching
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(id: &str, date: Option<&str>) -> Scene {
        Scene {
            id: id.to_string(),
            title: format!("Scene {id}"),
            details: None,
            date: date.map(String::from),
            rating100: None,
            organized: None,
            studio: None,
            tags: Vec::new(),
            performers: Vec::new(),
            paths: Default::default(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn year_filter_narrows_when_matches_exist() {
        let scenes = vec![
            scene("1", Some("2019-05-01")),
            scene("2", Some("2020-03-15")),
            scene("3", None),
        ];
        let filtered = filter_by_year(scenes, Some(2020));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "2");
    }

    #[test]
    fn year_filter_keeps_all_when_nothing_matches() {
        let scenes = vec![
            scene("1", Some("2019-05-01")),
            scene("2", Some("2020-03-15")),
        ];
        let filtered = filter_by_year(scenes, Some(1999));
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn year_filter_noop_without_year() {
        let scenes = vec![scene("1", Some("2019-05-01"))];
        assert_eq!(filter_by_year(scenes, None).len(), 1);
    }

    #[test]
    fn year_filter_on_empty_stays_empty() {
        assert!(filter_by_year(Vec::new(), Some(2020)).is_empty());
    }

    #[tokio::test]
    async fn find_scene_collapses_failures_to_none() {
        let client = StashClient::new();
        let stash = StashConfig {
            // Unroutable endpoint; the request fails fast.
            endpoint: "http://127.0.0.1:9".to_string(),
            ..StashConfig::default()
        };
        assert!(client.find_scene(&stash, "1").await.is_none());
    }

    #[tokio::test]
    async fn ping_reports_failure_without_erroring() {
        let client = StashClient::new();
        let stash = StashConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            ..StashConfig::default()
        };
        let outcome = client.ping(&stash).await;
        assert!(!outcome.ok);
        assert!(outcome.error.is_some());
    }
}
