//! Provider operations: discovery, match, metadata, children, and images.
//!
//! Every operation here upholds one contract toward Plex: a well-formed
//! response comes back no matter what goes wrong upstream. Unknown stashes,
//! dead backends, and malformed scenes all collapse to empty containers;
//! failures are recorded in the activity log instead of surfacing as error
//! statuses, because Plex treats provider errors as fatal for the library.

pub mod mapper;
pub mod score;

use std::sync::Arc;

use tracing::debug;

use crate::activity_log::ActivityLog;
use crate::cache::{image_key, match_key, metadata_key, CachedImage, ProviderCache};
use crate::config::StashConfig;
use crate::error::Result;
use crate::ids::{build_identifier, build_rating_key, parse_rating_key, ItemKind, PROVIDER_VERSION};
use crate::plex::{
    ChildrenContainer, ChildrenResponse, Feature, ImageItem, ImagesResponse, MatchRequest,
    MatchResponse, MediaProvider, MetadataResponse, ProviderRootResponse, SchemeEntry, TypeEntry,
};
use crate::registry::StashRegistry;
use crate::stash::client::SEARCH_LIMIT;
use crate::stash::StashClient;

/// All provider operations for every configured stash.
#[derive(Clone)]
pub struct ProviderService {
    registry: Arc<StashRegistry>,
    client: StashClient,
    cache: Arc<ProviderCache>,
    log: Arc<ActivityLog>,
}

impl ProviderService {
    pub fn new(
        registry: Arc<StashRegistry>,
        client: StashClient,
        cache: Arc<ProviderCache>,
        log: Arc<ActivityLog>,
    ) -> Self {
        Self {
            registry,
            client,
            cache,
            log,
        }
    }

    /// The stash to serve, if it exists and is enabled.
    fn enabled_stash(&self, stash_id: &str) -> Option<StashConfig> {
        self.registry.get(stash_id).filter(|s| s.enabled)
    }

    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------

    /// Provider root served to Plex during discovery.
    ///
    /// Plex is strict about the shape: `MediaProvider` is a single object with
    /// no `MediaContainer` wrapper, `Type` entries carry `id` (not `type`),
    /// and every declared scheme must equal the identifier exactly.
    pub fn provider_root(&self, stash_id: &str) -> ProviderRootResponse {
        let title = self
            .registry
            .get(stash_id)
            .map(|s| s.display_name())
            .unwrap_or_else(|| format!("Stash {stash_id}"));
        let identifier = build_identifier(stash_id);

        self.log.info("Provider root requested", Some(stash_id));

        ProviderRootResponse {
            media_provider: MediaProvider {
                identifier: identifier.clone(),
                title,
                version: PROVIDER_VERSION.to_string(),
                protocols: "metadata".to_string(),
                types: [1, 2]
                    .into_iter()
                    .map(|id| TypeEntry {
                        id,
                        schemes: vec![SchemeEntry {
                            scheme: identifier.clone(),
                        }],
                    })
                    .collect(),
                features: vec![
                    Feature {
                        feature_type: "match".to_string(),
                        key: "/library/metadata/matches".to_string(),
                    },
                    Feature {
                        feature_type: "metadata".to_string(),
                        key: "/library/metadata".to_string(),
                    },
                    Feature {
                        feature_type: "images".to_string(),
                        key: "/library/metadata/images".to_string(),
                    },
                ],
            },
        }
    }

    // -----------------------------------------------------------------------
    // Match
    // -----------------------------------------------------------------------

    /// Search one stash for match candidates.
    pub async fn match_one(&self, stash_id: &str, request: &MatchRequest) -> MatchResponse {
        let kind = ItemKind::from_match_type(request.metadata_type);
        let cache_key = match_key(stash_id, &request.title, request.year, kind);
        if let Some(cached) = self.cache.matches.get(&cache_key) {
            debug!(stash = stash_id, title = %request.title, "match cache hit");
            return cached;
        }

        let Some(stash) = self.enabled_stash(stash_id) else {
            return MatchResponse::empty();
        };

        let scenes = match self
            .client
            .find_scenes(&stash, &request.title, request.year, SEARCH_LIMIT)
            .await
        {
            Ok(scenes) => scenes,
            Err(e) => {
                self.log
                    .error(format!("match error: {e}"), Some(stash_id));
                return MatchResponse::empty();
            }
        };

        let identifier = build_identifier(stash_id);
        let mut results: Vec<_> = scenes
            .iter()
            .map(|s| mapper::to_match_result(&identifier, s, &request.title, kind, request.year))
            .collect();
        results.sort_by(|a, b| b.score.cmp(&a.score));
        score::rescale(&mut results);

        self.log.info(
            format!(
                "Match \"{}\" -> {} results ({kind})",
                request.title,
                results.len()
            ),
            Some(stash_id),
        );

        let response = MatchResponse::new(results);
        self.cache.matches.insert(cache_key, response.clone());
        response
    }

    /// Match against the addressed stash, then fall back to the other enabled
    /// stashes in ascending priority order until one returns candidates.
    pub async fn match_with_fallback(
        &self,
        primary_stash_id: &str,
        request: &MatchRequest,
    ) -> MatchResponse {
        let primary = self.match_one(primary_stash_id, request).await;
        if !primary.is_empty() {
            return primary;
        }

        for stash in self.registry.fallback_candidates(primary_stash_id) {
            let result = self.match_one(&stash.id, request).await;
            if !result.is_empty() {
                self.log.info(
                    format!(
                        "Fallback match \"{}\" resolved via stash={}",
                        request.title, stash.id
                    ),
                    Some(primary_stash_id),
                );
                return result;
            }
        }

        MatchResponse::empty()
    }

    // -----------------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------------

    /// Fetch one item by rating key, rendered at the level the key addresses.
    pub async fn metadata(&self, stash_id: &str, item_id: &str) -> MetadataResponse {
        let cache_key = metadata_key(stash_id, item_id);
        if let Some(cached) = self.cache.metadata.get(&cache_key) {
            return cached;
        }

        let Some(stash) = self.enabled_stash(stash_id) else {
            return MetadataResponse::empty();
        };

        let (kind, scene_id) = parse_rating_key(item_id);
        let Some(scene) = self.client.find_scene(&stash, scene_id).await else {
            self.log.warning(
                format!("metadata miss: {item_id}"),
                Some(stash_id),
            );
            return MetadataResponse::empty();
        };

        let identifier = build_identifier(stash_id);
        let item = mapper::item_for_kind(kind, &identifier, stash_id, &scene, &stash.field_sync);

        self.log
            .debug(format!("Metadata fetched: {item_id} ({kind})"), Some(stash_id));

        let response = MetadataResponse::new(vec![item]);
        self.cache.metadata.insert(cache_key, response.clone());
        response
    }

    // -----------------------------------------------------------------------
    // Children
    // -----------------------------------------------------------------------

    /// Traverse the synthetic hierarchy one level down.
    ///
    /// A show yields its single Season 1, a season yields Episode 1 (the
    /// actual scene). Movies and episodes are leaves and return an empty
    /// container.
    pub async fn children(&self, stash_id: &str, item_id: &str) -> ChildrenResponse {
        let key = format!("/library/metadata/{item_id}/children");
        let (kind, scene_id) = parse_rating_key(item_id);

        if kind != ItemKind::Show && kind != ItemKind::Season {
            return ChildrenResponse::empty(key);
        }

        let Some(stash) = self.enabled_stash(stash_id) else {
            return ChildrenResponse::empty(key);
        };
        let Some(scene) = self.client.find_scene(&stash, scene_id).await else {
            self.log
                .warning(format!("children miss: {item_id}"), Some(stash_id));
            return ChildrenResponse::empty(key);
        };

        let identifier = build_identifier(stash_id);
        let fs = &stash.field_sync;

        if kind == ItemKind::Show {
            let season = mapper::season_item(&identifier, stash_id, &scene, fs);
            return ChildrenResponse {
                media_container: ChildrenContainer {
                    size: 1,
                    key,
                    parent_rating_key: Some(build_rating_key(ItemKind::Show, scene_id)),
                    parent_title: Some(scene.title.clone()),
                    metadata: vec![season],
                },
            };
        }

        let episode = mapper::episode_item(&identifier, stash_id, &scene, fs);
        ChildrenResponse {
            media_container: ChildrenContainer {
                size: 1,
                key,
                parent_rating_key: Some(build_rating_key(ItemKind::Season, scene_id)),
                parent_title: Some("Season 1".to_string()),
                metadata: vec![episode],
            },
        }
    }

    // -----------------------------------------------------------------------
    // Images
    // -----------------------------------------------------------------------

    /// Proxied image URLs for an item, honoring the poster/background toggles.
    pub async fn images(&self, stash_id: &str, item_id: &str) -> ImagesResponse {
        let Some(stash) = self.enabled_stash(stash_id) else {
            return ImagesResponse::empty();
        };

        let (_, scene_id) = parse_rating_key(item_id);
        let Some(scene) = self.client.find_scene(&stash, scene_id).await else {
            return ImagesResponse::empty();
        };

        let identifier = build_identifier(stash_id);
        let fs = &stash.field_sync;
        let rating_key = format!("{stash_id}.{}", scene.id);
        let mut images = Vec::new();

        if fs.poster {
            if let Some(url) = mapper::proxy_image_url(stash_id, scene.paths.screenshot.as_deref())
            {
                images.push(ImageItem {
                    image_type: "poster".to_string(),
                    url,
                    provider: identifier.clone(),
                    rating_key: rating_key.clone(),
                });
            }
        }
        if fs.background {
            if let Some(url) = mapper::proxy_image_url(stash_id, scene.paths.preview.as_deref()) {
                images.push(ImageItem {
                    image_type: "art".to_string(),
                    url,
                    provider: identifier.clone(),
                    rating_key: rating_key.clone(),
                });
            }
        }
        if fs.poster {
            for performer in &scene.performers {
                if let Some(url) = mapper::proxy_image_url(stash_id, performer.image_path.as_deref())
                {
                    images.push(ImageItem {
                        image_type: "poster".to_string(),
                        url,
                        provider: identifier.clone(),
                        rating_key: rating_key.clone(),
                    });
                }
            }
        }

        ImagesResponse::new(images)
    }

    /// Fetch image bytes through the cache, forwarding Stash credentials.
    pub async fn fetch_image_cached(
        &self,
        stash: &StashConfig,
        target_url: &str,
    ) -> Result<CachedImage> {
        let cache_key = image_key(&stash.id, target_url);
        if let Some(cached) = self.cache.images.get(&cache_key) {
            return Ok(cached);
        }

        let (content_type, bytes) = self.client.fetch_image(stash, target_url).await?;
        let image = CachedImage {
            content_type,
            bytes,
        };
        self.cache.images.insert(cache_key, image.clone());
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(stashes: Vec<StashConfig>) -> ProviderService {
        ProviderService::new(
            Arc::new(StashRegistry::new(stashes)),
            StashClient::new(),
            Arc::new(ProviderCache::new()),
            ActivityLog::new(),
        )
    }

    fn stash(id: &str, enabled: bool) -> StashConfig {
        StashConfig {
            id: id.to_string(),
            enabled,
            // Unroutable; any actual query fails fast.
            endpoint: "http://127.0.0.1:9".to_string(),
            ..StashConfig::default()
        }
    }

    #[tokio::test]
    async fn provider_root_shape() {
        let svc = service(vec![StashConfig {
            id: "home".into(),
            name: "Home Stash".into(),
            ..StashConfig::default()
        }]);
        let root = svc.provider_root("home");
        let provider = &root.media_provider;
        assert_eq!(provider.identifier, "tv.plex.agents.custom.stashbridge.home");
        assert_eq!(provider.title, "Home Stash");
        assert_eq!(provider.protocols, "metadata");
        assert_eq!(provider.types.len(), 2);
        for entry in &provider.types {
            assert_eq!(entry.schemes[0].scheme, provider.identifier);
        }
        assert_eq!(provider.features.len(), 3);
    }

    #[tokio::test]
    async fn provider_root_falls_back_to_generic_title() {
        let svc = service(Vec::new());
        let root = svc.provider_root("ghost");
        assert_eq!(root.media_provider.title, "Stash ghost");
    }

    #[tokio::test]
    async fn match_unknown_stash_is_empty() {
        let svc = service(Vec::new());
        let request = MatchRequest {
            title: "Anything".into(),
            year: None,
            metadata_type: None,
        };
        assert!(svc.match_one("ghost", &request).await.is_empty());
    }

    #[tokio::test]
    async fn match_disabled_stash_is_empty() {
        let svc = service(vec![stash("off", false)]);
        let request = MatchRequest {
            title: "Anything".into(),
            year: None,
            metadata_type: None,
        };
        assert!(svc.match_one("off", &request).await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_backend_degrades_to_empty() {
        let svc = service(vec![stash("dead", true)]);
        let request = MatchRequest {
            title: "Anything".into(),
            year: None,
            metadata_type: None,
        };
        assert!(svc.match_one("dead", &request).await.is_empty());
        let meta = svc.metadata("dead", "movie.1").await;
        assert_eq!(meta.media_container.size, 0);
    }

    #[tokio::test]
    async fn leaves_have_no_children() {
        let svc = service(vec![stash("home", true)]);
        for item_id in ["movie.42", "episode.42", "99"] {
            let children = svc.children("home", item_id).await;
            assert_eq!(children.media_container.size, 0);
            assert_eq!(
                children.media_container.key,
                format!("/library/metadata/{item_id}/children")
            );
        }
    }
}
