//! Plex metadata-provider wire types.
//!
//! These structs serialize to the exact JSON shapes the Plex server expects
//! from a custom metadata provider. Plex is strict about several details:
//!
//! - The provider root is a single `MediaProvider` object, never an array,
//!   with no `MediaContainer` wrapper.
//! - `Type` entries use an `id` field (not `type`); using `type` makes Plex
//!   fail with "object expected" parse errors.
//! - `Scheme[].scheme` must equal the provider identifier exactly.
//! - Optional metadata fields must be absent, not null, when unset.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Provider root
// ---------------------------------------------------------------------------

/// Provider root response: `{ MediaProvider: { ... } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRootResponse {
    #[serde(rename = "MediaProvider")]
    pub media_provider: MediaProvider,
}

/// The MediaProvider object returned at the provider root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaProvider {
    pub identifier: String,
    pub title: String,
    pub version: String,
    /// Always `"metadata"` for a metadata-only provider.
    pub protocols: String,
    #[serde(rename = "Type")]
    pub types: Vec<TypeEntry>,
    #[serde(rename = "Feature")]
    pub features: Vec<Feature>,
}

/// A supported media-type declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeEntry {
    /// Plex metadata type integer (1 = Movie, 2 = Show).
    pub id: i64,
    #[serde(rename = "Scheme")]
    pub schemes: Vec<SchemeEntry>,
}

/// GUID scheme declaration; `scheme` must equal the provider identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemeEntry {
    pub scheme: String,
}

/// A provider feature declaration (match / metadata / images).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub feature_type: String,
    pub key: String,
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// Match request sent by Plex (JSON body and/or query string).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// 1 = Movie, 2 = Show.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub metadata_type: Option<i64>,
}

/// A single match candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub guid: String,
    pub name: String,
    pub year: i32,
    pub score: u8,
    #[serde(rename = "type")]
    pub result_type: String,
}

/// Match response: `{ MediaContainer: { size, SearchResult } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    #[serde(rename = "MediaContainer")]
    pub media_container: MatchContainer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchContainer {
    pub size: usize,
    #[serde(rename = "SearchResult")]
    pub search_results: Vec<MatchResult>,
}

impl MatchResponse {
    /// Build a response from candidates, setting `size` accordingly.
    pub fn new(search_results: Vec<MatchResult>) -> Self {
        Self {
            media_container: MatchContainer {
                size: search_results.len(),
                search_results,
            },
        }
    }

    /// The canonical "no match" response.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Whether this response carries any candidates.
    pub fn is_empty(&self) -> bool {
        self.media_container.search_results.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Metadata items
// ---------------------------------------------------------------------------

/// A genre label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    pub tag: String,
}

/// A cast entry; `thumb` is a proxied performer image when available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
}

/// Unified metadata item for Movie (1), Show (2), Season (3), and Episode (4).
///
/// Fields beyond the shared base are populated per kind by the scene mapper;
/// unset optional fields are omitted from the JSON entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataItem {
    pub rating_key: String,
    pub key: String,
    pub guid: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub title: String,
    pub summary: String,
    pub year: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub studio: Option<String>,
    #[serde(rename = "Genre", skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<Genre>>,
    #[serde(rename = "Role", skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub art: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub originally_available_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,

    // Show-level aggregates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaf_count: Option<u32>,

    // Season / Episode parent references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_rating_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_thumb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_index: Option<u32>,

    // Episode grandparent references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grandparent_rating_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grandparent_title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

impl MetadataItem {
    /// Construct an item carrying only the shared base fields.
    pub fn base(
        rating_key: String,
        guid: String,
        item_type: &str,
        title: String,
        summary: String,
        year: i32,
    ) -> Self {
        Self {
            key: format!("/library/metadata/{rating_key}"),
            rating_key,
            guid,
            item_type: item_type.to_string(),
            title,
            summary,
            year,
            studio: None,
            genres: None,
            roles: None,
            thumb: None,
            art: None,
            originally_available_at: None,
            added_at: None,
            updated_at: None,
            child_count: None,
            leaf_count: None,
            parent_rating_key: None,
            parent_title: None,
            parent_thumb: None,
            parent_index: None,
            grandparent_rating_key: None,
            grandparent_title: None,
            index: None,
        }
    }
}

/// Metadata response: `{ MediaContainer: { size, Metadata } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataResponse {
    #[serde(rename = "MediaContainer")]
    pub media_container: MetadataContainer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataContainer {
    pub size: usize,
    #[serde(rename = "Metadata")]
    pub metadata: Vec<MetadataItem>,
}

impl MetadataResponse {
    pub fn new(metadata: Vec<MetadataItem>) -> Self {
        Self {
            media_container: MetadataContainer {
                size: metadata.len(),
                metadata,
            },
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Children
// ---------------------------------------------------------------------------

/// Children response used to traverse Show → Season → Episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildrenResponse {
    #[serde(rename = "MediaContainer")]
    pub media_container: ChildrenContainer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildrenContainer {
    pub size: usize,
    pub key: String,
    #[serde(rename = "parentRatingKey", skip_serializing_if = "Option::is_none")]
    pub parent_rating_key: Option<String>,
    #[serde(rename = "parentTitle", skip_serializing_if = "Option::is_none")]
    pub parent_title: Option<String>,
    #[serde(rename = "Metadata")]
    pub metadata: Vec<MetadataItem>,
}

impl ChildrenResponse {
    /// An empty container for leaves and failure paths.
    pub fn empty(key: String) -> Self {
        Self {
            media_container: ChildrenContainer {
                size: 0,
                key,
                parent_rating_key: None,
                parent_title: None,
                metadata: Vec::new(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// A single image entry in the images response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageItem {
    #[serde(rename = "type")]
    pub image_type: String,
    pub url: String,
    pub provider: String,
    #[serde(rename = "ratingKey")]
    pub rating_key: String,
}

/// Images response: `{ MediaContainer: { size, Metadata } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesResponse {
    #[serde(rename = "MediaContainer")]
    pub media_container: ImagesContainer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesContainer {
    pub size: usize,
    #[serde(rename = "Metadata")]
    pub metadata: Vec<ImageItem>,
}

impl ImagesResponse {
    pub fn new(metadata: Vec<ImageItem>) -> Self {
        Self {
            media_container: ImagesContainer {
                size: metadata.len(),
                metadata,
            },
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}
