//! Scene → Plex item mapping.
//!
//! A Stash scene has no inherent hierarchy, so the mapper projects the same
//! scene into whichever shape Plex asked for: a Movie, or a synthetic
//! Show → Season 1 → Episode 1 chain. Field-sync switches on the owning stash
//! control which optional attributes are emitted; a disabled field is omitted
//! from the JSON entirely (summary being the exception: always present, empty
//! when disabled).

use chrono::{DateTime, Datelike, Utc};

use crate::config::FieldSync;
use crate::ids::{build_guid, build_rating_key, ItemKind};
use crate::plex::{Genre, MatchResult, MetadataItem, Role};
use crate::stash::Scene;

use super::score;

// ---------------------------------------------------------------------------
// Small helpers
// ---------------------------------------------------------------------------

/// Percent-encode a query-string value (RFC 3986 unreserved set passes through).
fn urlencoded(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Rewrite a Stash image URL through the image proxy so Plex can fetch it
/// without Stash credentials.
pub fn proxy_image_url(stash_id: &str, raw_url: Option<&str>) -> Option<String> {
    let raw = raw_url?;
    if raw.is_empty() {
        return None;
    }
    Some(format!(
        "/providers/{stash_id}/imageProxy?url={}",
        urlencoded(raw)
    ))
}

/// Extract the year from a `YYYY-MM-DD` scene date; 0 when absent or garbled.
pub fn year_from_date(date: Option<&str>) -> i32 {
    date.and_then(|d| d.get(..4))
        .and_then(|y| y.parse::<i32>().ok())
        .unwrap_or(0)
}

/// Year reported to Plex: the derived year, or the current calendar year when
/// the scene carries no usable date (Plex renders year 0 as garbage).
fn display_year(scene_year: i32) -> i32 {
    if scene_year == 0 {
        Utc::now().year()
    } else {
        scene_year
    }
}

/// Parse an RFC 3339 timestamp into Unix seconds.
fn epoch_secs(timestamp: Option<&str>) -> Option<i64> {
    let ts = timestamp?;
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.timestamp())
}

fn genres(scene: &Scene) -> Option<Vec<Genre>> {
    if scene.tags.is_empty() {
        return None;
    }
    Some(
        scene
            .tags
            .iter()
            .map(|t| Genre { tag: t.name.clone() })
            .collect(),
    )
}

fn roles(stash_id: &str, scene: &Scene, fs: &FieldSync) -> Option<Vec<Role>> {
    if scene.performers.is_empty() {
        return None;
    }
    Some(
        scene
            .performers
            .iter()
            .map(|p| Role {
                tag: p.name.clone(),
                role: None,
                thumb: if fs.poster {
                    proxy_image_url(stash_id, p.image_path.as_deref())
                } else {
                    None
                },
            })
            .collect(),
    )
}

fn summary(scene: &Scene, fs: &FieldSync) -> String {
    if fs.summary {
        scene.details.clone().unwrap_or_default()
    } else {
        String::new()
    }
}

fn thumb(stash_id: &str, scene: &Scene, fs: &FieldSync) -> Option<String> {
    if fs.poster {
        proxy_image_url(stash_id, scene.paths.screenshot.as_deref())
    } else {
        None
    }
}

fn art(stash_id: &str, scene: &Scene, fs: &FieldSync) -> Option<String> {
    if fs.background {
        proxy_image_url(stash_id, scene.paths.preview.as_deref())
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Match candidates
// ---------------------------------------------------------------------------

/// Build a match candidate for a scene, scored against the query.
pub fn to_match_result(
    identifier: &str,
    scene: &Scene,
    query_title: &str,
    kind: ItemKind,
    query_year: Option<i32>,
) -> MatchResult {
    let scene_year = year_from_date(scene.date.as_deref());
    let raw = score::title_score(query_title, &scene.title);
    let scored = score::apply_year_bonus(raw, query_year, scene_year);

    MatchResult {
        guid: build_guid(identifier, kind, &scene.id),
        name: scene.title.clone(),
        year: display_year(scene_year),
        score: scored,
        result_type: match kind {
            ItemKind::Show => "show".to_string(),
            _ => "movie".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Metadata items
// ---------------------------------------------------------------------------

/// Scene as a Plex Movie (type 1).
pub fn movie_item(identifier: &str, stash_id: &str, scene: &Scene, fs: &FieldSync) -> MetadataItem {
    let rk = build_rating_key(ItemKind::Movie, &scene.id);
    let guid = build_guid(identifier, ItemKind::Movie, &scene.id);
    let scene_year = year_from_date(scene.date.as_deref());

    let mut item = MetadataItem::base(
        rk,
        guid,
        "movie",
        scene.title.clone(),
        summary(scene, fs),
        display_year(scene_year),
    );
    item.originally_available_at = if fs.date { scene.date.clone() } else { None };
    item.added_at = epoch_secs(scene.created_at.as_deref());
    item.updated_at = epoch_secs(scene.updated_at.as_deref());
    item.thumb = thumb(stash_id, scene, fs);
    item.art = art(stash_id, scene, fs);
    if fs.studio {
        item.studio = scene.studio.as_ref().map(|s| s.name.clone());
    }
    if fs.tags {
        item.genres = genres(scene);
    }
    if fs.performers {
        item.roles = roles(stash_id, scene, fs);
    }
    item
}

/// Scene wrapped as a Plex Show (type 2) with one virtual season and episode.
pub fn show_item(identifier: &str, stash_id: &str, scene: &Scene, fs: &FieldSync) -> MetadataItem {
    let rk = build_rating_key(ItemKind::Show, &scene.id);
    let guid = build_guid(identifier, ItemKind::Show, &scene.id);
    let scene_year = year_from_date(scene.date.as_deref());

    let mut item = MetadataItem::base(
        rk,
        guid,
        "show",
        scene.title.clone(),
        summary(scene, fs),
        display_year(scene_year),
    );
    item.originally_available_at = if fs.date { scene.date.clone() } else { None };
    item.added_at = epoch_secs(scene.created_at.as_deref());
    item.updated_at = epoch_secs(scene.updated_at.as_deref());
    item.thumb = thumb(stash_id, scene, fs);
    item.art = art(stash_id, scene, fs);
    item.child_count = Some(1);
    item.leaf_count = Some(1);
    if fs.studio {
        item.studio = scene.studio.as_ref().map(|s| s.name.clone());
    }
    if fs.tags {
        item.genres = genres(scene);
    }
    item
}

/// The single virtual Season 1 (type 3) under a scene's show wrapper.
pub fn season_item(identifier: &str, stash_id: &str, scene: &Scene, fs: &FieldSync) -> MetadataItem {
    let rk = build_rating_key(ItemKind::Season, &scene.id);
    let guid = build_guid(identifier, ItemKind::Season, &scene.id);
    let scene_year = year_from_date(scene.date.as_deref());

    let mut item = MetadataItem::base(
        rk,
        guid,
        "season",
        "Season 1".to_string(),
        summary(scene, fs),
        display_year(scene_year),
    );
    item.index = Some(1);
    item.leaf_count = Some(1);
    item.parent_rating_key = Some(build_rating_key(ItemKind::Show, &scene.id));
    item.parent_title = Some(scene.title.clone());
    item.parent_thumb = thumb(stash_id, scene, fs);
    item.thumb = thumb(stash_id, scene, fs);
    item.art = art(stash_id, scene, fs);
    item
}

/// Scene as Episode 1 (type 4) of its virtual Season 1.
pub fn episode_item(
    identifier: &str,
    stash_id: &str,
    scene: &Scene,
    fs: &FieldSync,
) -> MetadataItem {
    let rk = build_rating_key(ItemKind::Episode, &scene.id);
    let guid = build_guid(identifier, ItemKind::Episode, &scene.id);
    let scene_year = year_from_date(scene.date.as_deref());

    let mut item = MetadataItem::base(
        rk,
        guid,
        "episode",
        scene.title.clone(),
        summary(scene, fs),
        display_year(scene_year),
    );
    item.originally_available_at = if fs.date { scene.date.clone() } else { None };
    item.added_at = epoch_secs(scene.created_at.as_deref());
    item.updated_at = epoch_secs(scene.updated_at.as_deref());
    item.index = Some(1);
    item.parent_index = Some(1);
    item.parent_rating_key = Some(build_rating_key(ItemKind::Season, &scene.id));
    item.parent_title = Some("Season 1".to_string());
    item.grandparent_rating_key = Some(build_rating_key(ItemKind::Show, &scene.id));
    item.grandparent_title = Some(scene.title.clone());
    item.thumb = thumb(stash_id, scene, fs);
    item.art = art(stash_id, scene, fs);
    if fs.tags {
        item.genres = genres(scene);
    }
    if fs.performers {
        item.roles = roles(stash_id, scene, fs);
    }
    item
}

/// Build the item for whichever hierarchy level a rating key addressed.
pub fn item_for_kind(
    kind: ItemKind,
    identifier: &str,
    stash_id: &str,
    scene: &Scene,
    fs: &FieldSync,
) -> MetadataItem {
    match kind {
        ItemKind::Movie => movie_item(identifier, stash_id, scene, fs),
        ItemKind::Show => show_item(identifier, stash_id, scene, fs),
        ItemKind::Season => season_item(identifier, stash_id, scene, fs),
        ItemKind::Episode => episode_item(identifier, stash_id, scene, fs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stash::types::{Performer, ScenePaths, Studio, Tag};

    fn scene() -> Scene {
        Scene {
            id: "42".into(),
            title: "Deep Blue".into(),
            details: Some("A diving documentary.".into()),
            date: Some("2021-06-15".into()),
            rating100: Some(85),
            organized: Some(true),
            studio: Some(Studio {
                id: "7".into(),
                name: "Ocean Films".into(),
                image_path: None,
            }),
            tags: vec![Tag {
                id: "1".into(),
                name: "Documentary".into(),
            }],
            performers: vec![Performer {
                id: "3".into(),
                name: "Alex Doe".into(),
                image_path: Some("http://stash.local/performer/3/image".into()),
            }],
            paths: ScenePaths {
                screenshot: Some("http://stash.local/scene/42/screenshot".into()),
                preview: Some("http://stash.local/scene/42/preview".into()),
                stream: None,
            },
            created_at: Some("2023-01-02T03:04:05Z".into()),
            updated_at: Some("2023-02-02T03:04:05Z".into()),
        }
    }

    const IDENT: &str = "tv.plex.agents.custom.stashbridge.home";

    #[test]
    fn proxy_url_is_percent_encoded() {
        let url = proxy_image_url("home", Some("http://stash.local/a b?x=1&y=2")).unwrap();
        assert_eq!(
            url,
            "/providers/home/imageProxy?url=http%3A%2F%2Fstash.local%2Fa%20b%3Fx%3D1%26y%3D2"
        );
        assert!(proxy_image_url("home", None).is_none());
        assert!(proxy_image_url("home", Some("")).is_none());
    }

    #[test]
    fn year_parsing_degrades_to_zero() {
        assert_eq!(year_from_date(Some("2021-06-15")), 2021);
        assert_eq!(year_from_date(Some("1999")), 1999);
        assert_eq!(year_from_date(Some("soon")), 0);
        assert_eq!(year_from_date(Some("")), 0);
        assert_eq!(year_from_date(None), 0);
    }

    #[test]
    fn epoch_parsing() {
        assert_eq!(epoch_secs(Some("1970-01-01T00:00:10Z")), Some(10));
        assert!(epoch_secs(Some("not a date")).is_none());
        assert!(epoch_secs(None).is_none());
    }

    #[test]
    fn undated_scene_reports_current_year() {
        let mut s = scene();
        s.date = None;
        let item = movie_item(IDENT, "home", &s, &FieldSync::default());
        assert_eq!(item.year, Utc::now().year());
        assert!(item.originally_available_at.is_none());
    }

    #[test]
    fn movie_item_carries_full_metadata() {
        let item = movie_item(IDENT, "home", &scene(), &FieldSync::default());
        assert_eq!(item.rating_key, "movie.42");
        assert_eq!(item.key, "/library/metadata/movie.42");
        assert_eq!(item.guid, format!("{IDENT}://movie.42"));
        assert_eq!(item.item_type, "movie");
        assert_eq!(item.year, 2021);
        assert_eq!(item.summary, "A diving documentary.");
        assert_eq!(item.studio.as_deref(), Some("Ocean Films"));
        assert_eq!(item.genres.as_ref().unwrap()[0].tag, "Documentary");
        let role = &item.roles.as_ref().unwrap()[0];
        assert_eq!(role.tag, "Alex Doe");
        assert!(role.thumb.as_deref().unwrap().starts_with("/providers/home/imageProxy?url="));
        assert!(item.thumb.is_some());
        assert!(item.art.is_some());
        assert_eq!(item.originally_available_at.as_deref(), Some("2021-06-15"));
        assert!(item.added_at.is_some());
    }

    #[test]
    fn disabled_fields_are_omitted() {
        let fs = FieldSync {
            summary: false,
            date: false,
            studio: false,
            tags: false,
            performers: false,
            poster: false,
            background: false,
            ..FieldSync::default()
        };
        let item = movie_item(IDENT, "home", &scene(), &fs);
        // Summary stays present but empty; everything else disappears.
        assert_eq!(item.summary, "");
        assert!(item.originally_available_at.is_none());
        assert!(item.studio.is_none());
        assert!(item.genres.is_none());
        assert!(item.roles.is_none());
        assert!(item.thumb.is_none());
        assert!(item.art.is_none());
    }

    #[test]
    fn poster_toggle_also_strips_role_thumbs() {
        let fs = FieldSync {
            poster: false,
            ..FieldSync::default()
        };
        let item = movie_item(IDENT, "home", &scene(), &fs);
        let role = &item.roles.as_ref().unwrap()[0];
        assert!(role.thumb.is_none());
    }

    #[test]
    fn show_item_declares_single_child() {
        let item = show_item(IDENT, "home", &scene(), &FieldSync::default());
        assert_eq!(item.rating_key, "show.42");
        assert_eq!(item.item_type, "show");
        assert_eq!(item.child_count, Some(1));
        assert_eq!(item.leaf_count, Some(1));
        // Shows carry genres but not cast.
        assert!(item.genres.is_some());
        assert!(item.roles.is_none());
    }

    #[test]
    fn season_item_links_to_show() {
        let item = season_item(IDENT, "home", &scene(), &FieldSync::default());
        assert_eq!(item.rating_key, "season.42");
        assert_eq!(item.title, "Season 1");
        assert_eq!(item.index, Some(1));
        assert_eq!(item.parent_rating_key.as_deref(), Some("show.42"));
        assert_eq!(item.parent_title.as_deref(), Some("Deep Blue"));
    }

    #[test]
    fn episode_item_links_to_season_and_show() {
        let item = episode_item(IDENT, "home", &scene(), &FieldSync::default());
        assert_eq!(item.rating_key, "episode.42");
        assert_eq!(item.index, Some(1));
        assert_eq!(item.parent_index, Some(1));
        assert_eq!(item.parent_rating_key.as_deref(), Some("season.42"));
        assert_eq!(item.parent_title.as_deref(), Some("Season 1"));
        assert_eq!(item.grandparent_rating_key.as_deref(), Some("show.42"));
        assert_eq!(item.grandparent_title.as_deref(), Some("Deep Blue"));
    }

    #[test]
    fn match_result_applies_year_bonus() {
        let result = to_match_result(IDENT, &scene(), "Deep Blue", ItemKind::Movie, Some(2021));
        assert_eq!(result.guid, format!("{IDENT}://movie.42"));
        assert_eq!(result.name, "Deep Blue");
        assert_eq!(result.year, 2021);
        assert_eq!(result.score, 100);
        assert_eq!(result.result_type, "movie");

        let show = to_match_result(IDENT, &scene(), "Deep Blue", ItemKind::Show, None);
        assert_eq!(show.result_type, "show");
        assert_eq!(show.guid, format!("{IDENT}://show.42"));
    }
}
