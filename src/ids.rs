//! Identifier codec for Plex-visible keys.
//!
//! Plex addresses everything through three derived identifiers: the provider
//! identifier (also used as the GUID scheme), GUIDs of the form
//! `{identifier}://{kind}.{sceneId}`, and rating keys of the form
//! `{kind}.{sceneId}`. All functions here are pure and total — unparseable
//! input degrades rather than failing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespace prefix for every provider identifier reported to Plex.
pub const PROVIDER_ID_PREFIX: &str = "tv.plex.agents.custom.stashbridge";

/// Version string reported at the provider root.
pub const PROVIDER_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Item kinds
// ---------------------------------------------------------------------------

/// The four synthetic hierarchy levels a scene can be rendered as.
///
/// A kind is a view selector, not a stored property: any scene can be
/// projected as a Movie, or as the Show → Season → Episode chain wrapping it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Movie,
    Show,
    Season,
    Episode,
}

impl ItemKind {
    /// The lowercase wire name used in GUIDs, rating keys, and `type` fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Movie => "movie",
            ItemKind::Show => "show",
            ItemKind::Season => "season",
            ItemKind::Episode => "episode",
        }
    }

    /// Plex metadata type integer (1 = Movie, 2 = Show, 3 = Season, 4 = Episode).
    pub fn metadata_type(self) -> i64 {
        match self {
            ItemKind::Movie => 1,
            ItemKind::Show => 2,
            ItemKind::Season => 3,
            ItemKind::Episode => 4,
        }
    }

    /// Derive the search kind from the numeric `type` in a match request.
    ///
    /// Plex sends 2 for show-library searches; everything else (including an
    /// omitted type) is treated as a movie search.
    pub fn from_match_type(metadata_type: Option<i64>) -> Self {
        match metadata_type {
            Some(2) => ItemKind::Show,
            _ => ItemKind::Movie,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Identifier construction
// ---------------------------------------------------------------------------

/// Sanitize a stash id for use inside a Plex provider identifier.
///
/// Plex only accepts `[a-zA-Z0-9.]` in identifiers. Everything else becomes a
/// dot, runs of dots collapse to one, and leading/trailing dots are stripped.
pub fn sanitize_identifier(stash_id: &str) -> String {
    let mut out = String::with_capacity(stash_id.len());
    for c in stash_id.chars() {
        if c.is_ascii_alphanumeric() || c == '.' {
            out.push(c);
        } else {
            out.push('.');
        }
    }

    let mut collapsed = String::with_capacity(out.len());
    let mut last_dot = false;
    for c in out.chars() {
        if c == '.' {
            if !last_dot {
                collapsed.push('.');
            }
            last_dot = true;
        } else {
            collapsed.push(c);
            last_dot = false;
        }
    }

    collapsed.trim_matches('.').to_string()
}

/// Compute the full provider identifier for a stash id.
///
/// Used as the `identifier` field of the provider root and as the URI scheme
/// in every GUID the provider emits.
pub fn build_identifier(stash_id: &str) -> String {
    format!("{PROVIDER_ID_PREFIX}.{}", sanitize_identifier(stash_id))
}

/// Build a Plex-compatible GUID: `{identifier}://{kind}.{sceneId}`.
///
/// The scheme segment must equal the provider identifier exactly; Plex fails
/// to parse GUIDs whose scheme differs from the declared identifier.
pub fn build_guid(identifier: &str, kind: ItemKind, scene_id: &str) -> String {
    format!("{identifier}://{kind}.{scene_id}")
}

/// Build a rating key: `{kind}.{sceneId}`.
///
/// Rating keys are scoped by the stash id already present in the URL path, so
/// the stash id is deliberately not embedded.
pub fn build_rating_key(kind: ItemKind, scene_id: &str) -> String {
    format!("{kind}.{scene_id}")
}

/// Parse an incoming rating key into its kind and underlying scene id.
///
/// Recognizes the four `kind.` prefixes. Anything else is treated as a bare
/// movie id for backward compatibility with unprefixed keys.
pub fn parse_rating_key(raw: &str) -> (ItemKind, &str) {
    for kind in [
        ItemKind::Movie,
        ItemKind::Show,
        ItemKind::Season,
        ItemKind::Episode,
    ] {
        let prefix_len = kind.as_str().len() + 1;
        if raw.len() > prefix_len
            && raw.starts_with(kind.as_str())
            && raw.as_bytes()[prefix_len - 1] == b'.'
        {
            return (kind, &raw[prefix_len..]);
        }
    }
    (ItemKind::Movie, raw)
}
