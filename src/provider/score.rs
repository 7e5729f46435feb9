//! Title scoring and score rescaling for match candidates.
//!
//! Raw scores rank candidates; they are then rescaled before leaving the
//! provider because Plex silently discards match results scoring below 80.
//! Stash frequently finds scenes via hash or filename search where the
//! returned title (often non-Latin) bears no textual similarity to the query,
//! so a raw token-overlap score near 0 would hide a correct match. Rescaling
//! keeps the relative ranking while guaranteeing Plex accepts the list.

use std::collections::HashSet;

use crate::plex::MatchResult;

/// Token-overlap title similarity, 0–100.
///
/// Exact match (case/whitespace-insensitive) scores 100, containment in
/// either direction 80, otherwise the shared-token ratio scaled to at most 70.
pub fn title_score(query: &str, candidate: &str) -> u8 {
    let q = query.trim().to_lowercase();
    let t = candidate.trim().to_lowercase();
    if q == t {
        return 100;
    }
    if t.contains(q.as_str()) || q.contains(t.as_str()) {
        return 80;
    }

    let q_tokens: HashSet<&str> = q.split_whitespace().collect();
    let t_tokens: HashSet<&str> = t.split_whitespace().collect();
    let overlap = q_tokens.intersection(&t_tokens).count();
    let max_len = q_tokens.len().max(t_tokens.len()).max(1);
    ((overlap as f64 / max_len as f64) * 70.0).round() as u8
}

/// Bonus applied when the requested year matches the candidate's year.
pub fn apply_year_bonus(score: u8, query_year: Option<i32>, scene_year: i32) -> u8 {
    match query_year {
        Some(year) if year == scene_year => (score + 15).min(100),
        _ => score,
    }
}

/// Overwrite sorted scores so Plex accepts every candidate.
///
/// The list must already be sorted best-first; position `i` receives
/// `max(100 - i, 80)`: the top candidate is forced to exactly 100, each
/// subsequent one decreases by 1, floored at 80.
pub fn rescale(results: &mut [MatchResult]) {
    for (i, result) in results.iter_mut().enumerate() {
        result.score = (100 - i as i64).max(80) as u8;
    }
}
