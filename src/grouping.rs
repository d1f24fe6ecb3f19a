//! Duplicate detection: partition tracks by normalized (artist, title) and
//! order each partition so the keeper comes first.

use rustc_hash::FxHashMap;

use crate::models::{DuplicateGroups, Group, NormalizedKey, Track};
use crate::normalize::normalize;
use crate::ranking::sort_by_preference;

/// Stand-in artist for tracks that carry none.
pub const UNKNOWN_ARTIST: &str = "unknown";

pub fn normalized_key(track: &Track) -> NormalizedKey {
    NormalizedKey {
        artist: normalize(track.artist.as_deref().unwrap_or(UNKNOWN_ARTIST)),
        title: normalize(&track.title),
    }
}

/// Group tracks by [`normalized_key`] and keep only groups of two or more,
/// each sorted by preference.
///
/// Every track is keyed, including titles that normalize to nothing (a
/// title made only of noise words or a year, or a record with no title):
/// those share the empty title key per artist.
pub fn find_duplicates(tracks: Vec<Track>) -> DuplicateGroups {
    let mut buckets: FxHashMap<NormalizedKey, Vec<Track>> = FxHashMap::default();

    for track in tracks {
        buckets.entry(normalized_key(&track)).or_default().push(track);
    }

    buckets
        .into_iter()
        .filter(|(_, tracks)| tracks.len() > 1)
        .map(|(key, mut tracks)| {
            sort_by_preference(&mut tracks);
            (key.clone(), Group { key, tracks })
        })
        .collect()
}

/// Number of redundant copies across all groups.
pub fn redundant_count(groups: &DuplicateGroups) -> usize {
    groups.values().map(|g| g.tracks.len() - 1).sum()
}

// ============================================================================
// TESTS
// ============================================================================
