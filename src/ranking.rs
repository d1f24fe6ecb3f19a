//! Version ranking for competing copies of the same song.
//!
//! Every track gets a [`VersionPriority`]; a larger priority is strictly
//! preferred. Fields are compared in declaration order:
//! - Audio quality tier
//! - Remaster recency
//! - Explicit over clean
//! - Stereo over mono
//! - Album version over single version
//! - Lower catalog id (historically the original entry)

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::{Ordering, Reverse};

use crate::models::{Track, TrackId};

// ============================================================================
// Regex Patterns
// ============================================================================

pub static REMASTER_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:remaster(?:ed)?|digital\s+remaster)\b").unwrap());

pub static EMBEDDED_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

pub static EXPLICIT_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bexplicit\b").unwrap());
pub static CLEAN_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bclean\b").unwrap());
pub static STEREO_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bstereo\b").unwrap());
pub static MONO_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bmono\b").unwrap());
pub static ALBUM_VERSION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\balbum\s+version\b").unwrap());
pub static SINGLE_VERSION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsingle\s+version\b").unwrap());

// ============================================================================
// Marker Scores
// ============================================================================

/// Remaster recency: the first embedded year when the text is a remaster,
/// `0` for an undated remaster, `-1` when there is no remaster marker.
pub fn remaster_year(text: &str) -> i32 {
    if !REMASTER_MARKER.is_match(text) {
        return -1;
    }
    EMBEDDED_YEAR
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

fn marker_score(text: &str, plus: &Regex, minus: &Regex) -> i8 {
    if plus.is_match(text) {
        1
    } else if minus.is_match(text) {
        -1
    } else {
        0
    }
}

/// `+1` explicit, `-1` clean, `0` unmarked. Explicit wins when both appear.
pub fn explicit_score(text: &str) -> i8 {
    marker_score(text, &EXPLICIT_MARKER, &CLEAN_MARKER)
}

/// `+1` stereo, `-1` mono, `0` unmarked.
pub fn channel_score(text: &str) -> i8 {
    marker_score(text, &STEREO_MARKER, &MONO_MARKER)
}

/// `+1` album version, `-1` single version, `0` unmarked.
pub fn edition_score(text: &str) -> i8 {
    marker_score(text, &ALBUM_VERSION_MARKER, &SINGLE_VERSION_MARKER)
}

// ============================================================================
// Priority
// ============================================================================

/// Composite preference key. Derived `Ord` compares fields top to bottom;
/// the id is wrapped in `Reverse` so the smaller id compares as larger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionPriority {
    pub quality: u8,
    pub remaster: i32,
    pub explicit: i8,
    pub channel: i8,
    pub edition: i8,
    pub id: Reverse<TrackId>,
}

pub fn priority(track: &Track) -> VersionPriority {
    let text = track.ranking_text();
    VersionPriority {
        quality: track.audio_quality.rank(),
        remaster: remaster_year(&text),
        explicit: explicit_score(&text),
        channel: channel_score(&text),
        edition: edition_score(&text),
        id: Reverse(track.id),
    }
}

/// Ordering that puts the preferred track first.
pub fn compare_preference(a: &Track, b: &Track) -> Ordering {
    priority(b).cmp(&priority(a))
}

/// Sort so that `tracks[0]` is the keeper.
pub fn sort_by_preference(tracks: &mut [Track]) {
    tracks.sort_by_cached_key(|t| Reverse(priority(t)));
}

// ============================================================================
// TESTS
// ============================================================================
