//! Core data models for favorites reconciliation.
//!
//! This module contains the catalog track record, the audio quality tiers,
//! and the grouping key shared by the deduplicator, the quality upgrader and
//! the local sync workflow.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// Duplicate groups keyed by (artist_key, title_key). Only groups with at
/// least two members are ever stored here.
pub type DuplicateGroups = BTreeMap<NormalizedKey, Group>;

// ============================================================================
// Identifiers
// ============================================================================

/// Catalog track identifier. Lower ids are older catalog entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TrackId {
    /// Recover an id from a raw payload field. The catalog normally sends a
    /// number but some responses carry it as a string.
    pub fn from_value(value: &Value) -> Option<TrackId> {
        match value {
            Value::Number(n) => n.as_u64().map(TrackId),
            Value::String(s) => s.trim().parse().ok().map(TrackId),
            _ => None,
        }
    }
}

// ============================================================================
// Quality Tiers
// ============================================================================

/// Audio fidelity tier attached to a catalog record.
///
/// Variants are declared lowest to highest so the derived `Ord` is the
/// fidelity order: `Unknown < Low < High < Lossless < HiRes < HiResLossless`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityTier {
    Unknown,
    Low,
    High,
    Lossless,
    HiRes,
    HiResLossless,
}

impl QualityTier {
    /// Every known tier, highest first.
    pub const ALL: [QualityTier; 6] = [
        QualityTier::HiResLossless,
        QualityTier::HiRes,
        QualityTier::Lossless,
        QualityTier::High,
        QualityTier::Low,
        QualityTier::Unknown,
    ];

    /// Numeric rank for ordering: higher is better, unknown is 0.
    pub fn rank(self) -> u8 {
        match self {
            QualityTier::HiResLossless => 5, // up to 24-bit/192kHz FLAC
            QualityTier::HiRes => 4,         // MQA
            QualityTier::Lossless => 3,      // FLAC 16-bit/44.1kHz
            QualityTier::High => 2,          // 320 kbps AAC
            QualityTier::Low => 1,           // 96 kbps AAC
            QualityTier::Unknown => 0,
        }
    }

    /// Parse a catalog quality label. Matching is case-insensitive and
    /// anything unrecognized becomes `Unknown`.
    pub fn from_label(label: &str) -> QualityTier {
        match label.trim().to_ascii_uppercase().as_str() {
            "HI_RES_LOSSLESS" => QualityTier::HiResLossless,
            "HI_RES" => QualityTier::HiRes,
            "LOSSLESS" => QualityTier::Lossless,
            "HIGH" => QualityTier::High,
            "LOW" => QualityTier::Low,
            _ => QualityTier::Unknown,
        }
    }

    /// Human-readable label for summaries and audit logs.
    pub fn label(self) -> &'static str {
        match self {
            QualityTier::HiResLossless => "Hi-Res Lossless",
            QualityTier::HiRes => "Hi-Res (MQA)",
            QualityTier::Lossless => "Lossless (FLAC)",
            QualityTier::High => "High (320kbps)",
            QualityTier::Low => "Low (96kbps)",
            QualityTier::Unknown => "Unknown",
        }
    }
}

impl From<Option<&str>> for QualityTier {
    fn from(s: Option<&str>) -> Self {
        s.map(QualityTier::from_label).unwrap_or(QualityTier::Unknown)
    }
}

// ============================================================================
// Track
// ============================================================================

/// A favorites entry or search result from the catalog.
///
/// Built either from a full payload parse or, when that fails, from the raw
/// fields with best-effort defaults. Both paths produce this same type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub version: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub audio_quality: QualityTier,
    /// Quality label exactly as the catalog sent it, kept for display when
    /// the tier is unknown.
    pub quality_raw: Option<String>,
}

/// Full catalog track payload.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackPayload {
    id: TrackId,
    title: String,
    version: Option<String>,
    artist: Option<ArtistRef>,
    album: Option<AlbumRef>,
    #[serde(alias = "audio_quality")]
    audio_quality: Option<String>,
}

#[derive(Deserialize)]
struct ArtistRef {
    name: Option<String>,
}

#[derive(Deserialize)]
struct AlbumRef {
    title: Option<String>,
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Track {
    /// Build a track from a catalog payload.
    ///
    /// Returns `None` only when no identifier can be recovered; any other
    /// malformed payload falls back to [`Track::from_raw`].
    pub fn from_payload(payload: &Value) -> Option<Track> {
        match TrackPayload::deserialize(payload) {
            Ok(p) => Some(Track {
                id: p.id,
                title: p.title,
                version: non_empty(p.version.as_deref()),
                artist: non_empty(p.artist.as_ref().and_then(|a| a.name.as_deref())),
                album: non_empty(p.album.as_ref().and_then(|a| a.title.as_deref())),
                audio_quality: QualityTier::from(p.audio_quality.as_deref()),
                quality_raw: non_empty(p.audio_quality.as_deref()),
            }),
            Err(err) => {
                debug!("Full track parse failed ({}), rebuilding from raw fields", err);
                Track::from_raw(payload)
            }
        }
    }

    /// Minimal reconstruction straight from raw JSON fields.
    pub fn from_raw(payload: &Value) -> Option<Track> {
        let id = payload.get("id").and_then(TrackId::from_value)?;

        let str_field = |key: &str| payload.get(key).and_then(Value::as_str);
        let title = non_empty(str_field("title"))
            .or_else(|| non_empty(str_field("name")))
            .unwrap_or_default();
        let artist = payload
            .get("artist")
            .and_then(|a| a.get("name"))
            .and_then(Value::as_str);
        let album = payload.get("album").and_then(|a| {
            a.get("title")
                .and_then(Value::as_str)
                .or_else(|| a.get("name").and_then(Value::as_str))
        });
        let quality = str_field("audioQuality").or_else(|| str_field("audio_quality"));

        Some(Track {
            id,
            title,
            version: non_empty(str_field("version")),
            artist: non_empty(artist),
            album: non_empty(album),
            audio_quality: QualityTier::from(quality),
            quality_raw: non_empty(quality),
        })
    }

    /// "Artist - Title", or just the title when the artist is missing.
    pub fn label(&self) -> String {
        let title = if self.title.is_empty() { "?" } else { &self.title };
        match &self.artist {
            Some(artist) => format!("{} - {}", artist, title),
            None => title.to_string(),
        }
    }

    /// Quality label for display; unknown tiers echo the raw catalog text.
    pub fn quality_label(&self) -> String {
        match (self.audio_quality, &self.quality_raw) {
            (QualityTier::Unknown, Some(raw)) => raw.to_ascii_uppercase(),
            (tier, _) => tier.label().to_string(),
        }
    }

    /// Title, version and album joined for variant detection.
    pub fn ranking_text(&self) -> String {
        let mut text = self.title.clone();
        for part in [&self.version, &self.album].into_iter().flatten() {
            text.push(' ');
            text.push_str(part);
        }
        text
    }
}

// ============================================================================
// Grouping
// ============================================================================

/// Canonical (artist, title) pair used to detect equivalent recordings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedKey {
    pub artist: String,
    pub title: String,
}

/// Tracks sharing a [`NormalizedKey`], ordered by preference.
/// `tracks[0]` is the keeper; the rest are redundant copies.
#[derive(Clone, Debug)]
pub struct Group {
    pub key: NormalizedKey,
    pub tracks: Vec<Track>,
}

impl Group {
    pub fn keeper(&self) -> &Track {
        &self.tracks[0]
    }

    pub fn redundant(&self) -> &[Track] {
        &self.tracks[1..]
    }
}

// ============================================================================
// TESTS
// ============================================================================
