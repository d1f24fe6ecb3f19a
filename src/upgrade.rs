//! Quality upgrades: find a strictly better catalog copy of a favorite and
//! swap it in.
//!
//! The swap is add-then-remove. If the add fails nothing changed. If the
//! remove fails after a successful add, both copies stay in the favorites and
//! the next deduplication run keeps the better one.

use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;

use crate::catalog::{CatalogSearch, FavoritesMutator};
use crate::config::ReconcileConfig;
use crate::error::{CatalogError, Result};
use crate::grouping::normalized_key;
use crate::models::{QualityTier, Track, TrackId};
use crate::progress::{create_progress_bar, log_progress};

/// Free-text query for a track: artist and title.
pub fn search_query(track: &Track) -> String {
    match &track.artist {
        Some(artist) => format!("{} {}", artist, track.title),
        None => track.title.clone(),
    }
}

/// Search the catalog for a copy of `track` in a strictly higher tier.
///
/// Tracks at or above `config.upgrade_ceiling` are not searched at all.
/// Candidates must share the track's normalized artist and title exactly.
/// Among candidates the highest tier wins; on equal tiers the first one the
/// search returned is kept.
pub fn find_upgrade<C: CatalogSearch + ?Sized>(
    catalog: &C,
    track: &Track,
    config: &ReconcileConfig,
) -> Result<Option<Track>> {
    if track.audio_quality >= config.upgrade_ceiling {
        return Ok(None);
    }

    let key = normalized_key(track);
    let results = catalog.search_tracks(&search_query(track), config.search_limit);
    config.pause_after_read();
    let results = results?;

    let mut best: Option<Track> = None;
    for candidate in results.iter().filter_map(Track::from_payload) {
        if candidate.id == track.id || normalized_key(&candidate) != key {
            continue;
        }
        let floor = best
            .as_ref()
            .map_or(track.audio_quality, |b| b.audio_quality);
        if candidate.audio_quality > floor {
            best = Some(candidate);
        }
    }
    Ok(best)
}

/// What happened when a swap was attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// Better copy added and original removed.
    Upgraded,
    /// Nothing changed.
    AddFailed(CatalogError),
    /// Better copy added but the original is still a favorite.
    RemoveFailed(CatalogError),
}

pub fn apply_upgrade<M: FavoritesMutator + ?Sized>(
    mutator: &M,
    original: &Track,
    better: &Track,
    config: &ReconcileConfig,
) -> UpgradeOutcome {
    let added = mutator.add_favorite(better.id);
    config.pause_after_modify();
    if let Err(err) = added {
        return UpgradeOutcome::AddFailed(err);
    }

    let removed = mutator.remove_favorite(original.id);
    config.pause_after_modify();
    match removed {
        Ok(()) => UpgradeOutcome::Upgraded,
        Err(err) => UpgradeOutcome::RemoveFailed(err),
    }
}

// ============================================================================
// Batch pass
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct UpgradeRecord {
    pub label: String,
    pub before_id: TrackId,
    pub before_quality: String,
    pub after_id: TrackId,
    pub after_quality: String,
    pub after_title: String,
}

impl fmt::Display for UpgradeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "UPGRADED: {}", self.label)?;
        writeln!(f, "  Before: [{}]  ID={}", self.before_quality, self.before_id)?;
        write!(
            f,
            "  After : [{}]  ID={}  ({})",
            self.after_quality, self.after_id, self.after_title
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeStage {
    Search,
    Add,
    Remove,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpgradeFailure {
    pub stage: UpgradeStage,
    pub label: String,
    pub error: CatalogError,
}

impl fmt::Display for UpgradeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.stage {
            UpgradeStage::Search => "SEARCH FAIL",
            UpgradeStage::Add => "ADD FAIL",
            UpgradeStage::Remove => "REMOVE FAIL",
        };
        write!(f, "{} | {}: {}", stage, self.label, self.error)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpgradeReport {
    pub processed: usize,
    pub at_ceiling: usize,
    /// Searched successfully but no strictly better copy exists.
    pub no_upgrade: usize,
    pub upgraded: Vec<UpgradeRecord>,
    /// Better copy added but the original could not be removed.
    pub partial: usize,
    pub errors: Vec<UpgradeFailure>,
}

/// Try to upgrade every track in order.
pub fn upgrade_all<C>(catalog: &C, tracks: &[Track], config: &ReconcileConfig) -> UpgradeReport
where
    C: CatalogSearch + FavoritesMutator + ?Sized,
{
    let mut report = UpgradeReport::default();
    let total = tracks.len() as u64;
    let pb = create_progress_bar(total, "Checking quality", config.quiet);

    for track in tracks {
        report.processed += 1;
        pb.inc(1);
        log_progress("upgrade", pb.position(), total, 100, config.quiet);

        if track.audio_quality >= config.upgrade_ceiling {
            report.at_ceiling += 1;
            continue;
        }

        let better = match find_upgrade(catalog, track, config) {
            Ok(Some(better)) => better,
            Ok(None) => {
                debug!("No better copy of {}", track.label());
                report.no_upgrade += 1;
                continue;
            }
            Err(err) => {
                warn!("Search failed for {}: {}", track.label(), err);
                report.errors.push(UpgradeFailure {
                    stage: UpgradeStage::Search,
                    label: track.label(),
                    error: err,
                });
                continue;
            }
        };

        let record = UpgradeRecord {
            label: track.label(),
            before_id: track.id,
            before_quality: track.quality_label(),
            after_id: better.id,
            after_quality: better.quality_label(),
            after_title: better.title.clone(),
        };
        match apply_upgrade(catalog, track, &better, config) {
            UpgradeOutcome::Upgraded => {
                info!(
                    "Upgraded {}: {} -> {}",
                    record.label, record.before_quality, record.after_quality
                );
                report.upgraded.push(record);
            }
            UpgradeOutcome::AddFailed(err) => {
                warn!("Could not add better copy of {}: {}", track.label(), err);
                report.errors.push(UpgradeFailure {
                    stage: UpgradeStage::Add,
                    label: format!("{} -> [{}]", record.label, record.after_quality),
                    error: err,
                });
            }
            UpgradeOutcome::RemoveFailed(err) => {
                warn!(
                    "Added better copy of {} but could not remove the original: {}",
                    track.label(),
                    err
                );
                report.partial += 1;
                report.errors.push(UpgradeFailure {
                    stage: UpgradeStage::Remove,
                    label: record.label,
                    error: err,
                });
            }
        }
    }
    pb.finish_and_clear();
    report
}

/// Track counts per tier, highest tier first; tiers with no tracks are left out.
pub fn quality_distribution(tracks: &[Track]) -> Vec<(QualityTier, usize)> {
    QualityTier::ALL
        .iter()
        .map(|&tier| {
            (
                tier,
                tracks.iter().filter(|t| t.audio_quality == tier).count(),
            )
        })
        .filter(|(_, count)| *count > 0)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{track_json, MemoryCatalog};

    fn track(id: u64, artist: &str, title: &str, quality: &str) -> Track {
        Track::from_payload(&track_json(id, artist, title, quality)).unwrap()
    }

    #[test]
    fn test_top_tier_never_searches() {
        let catalog = MemoryCatalog::default();
        let original = track(1, "A", "Song", "HI_RES_LOSSLESS");
        let found = find_upgrade(&catalog, &original, &ReconcileConfig::immediate()).unwrap();
        assert!(found.is_none());
        assert_eq!(catalog.search_calls.get(), 0);
    }

    #[test]
    fn test_lower_ceiling_skips_hi_res() {
        let catalog = MemoryCatalog::default();
        let mut config = ReconcileConfig::immediate();
        config.upgrade_ceiling = QualityTier::HiRes;
        let original = track(1, "A", "Song", "HI_RES");
        assert!(find_upgrade(&catalog, &original, &config).unwrap().is_none());
        assert_eq!(catalog.search_calls.get(), 0);
    }

    #[test]
    fn test_equal_tier_never_wins() {
        let catalog = MemoryCatalog::default()
            .with_search("A Song", vec![track_json(2, "A", "Song", "LOSSLESS")]);
        let original = track(1, "A", "Song", "LOSSLESS");
        let found = find_upgrade(&catalog, &original, &ReconcileConfig::immediate()).unwrap();
        assert!(found.is_none());
        assert_eq!(catalog.search_calls.get(), 1);
    }

    #[test]
    fn test_highest_tier_first_seen_wins() {
        let catalog = MemoryCatalog::default().with_search(
            "A Song",
            vec![
                track_json(2, "A", "Song", "LOSSLESS"),
                track_json(3, "A", "Song (2011 Remaster)", "HI_RES"),
                track_json(4, "A", "Song", "HI_RES"),
                track_json(5, "B", "Song", "HI_RES_LOSSLESS"),
                track_json(6, "A", "Other Song", "HI_RES_LOSSLESS"),
            ],
        );
        let original = track(1, "A", "Song", "HIGH");
        let found = find_upgrade(&catalog, &original, &ReconcileConfig::immediate()).unwrap();
        assert_eq!(found.map(|t| t.id), Some(TrackId(3)));
    }

    #[test]
    fn test_search_error_is_returned() {
        let catalog = MemoryCatalog::default().failing_search("A Song");
        let original = track(1, "A", "Song", "HIGH");
        assert!(find_upgrade(&catalog, &original, &ReconcileConfig::immediate()).is_err());
    }

    #[test]
    fn test_failed_search_counted_once() {
        let catalog = MemoryCatalog::default().failing_search("A Song");
        let tracks = vec![track(1, "A", "Song", "HIGH")];
        let report = upgrade_all(&catalog, &tracks, &ReconcileConfig::immediate());
        assert_eq!(report.no_upgrade, 0);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].stage, UpgradeStage::Search);
        assert!(catalog.added.borrow().is_empty());
    }

    #[test]
    fn test_apply_upgrade_swaps() {
        let catalog = MemoryCatalog::with_favorites(vec![track_json(1, "A", "Song", "HIGH")])
            .with_search("A Song", vec![track_json(2, "A", "Song", "LOSSLESS")]);
        let original = track(1, "A", "Song", "HIGH");
        let better = track(2, "A", "Song", "LOSSLESS");
        let outcome = apply_upgrade(&catalog, &original, &better, &ReconcileConfig::immediate());
        assert_eq!(outcome, UpgradeOutcome::Upgraded);
        assert_eq!(catalog.favorite_ids(), vec![2]);
    }

    #[test]
    fn test_add_failure_changes_nothing() {
        let catalog = MemoryCatalog::with_favorites(vec![track_json(1, "A", "Song", "HIGH")])
            .failing_add(2);
        let original = track(1, "A", "Song", "HIGH");
        let better = track(2, "A", "Song", "LOSSLESS");
        let outcome = apply_upgrade(&catalog, &original, &better, &ReconcileConfig::immediate());
        assert!(matches!(outcome, UpgradeOutcome::AddFailed(_)));
        assert_eq!(catalog.favorite_ids(), vec![1]);
        assert!(catalog.removed.borrow().is_empty());
    }

    #[test]
    fn test_remove_failure_keeps_both_copies() {
        let catalog = MemoryCatalog::with_favorites(vec![track_json(1, "A", "Song", "HIGH")])
            .with_search("A Song", vec![track_json(2, "A", "Song", "LOSSLESS")])
            .failing_remove(1);
        let tracks = vec![track(1, "A", "Song", "HIGH")];
        let report = upgrade_all(&catalog, &tracks, &ReconcileConfig::immediate());
        assert!(report.upgraded.is_empty());
        assert_eq!(report.partial, 1);
        assert_eq!(report.errors[0].stage, UpgradeStage::Remove);
        assert_eq!(catalog.favorite_ids(), vec![1, 2]);
    }

    #[test]
    fn test_upgrade_all_report() {
        let catalog = MemoryCatalog::with_favorites(vec![
            track_json(1, "A", "Song", "HIGH"),
            track_json(10, "B", "Best", "HI_RES_LOSSLESS"),
            track_json(20, "C", "Lonely", "LOW"),
            track_json(30, "D", "Broken", "LOW"),
        ])
        .with_search("A Song", vec![track_json(2, "A", "Song", "LOSSLESS")])
        .failing_search("D Broken");
        let tracks: Vec<Track> = [
            track(1, "A", "Song", "HIGH"),
            track(10, "B", "Best", "HI_RES_LOSSLESS"),
            track(20, "C", "Lonely", "LOW"),
            track(30, "D", "Broken", "LOW"),
        ]
        .to_vec();
        let report = upgrade_all(&catalog, &tracks, &ReconcileConfig::immediate());
        assert_eq!(report.processed, 4);
        assert_eq!(report.at_ceiling, 1);
        assert_eq!(report.upgraded.len(), 1);
        // The failed search lands in errors only
        assert_eq!(report.no_upgrade, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].stage, UpgradeStage::Search);
        assert_eq!(catalog.search_calls.get(), 3);
        assert_eq!(
            report.upgraded[0].to_string(),
            "UPGRADED: A - Song\n  Before: [High (320kbps)]  ID=1\n  After : [Lossless (FLAC)]  ID=2  (Song)"
        );
    }

    #[test]
    fn test_quality_distribution_highest_first() {
        let tracks = vec![
            track(1, "A", "x", "LOW"),
            track(2, "A", "y", "LOSSLESS"),
            track(3, "A", "z", "LOW"),
            track(4, "A", "w", "mystery"),
        ];
        assert_eq!(
            quality_distribution(&tracks),
            vec![
                (QualityTier::Lossless, 1),
                (QualityTier::Low, 2),
                (QualityTier::Unknown, 1),
            ]
        );
    }
}
