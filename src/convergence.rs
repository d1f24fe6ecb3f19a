//! Fixpoint duplicate removal.
//!
//! The favorites listing is eventually consistent: removing copies can make
//! previously hidden entries visible on the next read. A single pass is not
//! enough, so rounds of collect, group and remove repeat until a round
//! removes nothing.

use log::{info, warn};
use serde::Serialize;
use std::fmt;

use crate::catalog::{FavoritesMutator, FavoritesSource};
use crate::collector::collect_all;
use crate::config::ReconcileConfig;
use crate::error::CatalogError;
use crate::grouping::{find_duplicates, redundant_count};
use crate::models::{Track, TrackId};
use crate::progress::{create_progress_bar, log_progress};

/// A redundant copy that was removed, and the keeper that stayed.
#[derive(Debug, Clone, Serialize)]
pub struct RemovalRecord {
    pub round: usize,
    pub removed_id: TrackId,
    pub removed: String,
    pub removed_quality: String,
    pub kept_id: TrackId,
    pub kept: String,
    pub kept_quality: String,
}

impl RemovalRecord {
    fn new(round: usize, removed: &Track, kept: &Track) -> Self {
        Self {
            round,
            removed_id: removed.id,
            removed: removed.label(),
            removed_quality: removed.quality_label(),
            kept_id: kept.id,
            kept: kept.label(),
            kept_quality: kept.quality_label(),
        }
    }
}

impl fmt::Display for RemovalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Round {}] REMOVED: {} [{}]  ->  KEPT: {} [{}]",
            self.round, self.removed, self.removed_quality, self.kept, self.kept_quality
        )
    }
}

/// A mutation the service rejected. Recorded and skipped, never retried.
#[derive(Debug, Clone, Serialize)]
pub struct MutationFailure {
    pub round: usize,
    pub track_id: TrackId,
    pub label: String,
    pub error: CatalogError,
}

impl fmt::Display for MutationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id {}): {}", self.label, self.track_id, self.error)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RoundOutcome {
    pub round: usize,
    pub collected: usize,
    pub groups: usize,
    pub attempted: usize,
    pub removed: usize,
    pub failed: usize,
    /// False when the listing aborted or hit the cap; the round then only saw
    /// part of the favorites.
    pub complete_listing: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConvergenceReport {
    pub rounds: usize,
    pub removals: Vec<RemovalRecord>,
    pub errors: Vec<MutationFailure>,
    pub round_outcomes: Vec<RoundOutcome>,
}

impl ConvergenceReport {
    pub fn total_removed(&self) -> usize {
        self.removals.len()
    }
}

/// Run one collect, group and remove pass. Returns how many copies were
/// actually removed; successes and failures are appended to `report`.
pub fn run_round<S, M>(
    source: &S,
    mutator: &M,
    round: usize,
    config: &ReconcileConfig,
    report: &mut ConvergenceReport,
) -> RoundOutcome
where
    S: FavoritesSource + ?Sized,
    M: FavoritesMutator + ?Sized,
{
    info!("Round {}: reading favorites", round);
    let collection = collect_all(source, config);
    let complete_listing = collection.is_complete();
    let collected = collection.tracks.len();

    let groups = find_duplicates(collection.tracks);
    let attempted = redundant_count(&groups);
    let mut outcome = RoundOutcome {
        round,
        collected,
        groups: groups.len(),
        attempted,
        complete_listing,
        ..RoundOutcome::default()
    };
    if groups.is_empty() {
        return outcome;
    }
    info!(
        "Round {}: {} duplicate groups, {} copies to remove",
        round,
        groups.len(),
        attempted
    );

    let pb = create_progress_bar(attempted as u64, &format!("Round {round}"), config.quiet);
    for group in groups.values() {
        let keeper = group.keeper();
        for track in group.redundant() {
            match mutator.remove_favorite(track.id) {
                Ok(()) => {
                    outcome.removed += 1;
                    report.removals.push(RemovalRecord::new(round, track, keeper));
                }
                Err(err) => {
                    warn!("Could not remove {} (id {}): {}", track.label(), track.id, err);
                    outcome.failed += 1;
                    report.errors.push(MutationFailure {
                        round,
                        track_id: track.id,
                        label: track.label(),
                        error: err,
                    });
                }
            }
            config.pause_after_modify();
            pb.inc(1);
            log_progress(
                &format!("round {round}"),
                pb.position(),
                attempted as u64,
                50,
                config.quiet,
            );
        }
    }
    pb.finish_and_clear();
    outcome
}

/// Repeat rounds until one removes nothing.
///
/// There is no round limit: every successful removal shrinks the list, so a
/// round with zero removals must eventually happen.
pub fn run_until_clean<S, M>(source: &S, mutator: &M, config: &ReconcileConfig) -> ConvergenceReport
where
    S: FavoritesSource + ?Sized,
    M: FavoritesMutator + ?Sized,
{
    let mut report = ConvergenceReport::default();
    let mut round = 1;

    loop {
        let outcome = run_round(source, mutator, round, config, &mut report);
        let removed = outcome.removed;
        report.round_outcomes.push(outcome);
        report.rounds = round;

        if removed == 0 {
            info!("Round {}: no duplicates removed, list is clean", round);
            break;
        }
        info!("Round {} done: {} duplicates removed", round, removed);
        config.pause_between_rounds();
        round += 1;
    }
    report
}

// ============================================================================
// TESTS
// ============================================================================
