//! Exhaustive enumeration of the remote favorites list.
//!
//! The listing is unreliable: the reported total can be wrong, short pages
//! occur mid-list, entries can be ghosts (catalog record deleted upstream) and
//! records can shift between pages while we read. The collector therefore
//! walks offsets until two consecutive pages come back with no items at all,
//! and drops any id it has already seen.

use log::{debug, error, info};
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::catalog::FavoritesSource;
use crate::config::ReconcileConfig;
use crate::error::CatalogError;
use crate::models::Track;
use crate::progress::create_spinner;

/// Consecutive item-less pages that end the listing.
const EMPTY_PAGES_TO_STOP: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionStats {
    pub pages_fetched: usize,
    /// Ghost entries (`item` absent or empty).
    pub skipped_unavailable: usize,
    /// Records already seen on an earlier page.
    pub duplicates_dropped: usize,
    /// Payloads with no recoverable id.
    pub unidentified: usize,
    /// Last numeric `totalNumberOfItems` reported by the service.
    pub reported_total: Option<u64>,
    pub hit_cap: bool,
}

/// Result of one pass over the listing. On a page error the tracks collected
/// so far are kept and `aborted` holds the error.
#[derive(Debug, Clone)]
pub struct Collection {
    pub tracks: Vec<Track>,
    pub stats: CollectionStats,
    pub aborted: Option<CatalogError>,
}

impl Collection {
    /// Records the service counted but no page ever returned.
    pub fn missing(&self) -> usize {
        self.stats
            .reported_total
            .map(|total| {
                let seen = (self.tracks.len() + self.stats.skipped_unavailable) as u64;
                total.saturating_sub(seen) as usize
            })
            .unwrap_or(0)
    }

    pub fn is_complete(&self) -> bool {
        self.aborted.is_none() && !self.stats.hit_cap
    }
}

/// Read every favorite reachable through `source`.
pub fn collect_all<S: FavoritesSource + ?Sized>(source: &S, config: &ReconcileConfig) -> Collection {
    let page_size = config.page_size.max(1);
    let mut tracks: Vec<Track> = Vec::new();
    let mut seen = FxHashSet::default();
    let mut stats = CollectionStats::default();
    let mut aborted = None;
    let mut consecutive_empty = 0;
    let mut offset = 0;

    let spinner = create_spinner("Reading favorites", config.quiet);

    'pages: loop {
        if tracks.len() >= config.max_tracks {
            stats.hit_cap = true;
            break;
        }

        let page = match source.favorites_page(offset, page_size) {
            Ok(page) => page,
            Err(err) => {
                error!("Favorites listing failed at offset {}: {}", offset, err);
                aborted = Some(err);
                break;
            }
        };
        stats.pages_fetched += 1;
        config.pause_after_read();

        if page.total.is_some() {
            stats.reported_total = page.total;
        }
        debug!(
            "Page at offset {}: {} items (reported total {:?})",
            offset,
            page.items.len(),
            page.total
        );

        // Only a page with no items at all counts as empty; a page of ghosts
        // or unparseable records still means the list goes on.
        if page.items.is_empty() {
            consecutive_empty += 1;
            if consecutive_empty >= EMPTY_PAGES_TO_STOP {
                break;
            }
            offset += page_size;
            continue;
        }
        consecutive_empty = 0;

        for entry in &page.items {
            let Some(payload) = &entry.payload else {
                stats.skipped_unavailable += 1;
                continue;
            };
            let Some(track) = Track::from_payload(payload) else {
                stats.unidentified += 1;
                continue;
            };
            if !seen.insert(track.id) {
                stats.duplicates_dropped += 1;
                continue;
            }
            tracks.push(track);
            if tracks.len() >= config.max_tracks {
                stats.hit_cap = true;
                break 'pages;
            }
        }

        spinner.set_message(format!("Reading favorites: {} tracks", tracks.len()));
        offset += page_size;
    }
    spinner.finish_and_clear();

    let collection = Collection {
        tracks,
        stats,
        aborted,
    };
    report(&collection, config);
    collection
}

fn report(collection: &Collection, config: &ReconcileConfig) {
    let stats = &collection.stats;
    info!(
        "Collected {} tracks in {} pages",
        collection.tracks.len(),
        stats.pages_fetched
    );
    if stats.hit_cap {
        info!("Stopped at the {} track limit", config.max_tracks);
    }
    if stats.skipped_unavailable > 0 {
        info!(
            "{} favorites have no catalog record (deleted upstream or region-restricted)",
            stats.skipped_unavailable
        );
    }
    let missing = collection.missing();
    if missing > 0 {
        info!(
            "{} favorites counted in the reported total never appeared on any page",
            missing
        );
    }
    if collection.aborted.is_some() {
        error!("Listing is incomplete; results cover only the pages read");
    }
}

// ============================================================================
// TESTS
// ============================================================================
