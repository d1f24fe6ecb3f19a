//! Local folder to favorites synchronization.
//!
//! The music root holds one folder per artist with files named
//! `"Artist - Title.ext"`. Each song is searched in the catalog and added to
//! the favorites unless it is already there.

use anyhow::{Context, Result};
use log::{info, warn};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::catalog::{CatalogSearch, FavoritesMutator, FavoritesSource};
use crate::collector::{collect_all, Collection};
use crate::config::ReconcileConfig;
use crate::error::CatalogError;
use crate::models::{Track, TrackId};
use crate::normalize::normalize_loose;
use crate::progress::{create_progress_bar, log_progress};

pub const AUDIO_EXTENSIONS: &[&str] = &["flac", "mp3", "wav", "m4a", "ogg", "aac", "opus"];

/// Filenames listed per folder when reporting unparseable names.
const SKIPPED_PREVIEW: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSong {
    pub artist: String,
    pub title: String,
    pub file_name: String,
}

impl LocalSong {
    pub fn label(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

/// Audio files whose name lacks the `" - "` separator, per artist folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkippedFolder {
    pub folder: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LocalScan {
    pub songs: Vec<LocalSong>,
    pub skipped: Vec<SkippedFolder>,
}

/// Split a file stem on the first `" - "` into (artist, title).
pub fn parse_song_stem(stem: &str) -> Option<(String, String)> {
    let (artist, title) = stem.split_once(" - ")?;
    Some((artist.trim().to_string(), title.trim().to_string()))
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn sorted_entries(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("Failed to list directory {}", dir.display()))?;
    entries.sort();
    Ok(entries)
}

/// Scan `root` for songs, artist folders in sorted order.
pub fn scan_music_dir(root: &Path, config: &ReconcileConfig) -> Result<LocalScan> {
    if !root.is_dir() {
        anyhow::bail!("Music folder not found: {}", root.display());
    }

    let mut scan = LocalScan::default();
    for folder in sorted_entries(root)? {
        if !folder.is_dir() {
            continue;
        }
        let folder_name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if config.ignored_folders.iter().any(|ignored| *ignored == folder_name) {
            continue;
        }

        let mut skipped = Vec::new();
        for file in sorted_entries(&folder)? {
            if !file.is_file() || !is_audio_file(&file) {
                continue;
            }
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            match parse_song_stem(&stem) {
                Some((artist, title)) => scan.songs.push(LocalSong {
                    artist,
                    title,
                    file_name,
                }),
                None => skipped.push(file_name),
            }
        }

        if !skipped.is_empty() {
            warn!(
                "{} file(s) in '{}' skipped, names are not 'Artist - Title': {}{}",
                skipped.len(),
                folder_name,
                skipped[..skipped.len().min(SKIPPED_PREVIEW)].join(", "),
                if skipped.len() > SKIPPED_PREVIEW {
                    format!(" and {} more", skipped.len() - SKIPPED_PREVIEW)
                } else {
                    String::new()
                }
            );
            scan.skipped.push(SkippedFolder {
                folder: folder_name,
                files: skipped,
            });
        }
    }
    Ok(scan)
}

fn loosely_equal(local: &str, remote: &str) -> bool {
    !local.is_empty() && !remote.is_empty() && (remote.contains(local) || local.contains(remote))
}

/// First result among the leading `window` whose artist and title each
/// contain, or are contained by, the local ones after loose normalization.
pub fn find_best_match(results: &[Track], artist: &str, title: &str, window: usize) -> Option<Track> {
    let artist = normalize_loose(artist);
    let title = normalize_loose(title);

    results
        .iter()
        .take(window)
        .find(|candidate| {
            let remote_artist = normalize_loose(candidate.artist.as_deref().unwrap_or(""));
            let remote_title = normalize_loose(&candidate.title);
            loosely_equal(&artist, &remote_artist) && loosely_equal(&title, &remote_title)
        })
        .cloned()
}

/// Ids currently in the favorites, plus the collection they came from.
pub fn collect_favorite_ids<S: FavoritesSource + ?Sized>(
    source: &S,
    config: &ReconcileConfig,
) -> (FxHashSet<TrackId>, Collection) {
    let collection = collect_all(source, config);
    let ids = collection.tracks.iter().map(|t| t.id).collect();
    (ids, collection)
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub label: String,
    pub error: CatalogError,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// "local label  ->  catalog label" for every added song.
    pub added: Vec<String>,
    pub not_found: Vec<String>,
    pub already_present: Vec<String>,
    pub errors: Vec<SyncFailure>,
}

/// Search and add every local song. `existing` grows with each added id.
pub fn sync_songs<C>(
    catalog: &C,
    songs: &[LocalSong],
    existing: &mut FxHashSet<TrackId>,
    config: &ReconcileConfig,
) -> SyncReport
where
    C: CatalogSearch + FavoritesMutator + ?Sized,
{
    let mut report = SyncReport::default();
    let total = songs.len() as u64;
    let pb = create_progress_bar(total, "Syncing", config.quiet);

    for song in songs {
        let label = song.label();
        pb.inc(1);
        log_progress("sync", pb.position(), total, 50, config.quiet);

        let query = format!("{} {}", song.artist, song.title);
        let results = catalog.search_tracks(&query, config.search_limit);
        config.pause_after_read();
        let results: Vec<Track> = match results {
            Ok(results) => results.iter().filter_map(Track::from_payload).collect(),
            Err(err) => {
                warn!("Search failed for '{}': {}", query, err);
                report.errors.push(SyncFailure { label, error: err });
                continue;
            }
        };

        let Some(track) = find_best_match(&results, &song.artist, &song.title, config.sync_match_window)
        else {
            report.not_found.push(label);
            continue;
        };

        if existing.contains(&track.id) {
            report.already_present.push(label);
            continue;
        }

        let added = catalog.add_favorite(track.id);
        config.pause_after_modify();
        match added {
            Ok(()) => {
                existing.insert(track.id);
                info!("Added {} as {}", label, track.label());
                report.added.push(format!("{}  ->  {}", label, track.label()));
            }
            Err(err) => {
                warn!("Could not add {}: {}", label, err);
                report.errors.push(SyncFailure { label, error: err });
            }
        }
    }
    pb.finish_and_clear();
    report
}

// ============================================================================
// TESTS
// ============================================================================
