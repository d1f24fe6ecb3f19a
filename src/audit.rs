//! Append-only plain-text audit logs, one file per outcome kind.
//!
//! Logs are written once at the end of a run and never read back.

use anyhow::{Context, Result};
use chrono::Local;
use std::fmt::Display;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const REMOVED_DUPLICATES_LOG: &str = "tidal_removed_duplicates.txt";
pub const UPGRADED_QUALITY_LOG: &str = "tidal_upgraded_quality.txt";
pub const SYNC_ADDED_LOG: &str = "tidal_added.txt";
pub const SYNC_NOT_FOUND_LOG: &str = "tidal_not_found.txt";
pub const SYNC_ALREADY_PRESENT_LOG: &str = "tidal_already_present.txt";

pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Append one entry per line under a run header. Does nothing when
    /// `entries` is empty; returns the file path otherwise.
    pub fn append_lines<T: Display>(&self, file_name: &str, entries: &[T]) -> Result<Option<PathBuf>> {
        self.append(file_name, entries, "\n")
    }

    /// Append multi-line entries separated by blank lines.
    pub fn append_blocks<T: Display>(&self, file_name: &str, entries: &[T]) -> Result<Option<PathBuf>> {
        self.append(file_name, entries, "\n\n")
    }

    fn append<T: Display>(&self, file_name: &str, entries: &[T], separator: &str) -> Result<Option<PathBuf>> {
        if entries.is_empty() {
            return Ok(None);
        }
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create log directory {}", self.dir.display()))?;

        let path = self.path(file_name);
        let body = entries
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(separator);
        write_entry(&path, &format!("{}{}\n", run_header(), body))?;
        Ok(Some(path))
    }
}

fn run_header() -> String {
    format!("# run {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"))
}

fn write_entry(path: &Path, text: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log {}", path.display()))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("Failed to write log {}", path.display()))
}
