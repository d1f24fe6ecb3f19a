use anyhow::{bail, Context, Result};
use clap::Parser;
use log::warn;
use std::path::PathBuf;
use std::time::Instant;

use tidal_favorites::audit::{
    AuditLog, SYNC_ADDED_LOG, SYNC_ALREADY_PRESENT_LOG, SYNC_NOT_FOUND_LOG,
};
use tidal_favorites::config::{RunArgs, SessionArgs};
use tidal_favorites::progress::{format_duration, init_logging};
use tidal_favorites::sync::{collect_favorite_ids, scan_music_dir, sync_songs};
use tidal_favorites::tidal::{TidalClient, TidalSession};

#[derive(Parser)]
#[command(name = "favorites-sync")]
#[command(about = "Add songs from a local 'Artist/Artist - Title.ext' folder to Tidal favorites")]
struct Args {
    /// Music root with one folder per artist
    music_dir: PathBuf,

    #[command(flatten)]
    session: SessionArgs,

    #[command(flatten)]
    run: RunArgs,

    /// Additional artist folder names to skip
    #[arg(long = "ignore")]
    ignore: Vec<String>,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let mut config = args.run.to_config();
    config.ignored_folders.extend(args.ignore.iter().cloned());
    let client = TidalClient::new(TidalSession::from(&args.session));

    let start = Instant::now();

    println!("Reading current favorites...");
    let (mut existing, collection) = collect_favorite_ids(&client, &config);
    if let Some(err) = &collection.aborted {
        warn!("Favorites listing incomplete, some songs may be reported as new: {}", err);
    }
    println!("  {} favorites already on Tidal", existing.len());

    println!("\nReading songs from {}", args.music_dir.display());
    let scan = scan_music_dir(&args.music_dir, &config)?;
    if scan.songs.is_empty() {
        bail!("No songs found under {}", args.music_dir.display());
    }
    println!("  {} songs found locally", scan.songs.len());
    let skipped: usize = scan.skipped.iter().map(|s| s.files.len()).sum();
    if skipped > 0 {
        println!("  {} files skipped (not named 'Artist - Title')", skipped);
    }

    println!("\nSearching and adding...");
    let report = sync_songs(&client, &scan.songs, &mut existing, &config);

    println!("\n{:=<60}", "");
    println!("Sync complete!");
    println!("  Added:            {}", report.added.len());
    println!("  Already present:  {}", report.already_present.len());
    println!("  Not found:        {}", report.not_found.len());
    println!("  Errors:           {}", report.errors.len());
    println!("  Elapsed:          {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    for failure in &report.errors {
        println!("  ! {}: {}", failure.label, failure.error);
    }

    let audit = AuditLog::new(&config.log_dir);
    for (file_name, entries) in [
        (SYNC_ADDED_LOG, &report.added),
        (SYNC_NOT_FOUND_LOG, &report.not_found),
        (SYNC_ALREADY_PRESENT_LOG, &report.already_present),
    ] {
        if let Some(path) = audit.append_lines(file_name, entries)? {
            println!("Log saved to {}", path.display());
        }
    }

    if args.run.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    }

    Ok(())
}
