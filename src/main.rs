use anyhow::{bail, Context, Result};
use clap::Parser;
use log::warn;
use std::io;
use std::time::Instant;

use tidal_favorites::audit::{AuditLog, REMOVED_DUPLICATES_LOG};
use tidal_favorites::collector::collect_all;
use tidal_favorites::config::{RunArgs, SessionArgs};
use tidal_favorites::convergence::run_until_clean;
use tidal_favorites::grouping::{find_duplicates, redundant_count};
use tidal_favorites::models::{DuplicateGroups, Track};
use tidal_favorites::progress::{format_duration, init_logging};
use tidal_favorites::safety::confirm;
use tidal_favorites::tidal::{TidalClient, TidalSession};

#[derive(Parser)]
#[command(name = "favorites-dedupe")]
#[command(about = "Remove duplicate recordings from Tidal favorites, keeping the best copy")]
struct Args {
    #[command(flatten)]
    session: SessionArgs,

    #[command(flatten)]
    run: RunArgs,

    /// Groups shown in the preview before confirmation
    #[arg(long, default_value = "10")]
    preview: usize,
}

fn album(track: &Track) -> &str {
    track.album.as_deref().unwrap_or("?")
}

fn print_preview(groups: &DuplicateGroups, limit: usize) {
    println!("Preview (first {} groups):", limit.min(groups.len()));
    for group in groups.values().take(limit) {
        let keeper = group.keeper();
        println!(
            "  + keep   : {}  [{}]  (album: {})",
            keeper.label(),
            keeper.quality_label(),
            album(keeper)
        );
        for track in group.redundant() {
            println!(
                "  - remove : {}  [{}]  (album: {})",
                track.label(),
                track.quality_label(),
                album(track)
            );
        }
        println!();
    }
    if groups.len() > limit {
        println!("  ... and {} more groups.\n", groups.len() - limit);
    }
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let config = args.run.to_config();
    let client = TidalClient::new(TidalSession::from(&args.session));

    let start = Instant::now();

    println!("Scanning favorites for a preview...");
    let collection = collect_all(&client, &config);
    if let Some(err) = &collection.aborted {
        if collection.tracks.is_empty() {
            bail!("Could not read favorites: {}", err);
        }
        warn!("Preview is based on a partial listing: {}", err);
    }

    let groups = find_duplicates(collection.tracks);
    if groups.is_empty() {
        println!("No duplicates found. Favorites are already clean.");
        return Ok(());
    }

    println!(
        "\nFound {} duplicate groups ({} copies to remove).",
        groups.len(),
        redundant_count(&groups)
    );
    println!("More may appear in later rounds as the listing refreshes.\n");
    print_preview(&groups, args.preview);

    let confirmed = confirm(
        "Remove all duplicates, repeating until the list is clean?",
        args.run.yes,
        &mut io::stdin().lock(),
        &mut io::stdout(),
    )?;
    if !confirmed {
        println!("Cancelled. Nothing was removed.");
        return Ok(());
    }

    let report = run_until_clean(&client, &client, &config);

    println!("\n{:=<60}", "");
    println!("Deduplication complete!");
    println!("  Rounds:        {}", report.rounds);
    println!("  Removed:       {}", report.total_removed());
    println!("  Errors:        {}", report.errors.len());
    println!("  Elapsed:       {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    for failure in &report.errors {
        println!("  ! {}", failure);
    }
    if report.round_outcomes.iter().any(|r| !r.complete_listing) {
        println!("  Some rounds read only part of the favorites; run again to finish.");
    }

    let audit = AuditLog::new(&config.log_dir);
    if let Some(path) = audit.append_lines(REMOVED_DUPLICATES_LOG, &report.removals)? {
        println!("\nLog saved to {}", path.display());
    }

    if args.run.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    }

    Ok(())
}
