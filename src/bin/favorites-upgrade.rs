use anyhow::{bail, Context, Result};
use clap::Parser;
use log::warn;
use std::io;
use std::time::Instant;

use tidal_favorites::audit::{AuditLog, UPGRADED_QUALITY_LOG};
use tidal_favorites::collector::collect_all;
use tidal_favorites::config::{RunArgs, SessionArgs};
use tidal_favorites::models::QualityTier;
use tidal_favorites::progress::{format_duration, init_logging};
use tidal_favorites::safety::confirm;
use tidal_favorites::tidal::{TidalClient, TidalSession};
use tidal_favorites::upgrade::{quality_distribution, upgrade_all};

#[derive(Parser)]
#[command(name = "favorites-upgrade")]
#[command(about = "Replace Tidal favorites with higher-fidelity copies of the same recording")]
struct Args {
    #[command(flatten)]
    session: SessionArgs,

    #[command(flatten)]
    run: RunArgs,

    /// Tracks at or above this tier are skipped (HI_RES_LOSSLESS, HI_RES, LOSSLESS, ...)
    #[arg(long, default_value = "HI_RES_LOSSLESS")]
    ceiling: String,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let mut config = args.run.to_config();
    config.upgrade_ceiling = match QualityTier::from_label(&args.ceiling) {
        QualityTier::Unknown => bail!("Unknown quality tier: {}", args.ceiling),
        tier => tier,
    };
    let client = TidalClient::new(TidalSession::from(&args.session));

    let start = Instant::now();

    println!("Reading favorites...");
    let collection = collect_all(&client, &config);
    if let Some(err) = &collection.aborted {
        if collection.tracks.is_empty() {
            bail!("Could not read favorites: {}", err);
        }
        warn!("Continuing with a partial listing: {}", err);
    }
    let tracks = collection.tracks;
    println!("  {} tracks read", tracks.len());

    println!("\nCurrent quality distribution:");
    for (tier, count) in quality_distribution(&tracks) {
        println!("  {:<22} : {}", tier.label(), count);
    }

    let at_ceiling = tracks
        .iter()
        .filter(|t| t.audio_quality >= config.upgrade_ceiling)
        .count();
    let candidates = tracks.len() - at_ceiling;
    println!("\n  {} already at {} or better (skipped)", at_ceiling, config.upgrade_ceiling.label());
    println!("  {} tracks to check in the catalog\n", candidates);

    if candidates == 0 {
        println!("Every favorite is already at the highest tier.");
        return Ok(());
    }

    let confirmed = confirm(
        "Search for better copies and swap them in?",
        args.run.yes,
        &mut io::stdin().lock(),
        &mut io::stdout(),
    )?;
    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    let report = upgrade_all(&client, &tracks, &config);

    println!("\n{:=<60}", "");
    println!("Upgrade complete!");
    println!("  Processed:        {}", report.processed);
    println!("  Already at top:   {}", report.at_ceiling);
    println!("  Upgraded:         {}", report.upgraded.len());
    println!("  Partial (2 kept): {}", report.partial);
    println!("  Errors:           {}", report.errors.len());
    println!("  Elapsed:          {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    let audit = AuditLog::new(&config.log_dir);
    if let Some(path) = audit.append_blocks(UPGRADED_QUALITY_LOG, &report.upgraded)? {
        println!("\nLog saved to {}", path.display());
    }

    if !report.errors.is_empty() {
        println!("\nDetailed errors:");
        for failure in &report.errors {
            println!("  - {}", failure);
        }
    }

    if !report.upgraded.is_empty() || report.partial > 0 {
        println!("\nTip: run favorites-dedupe to remove any copies left behind.");
    }

    if args.run.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    }

    Ok(())
}
