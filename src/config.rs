//! Run configuration.
//!
//! A [`ReconcileConfig`] is built once per run (from the command line in the
//! binaries, or [`ReconcileConfig::immediate`] in tests) and passed into every
//! component. Nothing in the library reads configuration from globals.

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::QualityTier;

pub const DEFAULT_API_BASE: &str = "https://api.tidal.com/v1";

/// Pacing, bounds and destinations for one run.
#[derive(Clone, Debug)]
pub struct ReconcileConfig {
    /// Favorites requested per listing page.
    pub page_size: usize,
    /// Hard cap on tracks collected in one pass.
    pub max_tracks: usize,
    /// Pause after every listing or search request.
    pub read_delay: Duration,
    /// Pause after every add or remove. Never shorter than `read_delay`.
    pub modify_delay: Duration,
    /// Pause between convergence rounds so the listing can catch up.
    pub round_cooldown: Duration,
    /// Search results requested per query.
    pub search_limit: usize,
    /// Leading search results considered when matching a local file.
    pub sync_match_window: usize,
    /// Tracks at or above this tier are never searched for upgrades.
    pub upgrade_ceiling: QualityTier,
    /// Artist folder names skipped by the local scan.
    pub ignored_folders: Vec<String>,
    /// Directory receiving the append-only audit logs.
    pub log_dir: PathBuf,
    /// Hide progress bars (log-only output).
    pub quiet: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_tracks: 50_000,
            read_delay: Duration::from_millis(500),
            modify_delay: Duration::from_millis(1000),
            round_cooldown: Duration::from_secs(3),
            search_limit: 20,
            sync_match_window: 10,
            upgrade_ceiling: QualityTier::HiResLossless,
            ignored_folders: vec!["__pycache__".to_string()],
            log_dir: PathBuf::from("."),
            quiet: false,
        }
    }
}

impl ReconcileConfig {
    /// Production bounds with every delay zeroed and progress hidden.
    pub fn immediate() -> Self {
        Self {
            read_delay: Duration::ZERO,
            modify_delay: Duration::ZERO,
            round_cooldown: Duration::ZERO,
            quiet: true,
            ..Self::default()
        }
    }

    pub fn pause_after_read(&self) {
        pause(self.read_delay);
    }

    pub fn pause_after_modify(&self) {
        pause(self.modify_delay);
    }

    pub fn pause_between_rounds(&self) {
        pause(self.round_cooldown);
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

// ============================================================================
// Command line
// ============================================================================

/// Catalog session options shared by every binary.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// OAuth access token for the catalog API
    #[arg(long, env = "TIDAL_ACCESS_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Numeric user id owning the favorites list
    #[arg(long, env = "TIDAL_USER_ID")]
    pub user_id: String,

    /// Country code sent with every request
    #[arg(long, env = "TIDAL_COUNTRY_CODE", default_value = "US")]
    pub country: String,

    #[arg(long, env = "TIDAL_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,
}

/// Run options shared by every binary.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Maximum favorites to read in one pass
    #[arg(long, default_value = "50000")]
    pub max_tracks: usize,

    #[arg(long, default_value = "100")]
    pub page_size: usize,

    /// Seconds to wait after each read or search request
    #[arg(long, default_value = "0.5", value_parser = parse_delay)]
    pub read_delay: Duration,

    /// Seconds to wait after each add or remove (raised to --read-delay if lower)
    #[arg(long, default_value = "1.0", value_parser = parse_delay)]
    pub modify_delay: Duration,

    /// Directory for the append-only audit logs
    #[arg(long, default_value = ".")]
    pub log_dir: PathBuf,

    /// Hide progress bars (log-only mode for tail-friendly output)
    #[arg(long)]
    pub quiet: bool,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// Parse a non-negative, finite number of seconds.
pub fn parse_delay(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;
    Duration::try_from_secs_f64(secs).map_err(|err| format!("invalid delay '{}': {}", value, err))
}

impl RunArgs {
    pub fn to_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            page_size: self.page_size.max(1),
            max_tracks: self.max_tracks,
            read_delay: self.read_delay,
            modify_delay: self.modify_delay.max(self.read_delay),
            log_dir: self.log_dir.clone(),
            quiet: self.quiet,
            ..ReconcileConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_has_no_delays() {
        let config = ReconcileConfig::immediate();
        assert!(config.read_delay.is_zero());
        assert!(config.modify_delay.is_zero());
        assert!(config.round_cooldown.is_zero());
        assert_eq!(config.page_size, 100);
        assert_eq!(config.max_tracks, 50_000);
    }

    fn run_args(read_delay: Duration, modify_delay: Duration) -> RunArgs {
        RunArgs {
            max_tracks: 10,
            page_size: 0,
            read_delay,
            modify_delay,
            log_dir: PathBuf::from("/tmp/logs"),
            quiet: true,
            yes: false,
            json: false,
        }
    }

    #[test]
    fn test_mutation_delay_exceeds_read_delay() {
        let config = ReconcileConfig::default();
        assert!(config.modify_delay > config.read_delay);
    }

    #[test]
    fn test_run_args_to_config() {
        let config = run_args(Duration::ZERO, Duration::from_millis(250)).to_config();
        assert_eq!(config.page_size, 1);
        assert_eq!(config.max_tracks, 10);
        assert!(config.read_delay.is_zero());
        assert_eq!(config.modify_delay, Duration::from_millis(250));
        assert_eq!(config.log_dir, PathBuf::from("/tmp/logs"));
        assert!(config.quiet);
    }

    #[test]
    fn test_mutation_delay_never_below_read_delay() {
        let config = run_args(Duration::from_secs(5), Duration::from_secs(1)).to_config();
        assert_eq!(config.read_delay, Duration::from_secs(5));
        assert!(config.modify_delay >= config.read_delay);
    }

    #[test]
    fn test_parse_delay() {
        assert_eq!(parse_delay("0.5"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_delay(" 2 "), Ok(Duration::from_secs(2)));
        assert!(parse_delay("inf").is_err());
        assert!(parse_delay("NaN").is_err());
        assert!(parse_delay("-1").is_err());
        assert!(parse_delay("1e300").is_err());
        assert!(parse_delay("soon").is_err());
    }

    #[test]
    fn test_delay_flags_reject_infinite() {
        use clap::Parser;

        #[derive(Parser)]
        struct Cli {
            #[command(flatten)]
            run: RunArgs,
        }

        let cli = Cli::try_parse_from(["x", "--read-delay", "2", "--modify-delay", "0.1"]).unwrap();
        let config = cli.run.to_config();
        assert_eq!(config.modify_delay, Duration::from_secs(2));
        assert!(Cli::try_parse_from(["x", "--read-delay", "inf"]).is_err());
    }
}
