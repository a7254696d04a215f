#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Collects provider listings and their visible appointment slots from
//! Doctolib.
//!
//! ```text
//! slot_scout --query cardiologue --location Paris [--max-results 10]
//!            [--filters disponibilites,langues:Anglais] [--output results.csv]
//!            [--json-output] [--headless] [--delay 2] [--details]
//! slot_scout --query cardiologue --location Paris --snapshot saved.html
//! ```
//!
//! Uses `indicatif-log-bridge` (via [`slot_scout_cli_utils::init_logger`])
//! so log lines and the listing progress bar share the terminal.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use slot_scout_browser::{ChromeOptions, ChromeSite};
use slot_scout_cli_utils::IndicatifProgress;
use slot_scout_driver::progress::ProgressCallback;
use slot_scout_driver::{BatchOutcome, RunOptions, SnapshotSite, parse_filters, run_batch};
use slot_scout_extract::profile::load_profile;
use slot_scout_extract::{SiteProfile, default_profile};
use slot_scout_listing_models::FieldName;

#[derive(Parser)]
#[command(
    name = "slot_scout",
    about = "Scrape provider listings and visible appointment slots from Doctolib"
)]
struct Cli {
    /// Specialty or practitioner to search for (e.g. "cardiologue")
    #[arg(long)]
    query: String,
    /// City or postal code to search around
    #[arg(long)]
    location: String,
    /// Maximum number of listings to process
    #[arg(long, alias = "max_results", default_value_t = 10)]
    max_results: usize,
    /// Comma-separated filters, e.g. "disponibilites,langues:Anglais"
    #[arg(long, default_value = "")]
    filters: String,
    /// CSV output file
    #[arg(long, default_value = "doctolib_results.csv")]
    output: PathBuf,
    /// Also write the records as JSON next to the CSV file
    #[arg(long, alias = "json_output")]
    json_output: bool,
    /// Run Chrome without a window
    #[arg(long)]
    headless: bool,
    /// Pause after each page interaction, in seconds
    #[arg(long, default_value_t = 2)]
    delay: u64,
    /// Maximum wait for an element to appear, in seconds
    #[arg(long, default_value_t = 15)]
    timeout: u64,
    /// Maximum number of slots kept per listing
    #[arg(long, default_value_t = 10)]
    max_slots: usize,
    /// Follow profile links to read pricing, payment methods and skills
    #[arg(long)]
    details: bool,
    /// Do not open listing agendas
    #[arg(long)]
    no_agenda: bool,
    /// Site profile TOML replacing the built-in one
    #[arg(long)]
    profile: Option<PathBuf>,
    /// Extract from a saved results page instead of a live browser
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

impl Cli {
    fn run_options(&self, cancel: &Arc<AtomicBool>) -> RunOptions {
        let live = self.snapshot.is_none();
        RunOptions {
            query: self.query.clone(),
            location: self.location.clone(),
            max_results: self.max_results,
            filters: parse_filters(&self.filters),
            visit_agenda: live && !self.no_agenda,
            details: live && self.details,
            cancel: Arc::clone(cancel),
        }
    }

    const fn chrome_options(&self) -> ChromeOptions {
        ChromeOptions {
            headless: self.headless,
            delay: Duration::from_secs(self.delay),
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let multi = slot_scout_cli_utils::init_logger();

    let mut profile = match &cli.profile {
        Some(path) => load_profile(path)?,
        None => default_profile(),
    };
    profile.fields = profile.fields.with_limit(FieldName::Slots, cli.max_slots);

    let cancel = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(&cancel);

    let progress = IndicatifProgress::listings_bar(&multi, "Searching...");
    let outcome = collect(&cli, &profile, &progress, &cancel)?;

    if let Some(e) = &outcome.interrupted {
        log::error!("Run interrupted, saving what was collected: {e}");
    }
    if outcome.batch.is_empty() {
        log::warn!("No data collected, nothing written");
        return Ok(());
    }

    let written =
        slot_scout_sink::write_outputs(&cli.output, outcome.batch.records(), cli.json_output)?;
    for path in written {
        println!(
            "Saved {} listing(s) to {}",
            outcome.batch.len(),
            path.display()
        );
    }

    Ok(())
}

/// The first Ctrl-C raises `cancel` so the run stops after the current
/// listing and its records are still written; a second one exits at once.
fn install_interrupt_handler(cancel: &Arc<AtomicBool>) {
    let flag = Arc::clone(cancel);
    let installed = ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        log::warn!("Interrupted, finishing the current listing (Ctrl-C again to quit without saving)");
    });
    if let Err(e) = installed {
        log::warn!("Could not install the Ctrl-C handler: {e}");
    }
}

fn collect(
    cli: &Cli,
    profile: &SiteProfile,
    progress: &Arc<dyn ProgressCallback>,
    cancel: &Arc<AtomicBool>,
) -> Result<BatchOutcome, Box<dyn std::error::Error>> {
    let options = cli.run_options(cancel);

    let outcome = match &cli.snapshot {
        Some(path) => {
            let mut site = SnapshotSite::from_file(path)?;
            run_batch(&mut site, profile, &options, progress)?
        }
        None => {
            let mut site = ChromeSite::launch(profile, cli.chrome_options())?;
            run_batch(&mut site, profile, &options, progress)?
        }
    };

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_follow_the_documented_values() {
        let cli = Cli::try_parse_from(["slot_scout", "--query", "cardiologue", "--location", "Paris"])
            .unwrap();
        assert_eq!(cli.max_results, 10);
        assert_eq!(cli.output, PathBuf::from("doctolib_results.csv"));
        assert_eq!(cli.delay, 2);
        assert!(!cli.json_output);
        assert!(!cli.headless);

        let options = cli.run_options(&Arc::default());
        assert!(options.visit_agenda);
        assert!(!options.details);
        assert!(options.filters.is_empty());
    }

    #[test]
    fn underscore_aliases_are_accepted() {
        let cli = Cli::try_parse_from([
            "slot_scout",
            "--query",
            "dentiste",
            "--location",
            "Lyon",
            "--max_results",
            "3",
            "--json_output",
            "--filters",
            "disponibilites,langues:Anglais",
        ])
        .unwrap();
        assert_eq!(cli.max_results, 3);
        assert!(cli.json_output);
        assert_eq!(cli.run_options(&Arc::default()).filters.len(), 2);
    }

    #[test]
    fn query_and_location_are_required() {
        assert!(Cli::try_parse_from(["slot_scout", "--query", "cardiologue"]).is_err());
        assert!(Cli::try_parse_from(["slot_scout", "--location", "Paris"]).is_err());
    }

    #[test]
    fn snapshots_disable_page_visits() {
        let cli = Cli::try_parse_from([
            "slot_scout",
            "--query",
            "cardiologue",
            "--location",
            "Paris",
            "--details",
            "--snapshot",
            "saved.html",
        ])
        .unwrap();
        let options = cli.run_options(&Arc::default());
        assert!(!options.visit_agenda);
        assert!(!options.details);
    }

    #[test]
    fn run_options_share_the_cancel_flag() {
        let cli = Cli::try_parse_from(["slot_scout", "--query", "cardiologue", "--location", "Paris"])
            .unwrap();
        let cancel = Arc::new(AtomicBool::new(false));
        let options = cli.run_options(&cancel);

        cancel.store(true, Ordering::SeqCst);

        assert!(options.cancel.load(Ordering::SeqCst));
    }

    #[test]
    fn snapshot_run_writes_nothing_for_an_empty_page() {
        let page = std::env::temp_dir().join("slot_scout_cli_empty.html");
        std::fs::write(&page, "<html><body><p>Aucun résultat</p></body></html>").unwrap();
        let cli = Cli::try_parse_from([
            "slot_scout",
            "--query",
            "cardiologue",
            "--location",
            "Paris",
            "--snapshot",
            page.to_str().unwrap(),
        ])
        .unwrap();

        let progress = slot_scout_driver::progress::null_progress();
        let outcome = collect(&cli, &default_profile(), &progress, &Arc::default()).unwrap();
        assert!(outcome.batch.is_empty());

        std::fs::remove_file(page).ok();
    }
}
