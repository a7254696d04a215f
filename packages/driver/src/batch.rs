//! The listing loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;
use scraper::Html;
use slot_scout_extract::resolver::resolve_nodes;
use slot_scout_extract::{
    ExtractContext, Node as _, SiteProfile, assemble_listing, augment_with_detail, refresh_slots,
    reset_detail,
};
use slot_scout_listing_models::{Batch, FieldName, ProviderRecord};

use crate::progress::ProgressCallback;
use crate::{DirectorySite, Filter, ListingRef, RunError, SiteError};

/// What to search for and how much work to do per listing.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub query: String,
    pub location: String,
    /// Upper bound on processed listings.
    pub max_results: usize,
    /// Filters applied before listings are read.
    pub filters: Vec<Filter>,
    /// Click each listing to collect its visible slots.
    pub visit_agenda: bool,
    /// Follow profile links to read pricing, payment methods and skills.
    pub details: bool,
    /// Checked before each listing; once raised, the run stops and returns
    /// what it has collected.
    pub cancel: Arc<AtomicBool>,
}

/// Records collected by a run.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Listings in page order.
    pub batch: Batch,
    /// Set when the run was cancelled or the results page became unreadable
    /// mid-run. `batch` holds everything collected before that.
    pub interrupted: Option<SiteError>,
}

/// Runs one search and processes its listings sequentially.
///
/// # Errors
///
/// Returns [`RunError`] if the search cannot be submitted or the results
/// page cannot be read at all. Faults after the first listing is read end
/// the run early and are reported in [`BatchOutcome::interrupted`].
pub fn run_batch<S: DirectorySite>(
    site: &mut S,
    profile: &SiteProfile,
    options: &RunOptions,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<BatchOutcome, RunError> {
    log::info!(
        "Searching {} for '{}' in '{}'",
        profile.name,
        options.query,
        options.location
    );
    site.search(&options.query, &options.location)
        .map_err(RunError::Setup)?;

    if let Err(e) = site.load_all_results() {
        log::warn!("Could not load every result: {e}");
    }

    for filter in &options.filters {
        match site.apply_filter(filter) {
            Ok(true) => log::info!("Filter '{filter}' applied"),
            Ok(false) => log::warn!("Filter '{filter}' is not available, skipped"),
            Err(e) => log::warn!("Filter '{filter}' failed: {e}"),
        }
    }

    let html = site.results_html().map_err(RunError::Results)?;
    let Some((css, found)) = discover_listings(&html, profile) else {
        log::warn!("No listings found on the results page");
        return Ok(BatchOutcome {
            batch: Batch::new(),
            interrupted: None,
        });
    };
    let total = found.min(options.max_results);
    log::info!("Found {found} listing(s) with '{css}', processing {total}");

    let ctx = ExtractContext {
        query: &options.query,
        base_url: &profile.base_url,
    };
    let mut batch = Batch::new();
    let mut interrupted = None;
    let mut page = Some(html);

    progress.set_total(u64::try_from(total).unwrap_or(u64::MAX));

    for index in 0..total {
        if options.cancel.load(Ordering::SeqCst) {
            log::warn!("Run cancelled after {} listing(s)", batch.len());
            interrupted = Some(SiteError::Cancelled);
            break;
        }

        progress.set_message(format!("listing {}/{total}", index + 1));

        // An agenda visit may re-render the results, so listings are
        // located again by index on a fresh snapshot.
        let html = match page.take().map_or_else(|| site.results_html(), Ok) {
            Ok(html) => html,
            Err(e) => {
                log::error!("Results page lost at listing {}: {e}", index + 1);
                interrupted = Some(e);
                break;
            }
        };

        let Some(mut record) = assemble_at(&html, &css, index, profile, ctx) else {
            log::warn!(
                "Listing {} is no longer on the results page, stopping",
                index + 1
            );
            break;
        };

        if options.visit_agenda {
            let listing = ListingRef {
                css: css.clone(),
                index,
            };
            if let Err(e) = collect_slots(site, &mut record, &listing, profile, ctx) {
                log::warn!("Agenda of listing {} unreadable: {e}", index + 1);
                record.mark_slots_error();
            }
        } else {
            page = Some(html);
        }

        if options.details {
            collect_detail(site, &mut record, profile, ctx);
        }

        log::info!(
            "Listing {}/{total}: {} ({} slot(s))",
            index + 1,
            record.name,
            record.slot_count
        );
        batch.push(record);
        progress.inc(1);
    }

    progress.finish(format!("{} listing(s) collected", batch.len()));

    Ok(BatchOutcome { batch, interrupted })
}

/// Returns the CSS query of the first listing locator that matches and the
/// number of listings it found.
fn discover_listings(html: &str, profile: &SiteProfile) -> Option<(String, usize)> {
    let doc = Html::parse_document(html);
    match resolve_nodes(&doc.root_element(), &profile.listings) {
        Ok(Some((index, nodes))) => profile.listings[index]
            .css
            .clone()
            .map(|css| (css, nodes.len())),
        Ok(None) => None,
        Err(e) => {
            log::warn!("Listing discovery faulted: {e}");
            None
        }
    }
}

fn assemble_at(
    html: &str,
    css: &str,
    index: usize,
    profile: &SiteProfile,
    ctx: ExtractContext<'_>,
) -> Option<ProviderRecord> {
    let doc = Html::parse_document(html);
    let nodes = doc
        .root_element()
        .find_all(css)
        .inspect_err(|e| log::warn!("Could not locate listings: {e}"))
        .ok()?;
    let node = nodes.get(index)?;

    Some(assemble_listing(
        node,
        &profile.fields,
        ctx,
        Local::now().naive_local(),
    ))
}

fn collect_slots<S: DirectorySite>(
    site: &mut S,
    record: &mut ProviderRecord,
    listing: &ListingRef,
    profile: &SiteProfile,
    ctx: ExtractContext<'_>,
) -> Result<(), SiteError> {
    let html = site.open_agenda(listing)?;
    let doc = Html::parse_document(&html);
    refresh_slots(record, &doc.root_element(), &profile.fields, ctx)?;
    Ok(())
}

fn collect_detail<S: DirectorySite>(
    site: &mut S,
    record: &mut ProviderRecord,
    profile: &SiteProfile,
    ctx: ExtractContext<'_>,
) {
    let no_link = profile
        .fields
        .get(FieldName::ProfileLink)
        .sentinel_for(ctx.query);
    if record.profile_link == no_link {
        log::debug!("'{}' has no profile link, skipping detail page", record.name);
        return;
    }

    match site.detail_html(&record.profile_link) {
        Ok(html) => {
            let doc = Html::parse_document(&html);
            augment_with_detail(record, &doc.root_element(), &profile.fields, ctx);
        }
        Err(e) => {
            log::warn!("Detail page of '{}' unavailable: {e}", record.name);
            reset_detail(record, &profile.fields, ctx);
        }
    }
}
