#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batch driver for provider directory searches.
//!
//! [`run_batch`] walks a search result page one listing at a time: it
//! assembles the listing record, optionally opens the listing's agenda to
//! collect visible slots and optionally follows the profile link to read the
//! detail fields. The page itself is reached through the [`DirectorySite`]
//! trait, implemented by the headless browser and by [`SnapshotSite`] for
//! saved pages.
//!
//! Faults are contained at the smallest scope: a failed agenda visit marks
//! that listing's slots as an error, a failed detail visit resets the three
//! detail fields. Only a failed search is fatal.

mod batch;
pub mod filters;
pub mod progress;
pub mod snapshot;

pub use batch::{BatchOutcome, RunOptions, run_batch};
pub use filters::{Filter, parse_filters};
pub use snapshot::SnapshotSite;

/// Identifies a listing on the live results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRef {
    /// CSS query that located the listings.
    pub css: String,
    /// Zero-based position among the matches of `css`.
    pub index: usize,
}

/// Navigation and page access for one directory site.
///
/// Every method blocks until the page has settled. Pacing delays and
/// element waits are the implementation's business; a wait that expires is
/// reported as an error.
pub trait DirectorySite {
    /// Opens the site, dismisses the cookie banner and submits a search.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError`] if the search form cannot be found or
    /// submitted.
    fn search(&mut self, query: &str, location: &str) -> Result<(), SiteError>;

    /// Scrolls the results until no more load.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError`] if the page cannot be scrolled.
    fn load_all_results(&mut self) -> Result<(), SiteError>;

    /// Applies one filter. Returns `false` when the site has no control for
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError`] if a control was found but interacting with it
    /// failed.
    fn apply_filter(&mut self, filter: &Filter) -> Result<bool, SiteError>;

    /// Rendered HTML of the results page.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError`] if the page cannot be read.
    fn results_html(&mut self) -> Result<String, SiteError>;

    /// Opens the listing's agenda, expands it and returns the rendered page.
    /// The results page is restored before returning.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError`] if the listing cannot be found or clicked.
    fn open_agenda(&mut self, listing: &ListingRef) -> Result<String, SiteError>;

    /// Loads a provider page in isolation and returns its rendered HTML.
    /// The results page is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError`] if navigation fails or the page never becomes
    /// ready.
    fn detail_html(&mut self, url: &str) -> Result<String, SiteError>;
}

/// Faults raised by a [`DirectorySite`].
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// An element did not appear within the wait timeout.
    #[error("timed out waiting for '{0}'")]
    Timeout(String),

    /// None of the candidate selectors matched.
    #[error("no element matched {0}")]
    NotFound(String),

    /// A page could not be loaded.
    #[error("navigation to {url} failed: {message}")]
    Navigation {
        /// Target of the navigation.
        url: String,
        /// Transport diagnostic.
        message: String,
    },

    /// The browser or its DevTools connection failed.
    #[error("browser error: {0}")]
    Browser(String),

    /// A rendered page could not be probed.
    #[error("page probe failed: {0}")]
    Probe(#[from] slot_scout_extract::ProbeError),

    /// The site cannot perform this operation.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// The run was cancelled by the user.
    #[error("run cancelled")]
    Cancelled,

    /// A local file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that end a run before any listing is processed.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The search could not be submitted.
    #[error("search setup failed: {0}")]
    Setup(#[source] SiteError),

    /// The results page could not be read.
    #[error("could not read the results page: {0}")]
    Results(#[source] SiteError),
}
