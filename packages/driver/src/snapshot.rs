//! Offline site backed by a saved results page.

use std::path::Path;

use crate::filters::Filter;
use crate::{DirectorySite, ListingRef, SiteError};

/// A [`DirectorySite`] that serves one saved HTML page.
///
/// Searching and scrolling are no-ops, filters cannot be applied and
/// listings have no live agenda or detail page.
#[derive(Debug, Clone)]
pub struct SnapshotSite {
    html: String,
}

impl SnapshotSite {
    #[must_use]
    pub const fn new(html: String) -> Self {
        Self { html }
    }

    /// Reads the page from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::Io`] if the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self, SiteError> {
        let html = std::fs::read_to_string(path)?;
        log::info!("Loaded snapshot {} ({} bytes)", path.display(), html.len());
        Ok(Self::new(html))
    }
}

impl DirectorySite for SnapshotSite {
    fn search(&mut self, query: &str, location: &str) -> Result<(), SiteError> {
        log::debug!("Snapshot mode: skipping search for '{query}' in '{location}'");
        Ok(())
    }

    fn load_all_results(&mut self) -> Result<(), SiteError> {
        Ok(())
    }

    fn apply_filter(&mut self, filter: &Filter) -> Result<bool, SiteError> {
        log::warn!("Filter '{filter}' cannot be applied to a saved page");
        Ok(false)
    }

    fn results_html(&mut self) -> Result<String, SiteError> {
        Ok(self.html.clone())
    }

    fn open_agenda(&mut self, _listing: &ListingRef) -> Result<String, SiteError> {
        Err(SiteError::Unsupported("agenda visits on a saved page"))
    }

    fn detail_html(&mut self, _url: &str) -> Result<String, SiteError> {
        Err(SiteError::Unsupported("detail pages on a saved page"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_the_page_from_disk() {
        let path = std::env::temp_dir().join("slot_scout_snapshot_test.html");
        std::fs::write(&path, "<html><body><h2>Dr Martin</h2></body></html>").unwrap();

        let mut site = SnapshotSite::from_file(&path).unwrap();
        assert!(site.results_html().unwrap().contains("Dr Martin"));
        assert!(!site.apply_filter(&Filter {
            key: "disponibilites".into(),
            value: None
        })
        .unwrap());
        assert!(site.detail_html("https://www.doctolib.fr/x").is_err());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("slot_scout_no_such_snapshot.html");
        assert!(matches!(SnapshotSite::from_file(&path), Err(SiteError::Io(_))));
    }
}
