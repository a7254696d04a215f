#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Live directory site driven through headless Chrome.
//!
//! The browser is only used to navigate, click and wait. Whatever needs to
//! be read is taken as a rendered HTML snapshot ([`Tab::get_content`]) and
//! handed back to the driver, which parses it with `scraper`.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use slot_scout_driver::{DirectorySite, Filter, ListingRef, SiteError};
use slot_scout_extract::{NavigationProfile, SiteProfile};

/// Short pause between typing into consecutive fields.
const KEYSTROKE_PAUSE: Duration = Duration::from_secs(1);

/// How long the "show more slots" button is waited for.
const SHOW_MORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause after expanding an agenda.
const AGENDA_SETTLE: Duration = Duration::from_secs(2);

/// Browser launch and pacing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChromeOptions {
    /// Run without a visible window.
    pub headless: bool,
    /// Pause after each interaction so the page can render.
    pub delay: Duration,
    /// Upper bound on every element wait.
    pub timeout: Duration,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: false,
            delay: Duration::from_secs(2),
            timeout: Duration::from_secs(15),
        }
    }
}

/// A [`DirectorySite`] backed by a Chrome tab.
pub struct ChromeSite {
    browser: Browser,
    tab: Arc<Tab>,
    landing_url: String,
    navigation: NavigationProfile,
    options: ChromeOptions,
}

impl ChromeSite {
    /// Starts Chrome and opens a tab for `profile`'s site.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::Browser`] if Chrome cannot be found or started.
    pub fn launch(profile: &SiteProfile, options: ChromeOptions) -> Result<Self, SiteError> {
        let launch = LaunchOptions::default_builder()
            .headless(options.headless)
            .window_size(Some((1920, 1080)))
            .build()
            .map_err(|e| SiteError::Browser(e.to_string()))?;
        let browser = Browser::new(launch).map_err(browser_error)?;
        let tab = browser.new_tab().map_err(browser_error)?;
        tab.set_default_timeout(options.timeout);

        log::info!(
            "Chrome started ({})",
            if options.headless { "headless" } else { "windowed" }
        );

        Ok(Self {
            browser,
            tab,
            landing_url: profile.base_url.to_string(),
            navigation: profile.navigation.clone(),
            options,
        })
    }

    fn pause(&self) {
        thread::sleep(self.options.delay);
    }

    fn wait_for(&self, css: &str) -> Result<Element<'_>, SiteError> {
        self.tab
            .wait_for_element_with_custom_timeout(css, self.options.timeout)
            .map_err(|_| SiteError::Timeout(css.to_owned()))
    }

    /// First element matched by any of `candidates`, without waiting.
    fn find_first(&self, candidates: &[String]) -> Option<Element<'_>> {
        candidates.iter().find_map(|css| {
            self.tab
                .find_elements(css)
                .ok()
                .and_then(|found| found.into_iter().next())
        })
    }

    fn fill(&self, css: &str, text: &str) -> Result<(), SiteError> {
        let input = self.wait_for(css)?;
        input.click().map_err(browser_error)?;
        input
            .call_js_fn("function() { this.value = ''; }", vec![], false)
            .map_err(browser_error)?;
        input.type_into(text).map_err(browser_error)?;
        thread::sleep(KEYSTROKE_PAUSE);
        Ok(())
    }

    fn page_height(&self) -> Result<f64, SiteError> {
        let height = self
            .tab
            .evaluate("document.body.scrollHeight", false)
            .map_err(browser_error)?;
        Ok(height
            .value
            .and_then(|v| v.as_f64())
            .unwrap_or_default())
    }

    fn dismiss_cookie_banner(&self) {
        let Some(css) = &self.navigation.cookie_reject else {
            return;
        };
        match self.wait_for(css).and_then(|b| b.click().map(|_| ()).map_err(browser_error)) {
            Ok(()) => log::debug!("Cookie banner dismissed"),
            Err(e) => log::debug!("No cookie banner to dismiss: {e}"),
        }
    }

    /// Clicks the listing and reads the expanded agenda.
    fn expand_agenda(&self, listing: &ListingRef) -> Result<String, SiteError> {
        let listings = self.tab.find_elements(&listing.css).map_err(browser_error)?;
        let element = listings
            .get(listing.index)
            .ok_or_else(|| SiteError::NotFound(format!("{} #{}", listing.css, listing.index)))?;

        element.scroll_into_view().map_err(browser_error)?;
        thread::sleep(KEYSTROKE_PAUSE);
        element.click().map_err(browser_error)?;
        self.pause();

        let expanded = self.navigation.show_more_slots.iter().find_map(|css| {
            let button = self
                .tab
                .wait_for_element_with_custom_timeout(css, SHOW_MORE_TIMEOUT)
                .ok()?;
            button
                .call_js_fn("function() { this.click(); }", vec![], false)
                .ok()
        });
        if expanded.is_some() {
            log::debug!("Agenda expanded");
            thread::sleep(AGENDA_SETTLE);
        } else {
            log::debug!("No 'show more slots' button");
        }

        self.pause();
        self.tab.get_content().map_err(browser_error)
    }
}

impl DirectorySite for ChromeSite {
    fn search(&mut self, query: &str, location: &str) -> Result<(), SiteError> {
        navigate(&self.tab, &self.landing_url)?;
        self.dismiss_cookie_banner();

        self.fill(&self.navigation.query_input, query)?;
        self.fill(&self.navigation.place_input, location)?;
        self.wait_for(&self.navigation.submit)?
            .click()
            .map_err(browser_error)?;
        self.pause();

        log::info!("Search submitted, results at {}", self.tab.get_url());
        Ok(())
    }

    fn load_all_results(&mut self) -> Result<(), SiteError> {
        let mut last_height = self.page_height()?;

        for round in 1..=self.navigation.max_scroll_rounds {
            self.tab
                .evaluate("window.scrollTo(0, document.body.scrollHeight);", false)
                .map_err(browser_error)?;
            self.pause();

            let height = self.page_height()?;
            if (height - last_height).abs() < f64::EPSILON {
                log::debug!("Results fully loaded after {round} scroll(s)");
                return Ok(());
            }
            last_height = height;
        }

        log::warn!(
            "Results still growing after {} scrolls",
            self.navigation.max_scroll_rounds
        );
        Ok(())
    }

    fn apply_filter(&mut self, filter: &Filter) -> Result<bool, SiteError> {
        let Some(controls) = self.navigation.filters.get(&filter.key) else {
            return Ok(false);
        };
        let Some(toggle) = self.find_first(&controls.toggle) else {
            return Err(SiteError::NotFound(controls.toggle.join(" | ")));
        };
        toggle.click().map_err(browser_error)?;
        self.pause();

        let Some(value) = &filter.value else {
            return Ok(true);
        };
        let options = self
            .tab
            .find_elements("button, label, li, [role='option']")
            .map_err(browser_error)?;
        let option = options
            .iter()
            .find(|o| o.get_inner_text().is_ok_and(|t| option_matches(&t, value)))
            .ok_or_else(|| SiteError::NotFound(format!("filter option '{value}'")))?;
        option.click().map_err(browser_error)?;
        self.pause();

        Ok(true)
    }

    fn results_html(&mut self) -> Result<String, SiteError> {
        self.tab.get_content().map_err(browser_error)
    }

    fn open_agenda(&mut self, listing: &ListingRef) -> Result<String, SiteError> {
        let results_url = self.tab.get_url();
        let agenda = self.expand_agenda(listing);

        if self.tab.get_url() != results_url {
            self.tab
                .evaluate("window.history.back();", false)
                .and_then(|_| self.tab.wait_until_navigated().map(|_| ()))
                .map_err(browser_error)?;
            self.pause();
        }

        agenda
    }

    fn detail_html(&mut self, url: &str) -> Result<String, SiteError> {
        let tab = self.browser.new_tab().map_err(browser_error)?;
        tab.set_default_timeout(self.options.timeout);

        let content = navigate(&tab, url).and_then(|()| {
            if let Some(css) = &self.navigation.detail_ready {
                tab.wait_for_element_with_custom_timeout(css, self.options.timeout)
                    .map_err(|_| SiteError::Timeout(css.clone()))?;
            }
            self.pause();
            tab.get_content().map_err(browser_error)
        });

        if let Err(e) = tab.close(false) {
            log::debug!("Could not close detail tab: {e}");
        }
        content
    }
}

fn navigate(tab: &Tab, url: &str) -> Result<(), SiteError> {
    tab.navigate_to(url)
        .and_then(Tab::wait_until_navigated)
        .map_err(|e| SiteError::Navigation {
            url: url.to_owned(),
            message: e.to_string(),
        })?;
    Ok(())
}

#[allow(clippy::needless_pass_by_value)]
fn browser_error<E: std::fmt::Display>(e: E) -> SiteError {
    SiteError::Browser(e.to_string())
}

/// Whether a filter option's label names `value`.
fn option_matches(label: &str, value: &str) -> bool {
    let label = label.trim().to_lowercase();
    !label.is_empty() && label.contains(&value.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_matching_ignores_case_and_padding() {
        assert!(option_matches("  Anglais ", "anglais"));
        assert!(option_matches("Parle anglais", "Anglais"));
        assert!(!option_matches("Espagnol", "Anglais"));
        assert!(!option_matches("   ", "Anglais"));
    }

    #[test]
    fn default_options_match_the_cli_defaults() {
        let options = ChromeOptions::default();
        assert!(!options.headless);
        assert_eq!(options.delay, Duration::from_secs(2));
        assert_eq!(options.timeout, Duration::from_secs(15));
    }
}
