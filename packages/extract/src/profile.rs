//! Site profiles: the data-driven field table and navigation selectors.
//!
//! A profile is a TOML document. The default Doctolib profile is baked into
//! the binary at compile time via [`include_str!`]; a patched copy can be
//! loaded with [`load_profile`] when the site's markup drifts, without a
//! rebuild.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use slot_scout_listing_models::{ExtractionResult, FieldName};
use strum::IntoEnumIterator as _;
use url::Url;

use crate::classify::{Classifier, ClassifierDef};
use crate::dom::{Node, parse_selector};
use crate::locator::Locator;
use crate::resolver::{resolve, resolve_values};
use crate::{ProbeError, ProfileError};

/// The profile embedded at compile time.
const DEFAULT_PROFILE_TOML: &str = include_str!("../sites/doctolib.toml");

/// Placeholder replaced by the search query in sentinels.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Default cap on accepted values for a field.
const fn default_limit() -> usize {
    1
}

fn default_joiner() -> String {
    ", ".to_owned()
}

const fn default_max_scroll_rounds() -> u32 {
    20
}

// ── Declared (TOML) shapes ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SiteProfileDef {
    id: String,
    name: String,
    base_url: String,
    navigation: NavigationProfile,
    listings: Vec<Locator>,
    #[serde(default)]
    fields: BTreeMap<FieldName, FieldSpecDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldSpecDef {
    locators: Vec<Locator>,
    #[serde(default)]
    sentinel: String,
    #[serde(default)]
    classifier: ClassifierDef,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default = "default_joiner")]
    joiner: String,
}

/// Selectors the navigation layer needs to drive a search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavigationProfile {
    /// Button dismissing the cookie banner, if the site shows one.
    #[serde(default)]
    pub cookie_reject: Option<String>,
    /// Search query input.
    pub query_input: String,
    /// Location input.
    pub place_input: String,
    /// Search submit button.
    pub submit: String,
    /// Buttons expanding the agenda on a listing page, tried in order.
    #[serde(default)]
    pub show_more_slots: Vec<String>,
    /// Element whose presence marks a loaded detail page.
    #[serde(default)]
    pub detail_ready: Option<String>,
    /// Upper bound on infinite-scroll rounds while loading results.
    #[serde(default = "default_max_scroll_rounds")]
    pub max_scroll_rounds: u32,
    /// Filter controls keyed by filter name (e.g. `disponibilites`).
    #[serde(default)]
    pub filters: BTreeMap<String, FilterControls>,
}

/// Controls for one result filter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterControls {
    /// Elements opening or toggling the filter, tried in order.
    pub toggle: Vec<String>,
}

impl NavigationProfile {
    fn validate(&self) -> Result<(), ProfileError> {
        let fixed = [&self.query_input, &self.place_input, &self.submit];
        let optional = self.cookie_reject.iter().chain(self.detail_ready.iter());
        let lists = self
            .show_more_slots
            .iter()
            .chain(self.filters.values().flat_map(|f| f.toggle.iter()));

        for css in fixed.into_iter().chain(optional).chain(lists) {
            parse_selector(css).map_err(|source| ProfileError::Locator {
                context: "navigation".to_owned(),
                source,
            })?;
        }
        Ok(())
    }
}

// ── Compiled shapes ──────────────────────────────────────────────────────

/// One field's extraction rules.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Locators in preference order.
    pub locators: Vec<Locator>,
    /// Filter applied to every candidate fragment.
    pub classifier: Classifier,
    /// Value used when nothing is accepted. May contain
    /// [`QUERY_PLACEHOLDER`]. Empty for typed columns.
    pub sentinel: String,
    /// Maximum number of distinct values kept.
    pub limit: usize,
    /// Separator used when several values are joined into one column.
    pub joiner: String,
}

impl FieldSpec {
    /// The sentinel with the search query substituted.
    #[must_use]
    pub fn sentinel_for(&self, query: &str) -> String {
        self.sentinel.replace(QUERY_PLACEHOLDER, query)
    }

    /// Accepted values for this field within `scope`; empty when nothing
    /// matched.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the page layer faults.
    pub fn extract<N: Node>(&self, scope: &N) -> Result<Vec<String>, ProbeError> {
        resolve_values(scope, &self.locators, &self.classifier, self.limit)
    }

    /// The first accepted value for this field within `scope`, ignoring
    /// the limit.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the page layer faults.
    pub fn extract_first<N: Node>(&self, scope: &N) -> Result<ExtractionResult, ProbeError> {
        resolve(scope, &self.locators, &self.classifier)
    }
}

/// A complete field table: one [`FieldSpec`] per [`FieldName`].
#[derive(Debug, Clone)]
pub struct FieldTable {
    specs: BTreeMap<FieldName, FieldSpec>,
}

impl FieldTable {
    fn compile(mut defs: BTreeMap<FieldName, FieldSpecDef>) -> Result<Self, ProfileError> {
        let mut specs = BTreeMap::new();

        for field in FieldName::iter() {
            let def = defs.remove(&field).ok_or(ProfileError::MissingField(field))?;
            if def.locators.is_empty() {
                return Err(ProfileError::NoLocators(field));
            }
            if field.uses_sentinel() && def.sentinel.is_empty() {
                return Err(ProfileError::MissingSentinel(field));
            }
            for (i, locator) in def.locators.iter().enumerate() {
                locator.validate().map_err(|source| ProfileError::Locator {
                    context: format!("field '{field}' locator #{i}"),
                    source,
                })?;
            }
            let classifier = Classifier::compile(&def.classifier)
                .map_err(|source| ProfileError::Pattern { field, source })?;

            specs.insert(
                field,
                FieldSpec {
                    locators: def.locators,
                    classifier,
                    sentinel: def.sentinel,
                    limit: def.limit.max(1),
                    joiner: def.joiner,
                },
            );
        }

        Ok(Self { specs })
    }

    /// The spec for `field`. Every field is present once compiled.
    #[must_use]
    pub fn get(&self, field: FieldName) -> &FieldSpec {
        &self.specs[&field]
    }

    /// Overrides the value cap of `field`.
    #[must_use]
    pub fn with_limit(mut self, field: FieldName, limit: usize) -> Self {
        if let Some(spec) = self.specs.get_mut(&field) {
            spec.limit = limit.max(1);
        }
        self
    }
}

/// A directory site: where to go, how to search, what to extract.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// Short identifier (e.g. `"doctolib"`).
    pub id: String,
    /// Human-readable site name.
    pub name: String,
    /// Landing page; also the base for relative profile links.
    pub base_url: Url,
    /// Search and interaction selectors.
    pub navigation: NavigationProfile,
    /// Locators for listing elements on the result page.
    pub listings: Vec<Locator>,
    /// Field extraction rules.
    pub fields: FieldTable,
}

/// Parses and validates a profile from TOML text.
///
/// # Errors
///
/// Returns [`ProfileError`] if the TOML is malformed, a field is missing, a
/// selector does not parse or a pattern does not compile.
pub fn parse_profile_toml(toml_str: &str) -> Result<SiteProfile, ProfileError> {
    let def: SiteProfileDef = toml::de::from_str(toml_str)?;

    if def.listings.is_empty() {
        return Err(ProfileError::NoListingLocators);
    }
    for (i, locator) in def.listings.iter().enumerate() {
        let context = format!("listing locator #{i}");
        if !locator.is_plain_css() {
            return Err(ProfileError::Locator {
                context,
                source: ProbeError::InvalidSelector {
                    selector: format!("{locator:?}"),
                    message: "listing locators must be a bare CSS query".to_owned(),
                },
            });
        }
        locator
            .validate()
            .map_err(|source| ProfileError::Locator { context, source })?;
    }
    def.navigation.validate()?;

    Ok(SiteProfile {
        id: def.id,
        name: def.name,
        base_url: Url::parse(&def.base_url)?,
        navigation: def.navigation,
        listings: def.listings,
        fields: FieldTable::compile(def.fields)?,
    })
}

/// Reads a profile from a TOML file.
///
/// # Errors
///
/// Returns [`ProfileError`] if the file cannot be read or does not validate.
pub fn load_profile(path: &Path) -> Result<SiteProfile, ProfileError> {
    let toml_str = std::fs::read_to_string(path)?;
    let profile = parse_profile_toml(&toml_str)?;
    log::info!("Loaded site profile '{}' from {}", profile.id, path.display());
    Ok(profile)
}

/// The embedded Doctolib profile.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (checked by the test suite).
#[must_use]
pub fn default_profile() -> SiteProfile {
    parse_profile_toml(DEFAULT_PROFILE_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded doctolib.toml: {e}"))
}
