#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Resilient field extraction for provider directory listings.
//!
//! Directory markup is unstable: generated class names change between
//! deployments and the same generic tag carries unrelated fragments. Every
//! output field is therefore described as data in a [`profile::SiteProfile`]:
//! an ordered chain of [`locator::Locator`]s (most specific first), a
//! [`classify::Classifier`] that rejects false positives, and a sentinel used
//! when nothing is accepted.
//!
//! A single generic loop ([`resolver::resolve_values`]) drives every field,
//! and [`assembler`] merges the results into a
//! [`slot_scout_listing_models::ProviderRecord`].
//!
//! Pages are probed through the [`dom::Node`] trait. The bundled
//! implementation works on `scraper` documents, which is how rendered
//! browser snapshots and saved pages are read.

pub mod assembler;
pub mod classify;
pub mod dom;
pub mod fields;
pub mod locator;
pub mod profile;
pub mod resolver;

pub use assembler::{
    ExtractContext, assemble_listing, augment_with_detail, refresh_slots, reset_detail,
};
pub use dom::Node;
pub use locator::Locator;
pub use profile::{FieldSpec, FieldTable, NavigationProfile, SiteProfile, default_profile};

/// A fault raised while probing the page.
///
/// "Nothing matched" is never a `ProbeError`; it is an empty match set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// A CSS selector could not be parsed.
    #[error("invalid CSS selector '{selector}': {message}")]
    InvalidSelector {
        /// The offending selector.
        selector: String,
        /// Parser diagnostic.
        message: String,
    },

    /// The page-interaction layer failed for a reason other than absence
    /// (stale reference, detached frame, transport error).
    #[error("page backend error: {0}")]
    Backend(String),
}

/// Errors raised while loading a site profile.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// The profile file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The profile is not valid TOML or does not match the schema.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The profile does not declare a spec for this field.
    #[error("no spec declared for field '{0}'")]
    MissingField(slot_scout_listing_models::FieldName),

    /// The listing locator chain is empty.
    #[error("profile declares no listing locators")]
    NoListingLocators,

    /// A field written as text declares no sentinel.
    #[error("field '{0}' declares no sentinel")]
    MissingSentinel(slot_scout_listing_models::FieldName),

    /// A field declares no locators.
    #[error("field '{0}' declares no locators")]
    NoLocators(slot_scout_listing_models::FieldName),

    /// A locator is malformed.
    #[error("{context}: {source}")]
    Locator {
        /// Where the locator was declared.
        context: String,
        /// What is wrong with it.
        source: ProbeError,
    },

    /// A classifier pattern does not compile.
    #[error("field '{field}': invalid pattern: {source}")]
    Pattern {
        /// Field whose classifier failed.
        field: slot_scout_listing_models::FieldName,
        /// Regex diagnostic.
        source: regex::Error,
    },

    /// The base URL does not parse.
    #[error("invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
}
