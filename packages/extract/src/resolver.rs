//! Locator chain resolution.
//!
//! Locators are tried in declaration order and the first one that yields
//! something wins. Later locators are never evaluated once one succeeds.

use slot_scout_listing_models::ExtractionResult;

use crate::ProbeError;
use crate::classify::Classifier;
use crate::dom::Node;
use crate::locator::Locator;

/// Elements matched by the first locator with a non-empty match set,
/// together with that locator's index.
///
/// # Errors
///
/// Returns [`ProbeError`] if the page layer faults.
pub fn resolve_nodes<N: Node>(
    scope: &N,
    locators: &[Locator],
) -> Result<Option<(usize, Vec<N>)>, ProbeError> {
    for (index, locator) in locators.iter().enumerate() {
        let nodes = locator.select(scope)?;
        if !nodes.is_empty() {
            log::trace!("locator #{index} matched {} element(s)", nodes.len());
            return Ok(Some((index, nodes)));
        }
    }
    Ok(None)
}

/// First accepted value from the first locator that yields one.
///
/// # Errors
///
/// Returns [`ProbeError`] if the page layer faults.
pub fn resolve<N: Node>(
    scope: &N,
    locators: &[Locator],
    classifier: &Classifier,
) -> Result<ExtractionResult, ProbeError> {
    let values = resolve_values(scope, locators, classifier, 1)?;
    Ok(values
        .into_iter()
        .next()
        .map_or(ExtractionResult::NotFound, ExtractionResult::Found))
}

/// Distinct accepted values from the first locator that yields any, capped at
/// `limit`.
///
/// A locator whose candidates are all blank or rejected by `classifier`
/// counts as not matching, and the chain moves on. An empty result means no
/// locator produced an accepted value.
///
/// # Errors
///
/// Returns [`ProbeError`] if the page layer faults.
pub fn resolve_values<N: Node>(
    scope: &N,
    locators: &[Locator],
    classifier: &Classifier,
    limit: usize,
) -> Result<Vec<String>, ProbeError> {
    let limit = limit.max(1);

    for (index, locator) in locators.iter().enumerate() {
        let mut accepted: Vec<String> = Vec::new();
        for node in locator.select(scope)? {
            let Some(text) = locator.read(&node)? else {
                continue;
            };
            let Some(value) = classifier.classify(&text) else {
                log::trace!("locator #{index} rejected '{text}'");
                continue;
            };
            if !accepted.contains(&value) {
                accepted.push(value);
                if accepted.len() == limit {
                    break;
                }
            }
        }
        if !accepted.is_empty() {
            return Ok(accepted);
        }
    }

    Ok(Vec::new())
}
