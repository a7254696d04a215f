//! Structural locators.
//!
//! A [`Locator`] selects elements relative to a scope:
//!
//! 1. `css` and/or `text` pick the starting elements. With neither, the scope
//!    itself is the only candidate.
//! 2. `up` walks that many ancestors (at most [`MAX_HOPS`]).
//! 3. `then` selects from there: the ancestor itself if it matches,
//!    otherwise its matching descendants.
//! 4. `attr` reads an attribute instead of the text content.

use serde::Deserialize;

use crate::ProbeError;
use crate::dom::{Node, normalize_text, parse_selector};

/// Maximum number of ancestor hops a locator may take.
pub const MAX_HOPS: u8 = 2;

/// A selection rule evaluated against a scope element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Locator {
    /// CSS query for the starting elements.
    #[serde(default)]
    pub css: Option<String>,
    /// Case-insensitive substring the element's own text must contain.
    #[serde(default)]
    pub text: Option<String>,
    /// Ancestor hops taken from each starting element.
    #[serde(default)]
    pub up: u8,
    /// CSS query applied after the upward walk.
    #[serde(default)]
    pub then: Option<String>,
    /// Attribute to read instead of the text content.
    #[serde(default)]
    pub attr: Option<String>,
}

impl Locator {
    /// Whether this is a CSS query with no walk, text filter or attribute.
    #[must_use]
    pub const fn is_plain_css(&self) -> bool {
        self.css.is_some()
            && self.text.is_none()
            && self.up == 0
            && self.then.is_none()
            && self.attr.is_none()
    }

    /// Checks the selectors parse and the walk is within bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidSelector`] for an unparseable selector or
    /// an out-of-bounds walk.
    pub fn validate(&self) -> Result<(), ProbeError> {
        for css in self.css.iter().chain(self.then.iter()) {
            parse_selector(css)?;
        }
        if self.up > MAX_HOPS {
            return Err(ProbeError::InvalidSelector {
                selector: format!("up = {}", self.up),
                message: format!("at most {MAX_HOPS} ancestor hops are allowed"),
            });
        }
        Ok(())
    }

    /// Elements selected by this locator within `scope`, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the page layer faults.
    pub fn select<N: Node>(&self, scope: &N) -> Result<Vec<N>, ProbeError> {
        let mut starts = match (&self.css, &self.text) {
            (None, None) => vec![scope.clone()],
            (Some(css), _) => scope.find_all(css)?,
            (None, Some(_)) => scope.find_all("*")?,
        };

        if let Some(needle) = &self.text {
            let needle = needle.to_lowercase();
            let mut kept = Vec::with_capacity(starts.len());
            for node in starts {
                if node.read_own_text()?.to_lowercase().contains(&needle) {
                    kept.push(node);
                }
            }
            starts = kept;
        }

        if self.up == 0 && self.then.is_none() {
            return Ok(starts);
        }

        let mut selected = Vec::new();
        'nodes: for node in starts {
            let mut anchor = node;
            for _ in 0..self.up {
                match anchor.parent_node()? {
                    Some(parent) => anchor = parent,
                    None => continue 'nodes,
                }
            }
            match &self.then {
                None => selected.push(anchor),
                Some(css) if anchor.is_match(css)? => selected.push(anchor),
                Some(css) => selected.extend(anchor.find_all(css)?),
            }
        }
        Ok(selected)
    }

    /// Reads the value this locator targets from `node`, normalized.
    ///
    /// Returns `None` when the attribute is absent or the text is blank.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the page layer faults.
    pub fn read<N: Node>(&self, node: &N) -> Result<Option<String>, ProbeError> {
        let raw = match &self.attr {
            Some(name) => node.read_attr(name)?,
            None => Some(node.read_text()?),
        };
        Ok(raw.map(|r| normalize_text(&r)).filter(|t| !t.is_empty()))
    }
}

#[cfg(test)]
impl Locator {
    /// A locator matching `css` descendants of the scope.
    #[must_use]
    pub fn css(css: &str) -> Self {
        Self {
            css: Some(css.to_owned()),
            ..Self::default()
        }
    }

    /// A locator matching descendants whose own text contains `needle`.
    #[must_use]
    pub fn containing(needle: &str) -> Self {
        Self {
            text: Some(needle.to_owned()),
            ..Self::default()
        }
    }

    /// A locator targeting the scope element itself.
    #[must_use]
    pub fn scope() -> Self {
        Self::default()
    }

    /// Walks `up` ancestors, then selects `then` from there.
    #[must_use]
    pub fn walk(mut self, up: u8, then: &str) -> Self {
        self.up = up;
        self.then = Some(then.to_owned());
        self
    }

    /// Reads attribute `name` instead of the text content.
    #[must_use]
    pub fn read_attr(mut self, name: &str) -> Self {
        self.attr = Some(name.to_owned());
        self
    }
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    const LISTING: &str = r#"
        <article class="result">
          <a href="/medecin/paris/dr-martin"><h2>Dr Martin</h2></a>
          <div class="row">
            <svg data-icon-name="regular/location-dot"></svg><span>icon</span>
          </div>
          <div class="meta">
            <div class="icon-wrap"><svg data-icon-name="regular/euro-sign"></svg></div>
            <p>Conventionné secteur 1</p>
          </div>
          <span>à 1,2 km</span>
        </article>"#;

    fn texts<N: Node>(locator: &Locator, scope: &N) -> Vec<String> {
        locator
            .select(scope)
            .unwrap()
            .iter()
            .filter_map(|n| locator.read(n).unwrap())
            .collect()
    }

    #[test]
    fn css_locator_reads_text() {
        let doc = Html::parse_fragment(LISTING);
        assert_eq!(texts(&Locator::css("h2"), &doc.root_element()), ["Dr Martin"]);
    }

    #[test]
    fn scope_locator_reads_the_scope_itself() {
        let doc = Html::parse_fragment(LISTING);
        let link = doc.root_element().find_all("a").unwrap()[0];
        let locator = Locator::scope().read_attr("href");
        assert_eq!(texts(&locator, &link), ["/medecin/paris/dr-martin"]);
    }

    #[test]
    fn walk_up_then_down() {
        let doc = Html::parse_fragment(LISTING);
        let locator = Locator::css("svg[data-icon-name='regular/euro-sign']").walk(2, "p");
        assert_eq!(
            texts(&locator, &doc.root_element()),
            ["Conventionné secteur 1"]
        );
    }

    #[test]
    fn walk_target_may_be_the_ancestor_itself() {
        let doc = Html::parse_fragment(LISTING);
        let locator = Locator::css("h2").walk(1, "a[href]").read_attr("href");
        assert_eq!(
            texts(&locator, &doc.root_element()),
            ["/medecin/paris/dr-martin"]
        );
    }

    #[test]
    fn text_filter_is_case_insensitive() {
        let doc = Html::parse_fragment(LISTING);
        let locator = Locator::containing("CONVENTIONNÉ");
        assert_eq!(
            texts(&locator, &doc.root_element()),
            ["Conventionné secteur 1"]
        );
    }

    #[test]
    fn absent_attribute_reads_as_none() {
        let doc = Html::parse_fragment(LISTING);
        let locator = Locator::css("h2").read_attr("href");
        assert!(texts(&locator, &doc.root_element()).is_empty());
    }

    #[test]
    fn validation_rejects_deep_walks_and_bad_css() {
        assert!(Locator::css("p").walk(2, "a").validate().is_ok());
        assert!(Locator::css("p").walk(3, "a").validate().is_err());
        assert!(Locator::css("p:contains('x')").validate().is_err());
        assert!(Locator::css("p").walk(1, "a[").validate().is_err());
    }

    #[test]
    fn deserializes_from_toml() {
        let locator: Locator =
            toml::from_str("css = \"h2\"\nup = 1\nthen = \"a[href]\"\nattr = \"href\"").unwrap();
        assert_eq!(locator, Locator::css("h2").walk(1, "a[href]").read_attr("href"));
    }
}
