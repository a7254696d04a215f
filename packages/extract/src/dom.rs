//! Element probing abstraction.
//!
//! [`Node`] is the only surface the extractors need from a page: query
//! descendants, test a selector, read text or an attribute, and step to the
//! parent. Absence is an empty `Vec` or `None`; `Err` is reserved for faults
//! of the underlying page layer.

use scraper::{ElementRef, Selector};

use crate::ProbeError;

/// An element of a page that can be probed.
pub trait Node: Clone {
    /// All descendants matching `css`, in document order. The element
    /// itself is never included.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the selector is invalid or the page layer
    /// faults.
    fn find_all(&self, css: &str) -> Result<Vec<Self>, ProbeError>;

    /// Whether the element itself matches `css`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the selector is invalid or the page layer
    /// faults.
    fn is_match(&self, css: &str) -> Result<bool, ProbeError>;

    /// Full text content of the element and its descendants, with a space
    /// at every non-inline element boundary.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the page layer faults.
    fn read_text(&self) -> Result<String, ProbeError>;

    /// Text of the element's direct text children only.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the page layer faults.
    fn read_own_text(&self) -> Result<String, ProbeError>;

    /// Value of attribute `name`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the page layer faults.
    fn read_attr(&self, name: &str) -> Result<Option<String>, ProbeError>;

    /// The parent element, or `None` at the document root.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the page layer faults.
    fn parent_node(&self) -> Result<Option<Self>, ProbeError>;
}

/// Parses a CSS selector, mapping the parser error into a [`ProbeError`].
///
/// # Errors
///
/// Returns [`ProbeError::InvalidSelector`] if `css` does not parse.
pub fn parse_selector(css: &str) -> Result<Selector, ProbeError> {
    Selector::parse(css).map_err(|e| ProbeError::InvalidSelector {
        selector: css.to_owned(),
        message: e.to_string(),
    })
}

/// Phrasing elements whose text runs on with the surrounding text.
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "cite", "code", "em", "i", "mark", "q", "s", "small", "span", "strong",
    "sub", "sup", "time", "u",
];

/// Trims and collapses internal whitespace runs to single spaces.
#[must_use]
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Node for ElementRef<'_> {
    fn find_all(&self, css: &str) -> Result<Vec<Self>, ProbeError> {
        let selector = parse_selector(css)?;
        Ok(self.select(&selector).collect())
    }

    fn is_match(&self, css: &str) -> Result<bool, ProbeError> {
        let selector = parse_selector(css)?;
        Ok(selector.matches(self))
    }

    fn read_text(&self) -> Result<String, ProbeError> {
        let mut text = String::new();
        push_rendered_text(*self, &mut text);
        Ok(text)
    }

    fn read_own_text(&self) -> Result<String, ProbeError> {
        Ok(self
            .children()
            .filter_map(|child| child.value().as_text())
            .map(|text| &**text)
            .collect())
    }

    fn read_attr(&self, name: &str) -> Result<Option<String>, ProbeError> {
        Ok(self.value().attr(name).map(str::to_owned))
    }

    fn parent_node(&self) -> Result<Option<Self>, ProbeError> {
        Ok(self.parent().and_then(ElementRef::wrap))
    }
}

/// Appends the text under `element`, separating block-level children so
/// `<div>à 1,2 km</div><div>Conventionné</div>` does not read as one word.
fn push_rendered_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            let inline = INLINE_TAGS.contains(&child.value().name());
            if !inline {
                out.push(' ');
            }
            push_rendered_text(child, out);
            if !inline {
                out.push(' ');
            }
        }
    }
}
