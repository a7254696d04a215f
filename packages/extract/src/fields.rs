//! Typed normalization of extracted fragments.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("valid regex"));

static POSTAL_CITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{5})\s+([^,\d]+)").expect("valid regex"));

/// Keyword marking a conventioned provider, lowercased without its final
/// accent so both spellings match.
const CONVENTIONED_KEYWORD: &str = "conventionn";

/// Parses a rating such as `"4,8"` or `"4.8 (120 avis)"`.
///
/// Returns `None` for blank or non-numeric text. A missing rating is never
/// reported as zero.
#[must_use]
pub fn parse_rating(text: &str) -> Option<f64> {
    let number = DECIMAL.find(text)?.as_str().replace(',', ".");
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whether a fragment states conventioning.
#[must_use]
pub fn is_conventioned(fragment: &str) -> bool {
    fragment.to_lowercase().contains(CONVENTIONED_KEYWORD)
}

/// Splits the postal code and city out of an address such as
/// `"12 Rue de Paris, 75015 Paris"`.
#[must_use]
pub fn postal_code_and_city(address: &str) -> Option<(String, String)> {
    let caps = POSTAL_CITY.captures(address)?;
    let city = caps[2].trim();
    if city.is_empty() {
        return None;
    }
    Some((caps[1].to_owned(), city.to_owned()))
}

/// Resolves a possibly relative profile link against the site base URL.
///
/// Links that cannot be joined are returned unchanged.
#[must_use]
pub fn absolute_link(base: &Url, href: &str) -> String {
    base.join(href).map_or_else(|_| href.to_owned(), String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rating(text: &str, expected: f64) {
        let rating = parse_rating(text).unwrap();
        assert!((rating - expected).abs() < f64::EPSILON, "{text} -> {rating}");
    }

    #[test]
    fn rating_accepts_comma_decimals() {
        assert_rating("4,8", 4.8);
        assert_rating("4.5", 4.5);
        assert_rating("Note : 5 (32 avis)", 5.0);
    }

    #[test]
    fn rating_absent_is_none_not_zero() {
        assert_eq!(parse_rating(""), None);
        assert_eq!(parse_rating("pas encore noté"), None);
    }

    #[test]
    fn conventioning_is_case_insensitive() {
        assert!(is_conventioned("Conventionné secteur 1"));
        assert!(is_conventioned("CONVENTIONNÉ"));
        assert!(is_conventioned("conventionne secteur 2"));
        assert!(!is_conventioned("Honoraires libres"));
    }

    #[test]
    fn splits_postal_code_and_city() {
        assert_eq!(
            postal_code_and_city("12 Rue de Paris, 75015 Paris"),
            Some(("75015".to_string(), "Paris".to_string()))
        );
        assert_eq!(
            postal_code_and_city("Centre médical, 69003 Lyon 3e"),
            Some(("69003".to_string(), "Lyon".to_string()))
        );
        assert_eq!(postal_code_and_city("Adresse non trouvée"), None);
    }

    #[test]
    fn joins_relative_links() {
        let base = Url::parse("https://www.doctolib.fr/").unwrap();
        assert_eq!(
            absolute_link(&base, "/cardiologue/paris/dr-martin"),
            "https://www.doctolib.fr/cardiologue/paris/dr-martin"
        );
        assert_eq!(
            absolute_link(&base, "https://example.org/x"),
            "https://example.org/x"
        );
    }
}
