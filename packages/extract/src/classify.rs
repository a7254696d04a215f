//! Text classifiers that reject false-positive candidates.
//!
//! The same generic tag often carries unrelated fragments (a `<p>` may hold
//! the specialty, a street line or a distance). A [`Classifier`] decides
//! whether a normalized fragment belongs to its field and optionally trims
//! it down to the matching part.

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

/// Classifier as declared in a site profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierDef {
    /// Whole-word keywords; a fragment containing one is accepted.
    #[serde(default)]
    pub require_any: Vec<String>,
    /// Pattern; a fragment matching it is accepted.
    #[serde(default)]
    pub require_pattern: Option<String>,
    /// Whole-word keywords that reject a fragment.
    #[serde(default)]
    pub reject_any: Vec<String>,
    /// Pattern that rejects a fragment.
    #[serde(default)]
    pub reject_pattern: Option<String>,
    /// Minimum length in characters.
    #[serde(default)]
    pub min_len: usize,
    /// Pattern whose first match replaces the fragment. Fragments without a
    /// match are rejected.
    #[serde(default)]
    pub capture: Option<String>,
}

/// Compiled [`ClassifierDef`].
///
/// When both `require_any` and `require_pattern` are set, matching either
/// one is enough. With neither set, every fragment that passes the reject
/// rules is accepted.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    require_keywords: Option<Regex>,
    require_pattern: Option<Regex>,
    reject_keywords: Option<Regex>,
    reject_pattern: Option<Regex>,
    min_len: usize,
    capture: Option<Regex>,
}

impl Classifier {
    /// A classifier that accepts every non-empty fragment.
    #[must_use]
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Compiles a declared classifier.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if a pattern does not compile.
    pub fn compile(def: &ClassifierDef) -> Result<Self, regex::Error> {
        Ok(Self {
            require_keywords: keyword_regex(&def.require_any)?,
            require_pattern: def.require_pattern.as_deref().map(Regex::new).transpose()?,
            reject_keywords: keyword_regex(&def.reject_any)?,
            reject_pattern: def.reject_pattern.as_deref().map(Regex::new).transpose()?,
            min_len: def.min_len,
            capture: def.capture.as_deref().map(Regex::new).transpose()?,
        })
    }

    /// Returns the accepted value for `fragment`, or `None` if rejected.
    #[must_use]
    pub fn classify(&self, fragment: &str) -> Option<String> {
        if fragment.is_empty() || fragment.chars().count() < self.min_len {
            return None;
        }
        if self.reject_keywords.as_ref().is_some_and(|re| re.is_match(fragment))
            || self.reject_pattern.as_ref().is_some_and(|re| re.is_match(fragment))
        {
            return None;
        }

        let mut required = self
            .require_keywords
            .iter()
            .chain(self.require_pattern.iter())
            .peekable();
        if required.peek().is_some() && !required.any(|re| re.is_match(fragment)) {
            return None;
        }

        match &self.capture {
            Some(re) => re.find(fragment).map(|m| m.as_str().trim().to_owned()),
            None => Some(fragment.to_owned()),
        }
    }
}

/// Builds a case-insensitive whole-word alternation, or `None` for an empty
/// keyword list.
fn keyword_regex(keywords: &[String]) -> Result<Option<Regex>, regex::Error> {
    if keywords.is_empty() {
        return Ok(None);
    }
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
        .case_insensitive(true)
        .build()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(def: ClassifierDef) -> Classifier {
        Classifier::compile(&def).unwrap()
    }

    fn address() -> Classifier {
        compile(ClassifierDef {
            require_any: vec!["rue".into(), "avenue".into(), "allée".into()],
            require_pattern: Some(r"\b\d{5}\b".into()),
            ..ClassifierDef::default()
        })
    }

    fn specialty() -> Classifier {
        compile(ClassifierDef {
            reject_any: vec!["rue".into(), "km".into(), "conventionné".into()],
            reject_pattern: Some(r"\b\d{5}\b".into()),
            ..ClassifierDef::default()
        })
    }

    #[test]
    fn accept_all_keeps_non_empty_fragments() {
        let c = Classifier::accept_all();
        assert_eq!(c.classify("anything").as_deref(), Some("anything"));
        assert_eq!(c.classify(""), None);
    }

    #[test]
    fn address_accepts_street_keyword_or_postal_code() {
        let c = address();
        assert!(c.classify("12 Rue de Paris").is_some());
        assert!(c.classify("75015 Paris").is_some());
        assert!(c.classify("3 Allée des Tilleuls").is_some());
        assert!(c.classify("Cardiologue").is_none());
    }

    #[test]
    fn keywords_match_whole_words_only() {
        let c = address();
        assert!(c.classify("Chirurgien orthopédiste").is_none());
        assert!(c.classify("Ecrue").is_none());
    }

    #[test]
    fn specialty_rejects_address_and_distance_fragments() {
        let c = specialty();
        assert_eq!(c.classify("Cardiologue").as_deref(), Some("Cardiologue"));
        assert!(c.classify("12 Rue de Paris, 75015 Paris").is_none());
        assert!(c.classify("75015 Paris").is_none());
        assert!(c.classify("1,2 km").is_none());
        assert!(c.classify("Conventionné secteur 1").is_none());
    }

    #[test]
    fn capture_trims_to_the_match() {
        let c = compile(ClassifierDef {
            capture: Some(r"(?i)\d+(?:[.,]\d+)?\s*(?:km|m)\b".into()),
            ..ClassifierDef::default()
        });
        assert_eq!(c.classify("à 1,2 km").as_deref(), Some("1,2 km"));
        assert_eq!(c.classify("350 m").as_deref(), Some("350 m"));
        assert_eq!(c.classify("Paris"), None);
    }

    #[test]
    fn min_len_counts_characters() {
        let c = compile(ClassifierDef {
            min_len: 4,
            ..ClassifierDef::default()
        });
        assert!(c.classify("Dé").is_none());
        assert!(c.classify("Dr é").is_some());
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let def = ClassifierDef {
            require_pattern: Some("(".into()),
            ..ClassifierDef::default()
        };
        assert!(Classifier::compile(&def).is_err());
    }
}
