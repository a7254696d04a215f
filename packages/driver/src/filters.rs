//! Search filter expressions.
//!
//! A filter expression is a comma-separated list of `key` flags and
//! `key:value` pairs, e.g. `disponibilites,langues:Anglais`.

use std::fmt;

/// One requested filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Filter name as declared in the site profile.
    pub key: String,
    /// Option to pick once the filter is open. `None` for a plain toggle.
    pub value: Option<String>,
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}:{value}", self.key),
            None => f.write_str(&self.key),
        }
    }
}

/// Parses a filter expression.
///
/// Blank items are skipped. A key given twice keeps its last value, in the
/// position of its first occurrence.
#[must_use]
pub fn parse_filters(expr: &str) -> Vec<Filter> {
    let mut filters: Vec<Filter> = Vec::new();

    for item in expr.split(',').map(str::trim).filter(|i| !i.is_empty()) {
        let filter = match item.split_once(':') {
            Some((key, value)) => Filter {
                key: key.trim().to_owned(),
                value: Some(value.trim().to_owned()).filter(|v| !v.is_empty()),
            },
            None => Filter {
                key: item.to_owned(),
                value: None,
            },
        };
        if filter.key.is_empty() {
            log::warn!("Ignoring filter '{item}' with an empty name");
            continue;
        }

        match filters.iter_mut().find(|f| f.key == filter.key) {
            Some(existing) => *existing = filter,
            None => filters.push(filter),
        }
    }

    filters
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_and_pairs() {
        assert_eq!(
            parse_filters("disponibilites, langues:Anglais"),
            vec![
                Filter {
                    key: "disponibilites".into(),
                    value: None
                },
                Filter {
                    key: "langues".into(),
                    value: Some("Anglais".into())
                },
            ]
        );
    }

    #[test]
    fn empty_expression_has_no_filters() {
        assert!(parse_filters("").is_empty());
        assert!(parse_filters(" , ,").is_empty());
        assert!(parse_filters(":x").is_empty());
    }

    #[test]
    fn last_value_wins() {
        let filters = parse_filters("langues:Anglais,disponibilites,langues:Espagnol");
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].to_string(), "langues:Espagnol");
        assert_eq!(filters[1].to_string(), "disponibilites");
    }
}
