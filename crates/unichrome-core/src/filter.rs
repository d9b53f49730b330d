//! Post-filter predicates applied to search results.
//!
//! Filters narrow a k-NN result set after the graph traversal: metadata
//! triples `(key, op, value)` and inclusive timestamp ranges over the
//! creation and modification times. All filters on a query are conjoined.

use crate::document::Document;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comparison operator for metadata filters.
///
/// `Eq`, `Ne` and `Contains` compare string values. The ordered operators
/// parse both operands as f64 and compare numerically; if either side fails
/// to parse the predicate is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    /// String equality.
    Eq,
    /// String inequality.
    Ne,
    /// Numeric less-than.
    Lt,
    /// Numeric less-than-or-equal.
    Le,
    /// Numeric greater-than.
    Gt,
    /// Numeric greater-than-or-equal.
    Ge,
    /// Substring containment.
    Contains,
}

impl FilterOp {
    /// Parses a textual operator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFilter`] for an unknown operator token.
    pub fn parse(op: &str) -> Result<Self> {
        match op {
            "==" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            "contains" => Ok(Self::Contains),
            other => Err(Error::InvalidFilter(format!("unknown operator '{other}'"))),
        }
    }
}

/// A single metadata predicate: `metadata[key] op value`.
///
/// A missing key makes the predicate false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    /// Metadata key to test.
    pub key: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Right-hand operand.
    pub value: String,
}

impl MetadataFilter {
    /// Creates a new metadata filter.
    #[must_use]
    pub fn new(key: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            op,
            value: value.into(),
        }
    }

    /// Parses a `(key, op, value)` triple with a textual operator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFilter`] for an unknown operator token.
    pub fn parse(key: impl Into<String>, op: &str, value: impl Into<String>) -> Result<Self> {
        Ok(Self::new(key.into(), FilterOp::parse(op)?, value.into()))
    }

    /// Evaluates the predicate against a document's metadata.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        let Some(actual) = document.metadata.get(&self.key) else {
            return false;
        };

        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::Ne => actual != &self.value,
            FilterOp::Contains => actual.contains(&self.value),
            FilterOp::Lt | FilterOp::Le | FilterOp::Gt | FilterOp::Ge => {
                // Ordered operators are numeric; an unparsable side makes
                // the predicate false rather than an error.
                match (actual.parse::<f64>(), self.value.parse::<f64>()) {
                    (Ok(lhs), Ok(rhs)) => match self.op {
                        FilterOp::Lt => lhs < rhs,
                        FilterOp::Le => lhs <= rhs,
                        FilterOp::Gt => lhs > rhs,
                        FilterOp::Ge => lhs >= rhs,
                        _ => unreachable!(),
                    },
                    _ => false,
                }
            }
        }
    }
}

/// An inclusive `[start, end]` timestamp range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive lower bound.
    pub start: DateTime<Utc>,
    /// Inclusive upper bound.
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Creates a new inclusive range.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Returns true if `t` falls within the range.
    #[must_use]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

/// The conjunction of all post-filters attached to one search.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Metadata predicates; all must hold.
    pub metadata: Vec<MetadataFilter>,
    /// Bound on the creation timestamp.
    pub created: Option<DateRange>,
    /// Bound on the modification timestamp.
    pub modified: Option<DateRange>,
}

impl SearchFilters {
    /// Returns true if no filter is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty() && self.created.is_none() && self.modified.is_none()
    }

    /// Evaluates every predicate against the document.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        if let Some(range) = &self.created {
            if !range.contains(document.created_at) {
                return false;
            }
        }
        if let Some(range) = &self.modified {
            if !range.contains(document.modified_at) {
                return false;
            }
        }
        self.metadata.iter().all(|f| f.matches(document))
    }
}

#[cfg(test)]
mod filter_tests {
    use super::*;
    use std::collections::HashMap;

    fn doc_with_metadata(pairs: &[(&str, &str)]) -> Document {
        let metadata: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Document::new(0, "text".into(), vec![1.0, 0.0], metadata)
    }

    #[test]
    fn equality_compares_strings() {
        let doc = doc_with_metadata(&[("source", "notion")]);
        assert!(MetadataFilter::new("source", FilterOp::Eq, "notion").matches(&doc));
        assert!(!MetadataFilter::new("source", FilterOp::Eq, "slack").matches(&doc));
        assert!(MetadataFilter::new("source", FilterOp::Ne, "slack").matches(&doc));
    }

    #[test]
    fn missing_key_is_false_even_for_ne() {
        let doc = doc_with_metadata(&[]);
        assert!(!MetadataFilter::new("source", FilterOp::Eq, "notion").matches(&doc));
        assert!(!MetadataFilter::new("source", FilterOp::Ne, "notion").matches(&doc));
    }

    #[test]
    fn empty_string_value_is_distinct_from_missing() {
        let doc = doc_with_metadata(&[("tag", "")]);
        assert!(MetadataFilter::new("tag", FilterOp::Eq, "").matches(&doc));
    }

    #[test]
    fn ordered_operators_compare_numerically() {
        let doc = doc_with_metadata(&[("score", "10")]);
        // String comparison would put "10" < "9"; numeric comparison must not.
        assert!(MetadataFilter::new("score", FilterOp::Gt, "9").matches(&doc));
        assert!(MetadataFilter::new("score", FilterOp::Le, "10").matches(&doc));
        assert!(!MetadataFilter::new("score", FilterOp::Lt, "10").matches(&doc));
    }

    #[test]
    fn unparsable_numeric_operand_is_false() {
        let doc = doc_with_metadata(&[("score", "high")]);
        assert!(!MetadataFilter::new("score", FilterOp::Gt, "1").matches(&doc));
        let doc = doc_with_metadata(&[("score", "5")]);
        assert!(!MetadataFilter::new("score", FilterOp::Gt, "low").matches(&doc));
    }

    #[test]
    fn contains_is_substring_match() {
        let doc = doc_with_metadata(&[("path", "docs/guides/intro.md")]);
        assert!(MetadataFilter::new("path", FilterOp::Contains, "guides").matches(&doc));
        assert!(!MetadataFilter::new("path", FilterOp::Contains, "api").matches(&doc));
    }

    #[test]
    fn unknown_operator_is_reported() {
        let err = FilterOp::parse("~=").unwrap_err();
        assert_eq!(err.code(), "UNI-007");
    }

    #[test]
    fn textual_operators_parse() {
        assert_eq!(FilterOp::parse("==").unwrap(), FilterOp::Eq);
        assert_eq!(FilterOp::parse(">=").unwrap(), FilterOp::Ge);
        assert_eq!(FilterOp::parse("contains").unwrap(), FilterOp::Contains);
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let doc = doc_with_metadata(&[]);
        let range = DateRange::new(doc.created_at, doc.created_at);
        assert!(range.contains(doc.created_at));

        let filters = SearchFilters {
            created: Some(range),
            ..Default::default()
        };
        assert!(filters.matches(&doc));
    }

    #[test]
    fn filters_are_conjoined() {
        let doc = doc_with_metadata(&[("source", "notion"), ("lang", "en")]);
        let filters = SearchFilters {
            metadata: vec![
                MetadataFilter::new("source", FilterOp::Eq, "notion"),
                MetadataFilter::new("lang", FilterOp::Eq, "fr"),
            ],
            ..Default::default()
        };
        assert!(!filters.matches(&doc));
    }
}
