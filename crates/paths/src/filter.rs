//! # List filters
//!
//! Server-side filter expressions for the secret listing endpoint.
//!
//! The remote filter language only offers substring containment on names
//! (`name:foo`), so a path prefix must always be re-checked by the caller.

use std::fmt;

/// A single filter clause
#[derive(Debug, Clone, PartialEq, Eq)]
enum Clause {
    /// `labels.<key>=<value>`
    Label { key: String, value: String },
    /// `name:<fragment>`
    NameContains(String),
}

/// Conjunction of filter clauses, rendered whitespace-separated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    clauses: Vec<Clause>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `labels.<key>=<value>`
    #[must_use]
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.clauses.push(Clause::Label {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Require the resource name to contain `fragment`
    #[must_use]
    pub fn name_contains(mut self, fragment: impl Into<String>) -> Self {
        self.clauses.push(Clause::NameContains(fragment.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Rendered filter, `None` when there are no clauses
    pub fn to_query(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.to_string())
    }

    /// Parse a rendered filter back into clauses.
    ///
    /// Unknown clause shapes are ignored.
    pub fn parse(query: &str) -> Self {
        let clauses = query
            .split_whitespace()
            .filter_map(|token| {
                if let Some(fragment) = token.strip_prefix("name:") {
                    return Some(Clause::NameContains(fragment.to_string()));
                }
                let (key, value) = token.strip_prefix("labels.")?.split_once('=')?;
                Some(Clause::Label {
                    key: key.to_string(),
                    value: value.to_string(),
                })
            })
            .collect();
        Self { clauses }
    }

    /// Evaluate the filter against a resource name and its labels
    pub fn matches<'a, L>(&self, resource_name: &str, labels: L) -> bool
    where
        L: Fn(&str) -> Option<&'a str>,
    {
        self.clauses.iter().all(|clause| match clause {
            Clause::NameContains(fragment) => resource_name.contains(fragment.as_str()),
            Clause::Label { key, value } => labels(key) == Some(value.as_str()),
        })
    }

    /// Evaluate only the label clauses, treating name clauses as satisfied
    pub fn matches_labels<'a, L>(&self, labels: L) -> bool
    where
        L: Fn(&str) -> Option<&'a str>,
    {
        self.clauses.iter().all(|clause| match clause {
            Clause::NameContains(_) => true,
            Clause::Label { key, value } => labels(key) == Some(value.as_str()),
        })
    }
}

impl fmt::Display for ListFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match clause {
                Clause::Label { key, value } => write!(f, "labels.{key}={value}")?,
                Clause::NameContains(fragment) => write!(f, "name:{fragment}")?,
            }
        }
        Ok(())
    }
}
