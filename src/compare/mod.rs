//! Expected/actual comparison.
//!
//! Text is compared after line-ending normalization. When both sides are JSON
//! the comparison is structural: object key order does not matter, array
//! order does. Counts and flags compare by value.

use crate::model::ExpectedAndActual;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Values the comparator knows how to normalize and compare.
pub trait Comparable: Clone {
    /// Canonical form used for both comparison and storage.
    #[must_use]
    fn normalized(self) -> Self {
        self
    }

    /// Equality after normalization.
    fn equivalent(&self, other: &Self) -> bool;

    /// Rendering used in mismatch messages.
    fn render(&self) -> String;
}

impl Comparable for String {
    fn normalized(self) -> Self {
        normalize_line_endings(&self)
    }

    fn equivalent(&self, other: &Self) -> bool {
        let expected = normalize_line_endings(self);
        let actual = normalize_line_endings(other);
        match (parse_json(&expected), parse_json(&actual)) {
            (Some(e), Some(a)) => e == a,
            _ => expected.trim_end() == actual.trim_end(),
        }
    }

    fn render(&self) -> String {
        self.clone()
    }
}

impl Comparable for u32 {
    fn equivalent(&self, other: &Self) -> bool {
        self == other
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl Comparable for bool {
    fn equivalent(&self, other: &Self) -> bool {
        self == other
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

/// Convert every line terminator (`\r\n`, lone `\r`) to `\n`.
#[must_use]
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn parse_json(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    serde_json::from_str(text).ok()
}

/// True when a recorded text value carries no expectation (missing file,
/// blank file, or JSON `null`).
#[must_use]
pub fn is_empty_expectation(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed == "null"
}

/// Pair an expected and actual value, normalizing both.
#[must_use]
pub fn compare<V: Comparable>(
    location: impl Into<String>,
    expected: V,
    actual: V,
) -> ExpectedAndActual<V> {
    ExpectedAndActual {
        location: location.into(),
        expected: expected.normalized(),
        actual: actual.normalized(),
    }
}

/// One failed comparison, ready for an assertion message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub field: String,
    pub location: String,
    pub expected: String,
    pub actual: String,
}

impl Mismatch {
    /// `Some` when the pair does not match.
    #[must_use]
    pub fn check<V: Comparable>(field: &str, pair: &ExpectedAndActual<V>) -> Option<Self> {
        if pair.matches() {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            location: pair.location.clone(),
            expected: pair.expected.render(),
            actual: pair.actual.render(),
        })
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} differ ({})\n    expected: {}\n    actual: {}",
            self.field, self.location, self.expected, self.actual
        )
    }
}
