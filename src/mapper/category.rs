//! Diagnostic categories and the classification result value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A diagnostic category reported by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Code `0`.
    Normal,
    /// Code `1`.
    Turbid,
    /// Code `2`.
    Red,
    /// Code `3`.
    Green,
    /// Any code outside the known table.
    Unknown,
}

impl Category {
    /// All categories, in code order, followed by `Unknown`.
    pub const ALL: [Category; 5] = [
        Category::Normal,
        Category::Turbid,
        Category::Red,
        Category::Green,
        Category::Unknown,
    ];

    /// Position in [`Category::ALL`].
    pub fn index(self) -> usize {
        match self {
            Category::Normal => 0,
            Category::Turbid => 1,
            Category::Red => 2,
            Category::Green => 3,
            Category::Unknown => 4,
        }
    }

    /// Short lowercase label, used for logs and metric labels.
    pub fn label(self) -> &'static str {
        match self {
            Category::Normal => "normal",
            Category::Turbid => "turbid",
            Category::Red => "red",
            Category::Green => "green",
            Category::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of a classification, carrying the raw code for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    category: Category,
    raw_code: String,
}

impl ClassificationResult {
    /// Creates a result from a category and the raw code it was mapped from.
    pub fn new(category: Category, raw_code: impl Into<String>) -> Self {
        Self {
            category,
            raw_code: raw_code.into(),
        }
    }

    /// Returns the mapped category.
    #[inline]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Returns the code exactly as the service sent it.
    #[inline]
    pub fn raw_code(&self) -> &str {
        &self.raw_code
    }

    /// Returns true if the code was not in the known table.
    pub fn is_unknown(&self) -> bool {
        self.category == Category::Unknown
    }
}

impl fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {:?})", self.category, self.raw_code)
    }
}
