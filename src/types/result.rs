//! Reconciliation output types
//!
//! A [`ReconciliationResult`] is created once per run by the matching engine
//! and handed to the caller. Every internal transaction lands in exactly one
//! of `matched`, `internal_only` or `mismatched[..].internal`; every provider
//! transaction lands in exactly one of the implicit counterpart of a match,
//! `provider_only` or `mismatched[..].provider` (duplicate provider keys aside,
//! see [`ReconciliationSummary::shadowed_provider`]).

use super::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which fields disagreed for a mismatched pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Differences {
    pub amount: bool,
    pub status: bool,
}

/// Records sharing a reference that failed the equality test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MismatchedPair {
    pub internal: Transaction,
    pub provider: Transaction,
    pub differences: Differences,
}

/// Counts for one reconciliation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub total_internal: usize,
    pub total_provider: usize,
    pub matched: usize,
    pub internal_only: usize,
    pub provider_only: usize,
    pub mismatched: usize,

    /// Provider records hidden behind a later record with the same reference
    ///
    /// Always zero when references are unique per side, which the record
    /// parser enforces by default.
    pub shadowed_provider: usize,
}

impl ReconciliationSummary {
    /// `total_internal == matched + internal_only + mismatched`
    pub fn internal_balanced(&self) -> bool {
        self.total_internal == self.matched + self.internal_only + self.mismatched
    }

    /// `total_provider == matched + provider_only + mismatched + shadowed_provider`
    pub fn provider_balanced(&self) -> bool {
        self.total_provider
            == self.matched + self.provider_only + self.mismatched + self.shadowed_provider
    }
}

/// Classified transactions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Categories {
    /// Internal representative of every agreeing pair
    pub matched: Vec<Transaction>,
    pub internal_only: Vec<Transaction>,
    pub provider_only: Vec<Transaction>,
    pub mismatched: Vec<MismatchedPair>,
}

/// Complete outcome of a reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub summary: ReconciliationSummary,
    pub categories: Categories,
}

/// One of the four output categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Matched,
    Mismatched,
    InternalOnly,
    ProviderOnly,
}

impl Category {
    /// Categories in report order
    pub const ALL: [Category; 4] = [
        Category::Matched,
        Category::Mismatched,
        Category::InternalOnly,
        Category::ProviderOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Matched => "matched",
            Category::Mismatched => "mismatched",
            Category::InternalOnly => "internal_only",
            Category::ProviderOnly => "provider_only",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ReconciliationResult {
    /// Number of entries in a category
    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Matched => self.categories.matched.len(),
            Category::Mismatched => self.categories.mismatched.len(),
            Category::InternalOnly => self.categories.internal_only.len(),
            Category::ProviderOnly => self.categories.provider_only.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_balance_checks() {
        let summary = ReconciliationSummary {
            total_internal: 4,
            total_provider: 5,
            matched: 2,
            internal_only: 1,
            provider_only: 1,
            mismatched: 1,
            shadowed_provider: 1,
        };
        assert!(summary.internal_balanced());
        assert!(summary.provider_balanced());

        let broken = ReconciliationSummary {
            shadowed_provider: 0,
            ..summary
        };
        assert!(!broken.provider_balanced());
    }

    #[test]
    fn test_category_names() {
        let names: Vec<_> = Category::ALL.iter().map(Category::as_str).collect();
        assert_eq!(
            names,
            vec!["matched", "mismatched", "internal_only", "provider_only"]
        );
    }
}
