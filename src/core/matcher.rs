//! Join state for one reconciliation
//!
//! The [`Matcher`] holds the provider index, the set of consumed references
//! and the categories built so far. Internal records are fed to it in
//! batches of any size; the final result does not depend on how the input
//! was split, only on the order of the records.

use crate::types::{
    Categories, Differences, MismatchedPair, ReconciliationResult, ReconciliationSummary,
    Transaction,
};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

/// Amounts closer than this are considered equal (strict less-than)
pub const MATCH_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Compare two records that share a reference
///
/// # Returns
///
/// `None` when both amount (within [`MATCH_TOLERANCE`]) and status agree,
/// otherwise the differences.
pub fn compare(internal: &Transaction, provider: &Transaction) -> Option<Differences> {
    // a difference too large to represent is never within tolerance
    let amount_match = internal
        .amount
        .checked_sub(provider.amount)
        .is_some_and(|difference| difference.abs() < MATCH_TOLERANCE);
    let status_match = internal.status == provider.status;

    if amount_match && status_match {
        None
    } else {
        Some(Differences {
            amount: !amount_match,
            status: !status_match,
        })
    }
}

/// Incremental join of internal records against a provider index
///
/// Internal references are expected to be unique; the record parser rejects
/// repeats on that side under every policy.
#[derive(Debug)]
pub struct Matcher<'a> {
    provider: &'a [Transaction],
    index: HashMap<&'a str, &'a Transaction>,
    consumed: HashSet<&'a str>,
    total_internal: usize,
    categories: Categories,
}

impl<'a> Matcher<'a> {
    /// Build the provider index
    ///
    /// If two provider records share a reference the later one wins; the
    /// earlier one is counted in `shadowed_provider` when its reference is
    /// consumed.
    pub fn new(provider: &'a [Transaction]) -> Self {
        let mut index = HashMap::with_capacity(provider.len());
        for tx in provider {
            index.insert(tx.reference.as_str(), tx);
        }

        Self {
            provider,
            index,
            consumed: HashSet::with_capacity(provider.len()),
            total_internal: 0,
            categories: Categories::default(),
        }
    }

    /// Classify one batch of internal records
    pub fn process_batch(&mut self, batch: &[Transaction]) {
        self.total_internal += batch.len();

        for internal in batch {
            let Some(&provider) = self.index.get(internal.reference.as_str()) else {
                self.categories.internal_only.push(internal.clone());
                continue;
            };

            self.consumed.insert(provider.reference.as_str());
            match compare(internal, provider) {
                None => self.categories.matched.push(internal.clone()),
                Some(differences) => self.categories.mismatched.push(MismatchedPair {
                    internal: internal.clone(),
                    provider: provider.clone(),
                    differences,
                }),
            }
        }
    }

    /// Sweep unconsumed provider records and assemble the result
    pub fn finish(mut self) -> ReconciliationResult {
        let mut shadowed_provider = 0;

        for tx in self.provider {
            let reference = tx.reference.as_str();
            if !self.consumed.contains(reference) {
                self.categories.provider_only.push(tx.clone());
            } else if self
                .index
                .get(reference)
                .is_some_and(|indexed| !std::ptr::eq(*indexed, tx))
            {
                shadowed_provider += 1;
            }
        }

        let categories = self.categories;
        ReconciliationResult {
            summary: ReconciliationSummary {
                total_internal: self.total_internal,
                total_provider: self.provider.len(),
                matched: categories.matched.len(),
                internal_only: categories.internal_only.len(),
                provider_only: categories.provider_only.len(),
                mismatched: categories.mismatched.len(),
                shadowed_provider,
            },
            categories,
        }
    }
}
