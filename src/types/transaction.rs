//! Transaction-related types for the reconciler
//!
//! This module defines the typed transaction record produced by the record
//! parser, its status enum, and the label identifying which side of the
//! reconciliation a record (or error) came from.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Business key joining the two datasets
pub type Reference = String;

/// Which dataset a record or error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// The organisation's own ledger export
    Internal,
    /// The payment provider's settlement export
    Provider,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Internal => "internal",
            Source::Provider => "provider",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement status of a transaction
///
/// Parsing is exact and case-sensitive: only `completed`, `pending` and
/// `failed` are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
}

impl TransactionStatus {
    /// Every accepted status, in the order used by error messages
    pub const ALL: [TransactionStatus; 3] = [
        TransactionStatus::Completed,
        TransactionStatus::Pending,
        TransactionStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or(())
    }
}

/// A validated transaction record
///
/// Created once by the record parser and never mutated afterwards.
/// Optional fields are carried through verbatim from the source row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique business key (non-blank after trimming)
    pub reference: Reference,

    /// Transaction amount, exact decimal
    pub amount: Decimal,

    /// Settlement status
    pub status: TransactionStatus,

    /// Timestamp text as it appeared in the source, if any
    pub timestamp: Option<String>,

    /// Customer identifier, if any
    pub customer_id: Option<String>,

    /// Fee amount when present and numeric
    pub fee_amount: Option<Decimal>,
}

impl Transaction {
    /// Create a transaction with only the mandatory fields set
    pub fn new(reference: impl Into<Reference>, amount: Decimal, status: TransactionStatus) -> Self {
        Transaction {
            reference: reference.into(),
            amount,
            status,
            timestamp: None,
            customer_id: None,
            fee_amount: None,
        }
    }
}
