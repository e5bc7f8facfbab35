//! Correlation identifiers for reconciliation runs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation identifier carried by every message of one run
///
/// Identifiers are handed out in increasing order by the coordinator; a
/// message is only observed by the caller while its id is the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
