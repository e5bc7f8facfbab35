//! Core matching module
//!
//! This module contains the reconciliation join:
//! - `matcher` - Join state fed one batch of internal records at a time
//! - `engine` - The matching engine, with plain and progress-reporting variants

pub mod engine;
pub mod matcher;

pub use engine::{BatchProgress, MatchingEngine};
pub use matcher::{compare, Matcher, MATCH_TOLERANCE};
