//! Row-level cleaning.

mod dedupe;

pub use dedupe::Deduplicator;
