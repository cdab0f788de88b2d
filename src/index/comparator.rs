//! Composite key comparators
//!
//! Keys are sequences of values. Each component may be ordered ascending or
//! descending, following the direction of the indexed expression that
//! produced it.

use std::cmp::Ordering;
use std::fmt;

use crate::expr::{SortDirection, Value};

/// Orders composite keys
pub trait KeyComparator: fmt::Debug + Send + Sync {
    fn compare(&self, a: &[Value], b: &[Value]) -> Ordering;
}

fn component(directions: &[SortDirection], i: usize, a: &Value, b: &Value) -> Ordering {
    let ord = a.cmp(b);
    match directions.get(i) {
        Some(SortDirection::Desc) => ord.reverse(),
        _ => ord,
    }
}

/// Lexicographic tuple ordering
///
/// When one key is a prefix of the other, the shorter key sorts first.
#[derive(Debug, Clone, Default)]
pub struct Lexicographic {
    directions: Vec<SortDirection>,
}

impl Lexicographic {
    pub fn new(directions: Vec<SortDirection>) -> Self {
        Self { directions }
    }
}

impl KeyComparator for Lexicographic {
    fn compare(&self, a: &[Value], b: &[Value]) -> Ordering {
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            match component(&self.directions, i, x, y) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        a.len().cmp(&b.len())
    }
}

/// Prefix-aware ordering
///
/// Only the common prefix is compared, so a partial key compares equal to
/// every full key it is a prefix of. Bounds built from leading key
/// components then select whole key ranges.
#[derive(Debug, Clone, Default)]
pub struct PrefixComparator {
    directions: Vec<SortDirection>,
}

impl PrefixComparator {
    pub fn new(directions: Vec<SortDirection>) -> Self {
        Self { directions }
    }
}

impl KeyComparator for PrefixComparator {
    fn compare(&self, a: &[Value], b: &[Value]) -> Ordering {
        a.iter()
            .zip(b.iter())
            .enumerate()
            .map(|(i, (x, y))| component(&self.directions, i, x, y))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}
