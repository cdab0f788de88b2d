//! Search arguments and the bounds they produce
//!
//! `eq` is an inclusive lower and upper bound on the same key, so a partial
//! key selects the whole range of keys it prefixes. `in` runs one such
//! bounded traversal per listed key.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expr::Value;

use super::comparator::KeyComparator;

/// Composite index key
pub type IndexKey = Vec<Value>;

/// Bound specification attached to an index scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq: Option<IndexKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<IndexKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<IndexKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<IndexKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<IndexKey>,
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub in_keys: Option<Vec<IndexKey>>,
}

impl SearchArgs {
    /// No bounds: full scan
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_eq(mut self, key: IndexKey) -> Self {
        self.eq = Some(key);
        self
    }

    pub fn with_gt(mut self, key: IndexKey) -> Self {
        self.gt = Some(key);
        self
    }

    pub fn with_gte(mut self, key: IndexKey) -> Self {
        self.gte = Some(key);
        self
    }

    pub fn with_lt(mut self, key: IndexKey) -> Self {
        self.lt = Some(key);
        self
    }

    pub fn with_lte(mut self, key: IndexKey) -> Self {
        self.lte = Some(key);
        self
    }

    pub fn with_in(mut self, keys: Vec<IndexKey>) -> Self {
        self.in_keys = Some(keys);
        self
    }

    /// True when no bound is set
    pub fn is_empty(&self) -> bool {
        self.eq.is_none()
            && self.gt.is_none()
            && self.gte.is_none()
            && self.lt.is_none()
            && self.lte.is_none()
            && self.in_keys.is_none()
    }

    /// Expands into one bound set per traversal
    pub(crate) fn bounds(&self) -> Vec<Bounds> {
        let mut base = Bounds::default();
        if let Some(k) = &self.eq {
            base.lower.push(Bound::new(k.clone(), true));
            base.upper.push(Bound::new(k.clone(), true));
        }
        if let Some(k) = &self.gt {
            base.lower.push(Bound::new(k.clone(), false));
        }
        if let Some(k) = &self.gte {
            base.lower.push(Bound::new(k.clone(), true));
        }
        if let Some(k) = &self.lt {
            base.upper.push(Bound::new(k.clone(), false));
        }
        if let Some(k) = &self.lte {
            base.upper.push(Bound::new(k.clone(), true));
        }

        match &self.in_keys {
            None => vec![base],
            Some(keys) => keys
                .iter()
                .map(|k| {
                    let mut b = base.clone();
                    b.lower.push(Bound::new(k.clone(), true));
                    b.upper.push(Bound::new(k.clone(), true));
                    b
                })
                .collect(),
        }
    }
}

impl fmt::Display for SearchArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        let named = [
            ("eq", &self.eq),
            ("gt", &self.gt),
            ("gte", &self.gte),
            ("lt", &self.lt),
            ("lte", &self.lte),
        ];
        for (name, key) in named {
            if let Some(k) = key {
                parts.push(format!("{}: {}", name, format_key(k)));
            }
        }
        if let Some(keys) = &self.in_keys {
            let list: Vec<String> = keys.iter().map(|k| format_key(k)).collect();
            parts.push(format!("in: [{}]", list.join(", ")));
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Renders a key as `[v1, v2]`
pub fn format_key(key: &[Value]) -> String {
    let parts: Vec<String> = key.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

#[derive(Debug, Clone)]
pub(crate) struct Bound {
    key: IndexKey,
    inclusive: bool,
}

impl Bound {
    fn new(key: IndexKey, inclusive: bool) -> Self {
        Self { key, inclusive }
    }

    // A partial bound equal to the node key may match keys on both sides
    fn spans(&self, c: Ordering, key: &[Value]) -> bool {
        c == Ordering::Equal && self.inclusive && self.key.len() < key.len()
    }
}

/// What a node's key means for a traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Verdict {
    /// Key satisfies every bound
    pub in_range: bool,
    /// Smaller keys may satisfy the lower bounds
    pub descend_low: bool,
    /// Larger keys may satisfy the upper bounds
    pub descend_high: bool,
}

/// Conjunction of lower and upper bounds
#[derive(Debug, Clone, Default)]
pub(crate) struct Bounds {
    lower: Vec<Bound>,
    upper: Vec<Bound>,
}

impl Bounds {
    pub fn evaluate(&self, cmp: &dyn KeyComparator, key: &[Value]) -> Verdict {
        let mut verdict = Verdict {
            in_range: true,
            descend_low: true,
            descend_high: true,
        };

        for b in &self.lower {
            let c = cmp.compare(key, &b.key);
            let satisfied = c == Ordering::Greater || (c == Ordering::Equal && b.inclusive);
            verdict.in_range &= satisfied;
            verdict.descend_low &= c == Ordering::Greater || b.spans(c, key);
        }

        for b in &self.upper {
            let c = cmp.compare(key, &b.key);
            let satisfied = c == Ordering::Less || (c == Ordering::Equal && b.inclusive);
            verdict.in_range &= satisfied;
            verdict.descend_high &= c == Ordering::Less || b.spans(c, key);
        }

        verdict
    }
}
