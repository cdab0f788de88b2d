//! Ordering specifications shared by index definitions and `ORDER BY`

use std::fmt;

use serde::{Deserialize, Serialize};

use super::expression::Expr;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// Returns the opposite direction
    pub fn reverse(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An expression paired with a direction
///
/// A sequence of these defines a compound index key, or an ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexedExpr {
    pub expr: Expr,
    pub direction: SortDirection,
}

impl IndexedExpr {
    pub fn new(expr: Expr, direction: SortDirection) -> Self {
        Self { expr, direction }
    }

    pub fn asc(expr: Expr) -> Self {
        Self::new(expr, SortDirection::Asc)
    }

    pub fn desc(expr: Expr) -> Self {
        Self::new(expr, SortDirection::Desc)
    }

    /// Same expression, flipped direction
    pub fn reverse(&self) -> Self {
        Self::new(self.expr.clone(), self.direction.reverse())
    }
}

impl fmt::Display for IndexedExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.expr, self.direction)
    }
}

/// Flips every direction of an ordering
pub fn reverse_all(exprs: &[IndexedExpr]) -> Vec<IndexedExpr> {
    exprs.iter().map(IndexedExpr::reverse).collect()
}
