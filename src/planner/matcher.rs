//! Index matcher
//!
//! Proposes access paths for one table from its index definitions, the
//! query's predicates and its ordering. Rules, tried per index in order:
//!
//! 1. Partition predicates into equality, range and `IN` terms
//! 2. Full equality match
//! 3. Full order match (ascending scan)
//! 4. Reverse order match (descending scan)
//! 5. Single-column range match
//! 6. Equality prefixes, followed by the ordering or by one range column
//!
//! A single-column index also matches an `IN` list of literals. Candidates
//! come out in index-then-rule order.

use std::collections::BTreeSet;

use crate::expr::{reverse_all, Expr, IndexedExpr, SortDirection, Value};
use crate::index::{IndexKey, SearchArgs};
use crate::storage::IndexDef;

/// A proposed access path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub index: String,
    pub sargs: SearchArgs,
    /// Scan output already follows the query ordering
    pub sorted: bool,
    /// Some predicate is not encoded by `sargs`; a filter is still needed
    pub recheck: bool,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl RangeOp {
    /// Same bound seen from the other side of the comparison
    fn flip(self) -> Self {
        match self {
            RangeOp::Gt => RangeOp::Lt,
            RangeOp::Gte => RangeOp::Lte,
            RangeOp::Lt => RangeOp::Gt,
            RangeOp::Lte => RangeOp::Gte,
        }
    }

    fn bound(self, sargs: SearchArgs, key: IndexKey) -> SearchArgs {
        match self {
            RangeOp::Gt => sargs.with_gt(key),
            RangeOp::Gte => sargs.with_gte(key),
            RangeOp::Lt => sargs.with_lt(key),
            RangeOp::Lte => sargs.with_lte(key),
        }
    }
}

enum Term<'q> {
    Eq(&'q Expr, Value),
    Range(&'q Expr, RangeOp, Value),
    In(&'q Expr, Vec<Value>),
}

/// Recognizes `expr OP literal` and `literal OP expr`
fn classify(predicate: &Expr) -> Option<Term<'_>> {
    let (op, l, r) = match predicate {
        Expr::Eq(l, r) => (None, l, r),
        Expr::Gt(l, r) => (Some(RangeOp::Gt), l, r),
        Expr::Gte(l, r) => (Some(RangeOp::Gte), l, r),
        Expr::Lt(l, r) => (Some(RangeOp::Lt), l, r),
        Expr::Lte(l, r) => (Some(RangeOp::Lte), l, r),
        Expr::In(e, list) => {
            let values = list
                .iter()
                .map(|item| item.as_literal().cloned())
                .collect::<Option<Vec<_>>>()?;
            return Some(Term::In(e, values));
        }
        _ => return None,
    };

    let (expr, value, mirrored) = match (l.as_literal(), r.as_literal()) {
        (None, Some(v)) => (l.as_ref(), v.clone(), false),
        (Some(v), None) => (r.as_ref(), v.clone(), true),
        _ => return None,
    };

    Some(match op {
        None => Term::Eq(expr, value),
        Some(op) if mirrored => Term::Range(expr, op.flip(), value),
        Some(op) => Term::Range(expr, op, value),
    })
}

struct EqTerm<'q> {
    expr: &'q Expr,
    value: Value,
    source: usize,
}

struct RangeTerm<'q> {
    expr: &'q Expr,
    /// At most one bound per operator; a later predicate replaces an earlier
    bounds: Vec<(RangeOp, Value, usize)>,
}

struct InTerm<'q> {
    expr: &'q Expr,
    values: Vec<Value>,
    source: usize,
}

/// Partitioned predicates of one query
pub struct IndexMatcher<'q> {
    predicates: usize,
    order_by: &'q [IndexedExpr],
    eq: Vec<EqTerm<'q>>,
    range: Vec<RangeTerm<'q>>,
    in_lists: Vec<InTerm<'q>>,
}

impl<'q> IndexMatcher<'q> {
    pub fn new(where_: &'q [Expr], order_by: &'q [IndexedExpr]) -> Self {
        let mut matcher = Self {
            predicates: where_.len(),
            order_by,
            eq: Vec::new(),
            range: Vec::new(),
            in_lists: Vec::new(),
        };

        for (source, predicate) in where_.iter().enumerate() {
            match classify(predicate) {
                Some(Term::Eq(expr, value)) => {
                    matcher.eq.retain(|t| t.expr != expr);
                    matcher.eq.push(EqTerm {
                        expr,
                        value,
                        source,
                    });
                }
                Some(Term::Range(expr, op, value)) => {
                    match matcher.range.iter_mut().find(|t| t.expr == expr) {
                        Some(term) => {
                            term.bounds.retain(|(o, _, _)| *o != op);
                            term.bounds.push((op, value, source));
                        }
                        None => matcher.range.push(RangeTerm {
                            expr,
                            bounds: vec![(op, value, source)],
                        }),
                    }
                }
                Some(Term::In(expr, values)) => {
                    matcher.in_lists.retain(|t| t.expr != expr);
                    matcher.in_lists.push(InTerm {
                        expr,
                        values,
                        source,
                    });
                }
                None => {}
            }
        }
        matcher
    }

    fn eq_term(&self, expr: &Expr) -> Option<&EqTerm<'q>> {
        self.eq.iter().find(|t| t.expr == expr)
    }

    /// Equality values for every expression, or `None` if one is missing
    fn eq_values(&self, exprs: &[IndexedExpr]) -> Option<(IndexKey, Vec<usize>)> {
        let mut key = Vec::with_capacity(exprs.len());
        let mut sources = Vec::with_capacity(exprs.len());
        for ie in exprs {
            let term = self.eq_term(&ie.expr)?;
            key.push(term.value.clone());
            sources.push(term.source);
        }
        Some((key, sources))
    }

    /// Candidates for every index, in declaration order
    pub fn match_all(&self, indexes: &[IndexDef]) -> Vec<Candidate> {
        indexes.iter().flat_map(|idx| self.match_index(idx)).collect()
    }

    /// Candidates for one index, in rule order
    pub fn match_index(&self, index: &IndexDef) -> Vec<Candidate> {
        let exprs = index.exprs.as_slice();
        let mut out = Vec::new();
        if exprs.is_empty() {
            return out;
        }
        let mut emit = |sargs: SearchArgs, sorted: bool, direction: SortDirection, sources: &[usize]| {
            let encoded: BTreeSet<usize> = sources.iter().copied().collect();
            out.push(Candidate {
                index: index.name.clone(),
                sargs,
                sorted,
                recheck: encoded.len() < self.predicates,
                direction,
            });
        };

        // full equality
        if let Some((key, sources)) = self.eq_values(exprs) {
            emit(SearchArgs::new().with_eq(key), false, SortDirection::Asc, &sources);
        }

        // full order, forwards then backwards
        if exprs == self.order_by {
            emit(SearchArgs::new(), true, SortDirection::Asc, &[]);
        }
        if reverse_all(exprs) == self.order_by {
            emit(SearchArgs::new(), true, SortDirection::Desc, &[]);
        }

        // single-column range
        if let ([only], [term]) = (exprs, self.range.as_slice()) {
            if *term.expr == only.expr {
                let (sargs, sources) = range_sargs(SearchArgs::new(), &[], term, only.direction);
                emit(sargs, false, SortDirection::Asc, &sources);
            }
        }

        // single-column IN list
        if let [only] = exprs {
            if let Some(term) = self.in_lists.iter().find(|t| *t.expr == only.expr) {
                let mut keys: Vec<IndexKey> = Vec::new();
                for v in &term.values {
                    let key = vec![v.clone()];
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                emit(SearchArgs::new().with_in(keys), false, SortDirection::Asc, &[term.source]);
            }
        }

        // equality prefixes
        for len in 1..=exprs.len() {
            let (prefix, rest) = exprs.split_at(len);
            let Some((prefix_key, prefix_sources)) = self.eq_values(prefix) else {
                break;
            };

            if rest == self.order_by {
                emit(
                    SearchArgs::new().with_eq(prefix_key.clone()),
                    true,
                    SortDirection::Asc,
                    &prefix_sources,
                );
            }

            if let [last] = rest {
                for term in &self.range {
                    if *term.expr != last.expr {
                        continue;
                    }
                    let base = SearchArgs::new().with_eq(prefix_key.clone());
                    let (sargs, mut sources) = range_sargs(base, &prefix_key, term, last.direction);
                    sources.extend(&prefix_sources);
                    emit(sargs, false, SortDirection::Asc, &sources);
                }
            }
        }

        out
    }
}

/// Adds one bound per range operator, each key being `prefix ++ [value]`
///
/// A descending key component reverses the comparator, so the operators
/// are flipped to keep selecting the same rows.
fn range_sargs(
    mut sargs: SearchArgs,
    prefix: &[Value],
    term: &RangeTerm<'_>,
    direction: SortDirection,
) -> (SearchArgs, Vec<usize>) {
    let mut sources = Vec::with_capacity(term.bounds.len());
    for (op, value, source) in &term.bounds {
        let op = match direction {
            SortDirection::Asc => *op,
            SortDirection::Desc => op.flip(),
        };
        let mut key = prefix.to_vec();
        key.push(value.clone());
        sargs = op.bound(sargs, key);
        sources.push(*source);
    }
    (sargs, sources)
}
