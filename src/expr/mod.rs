//! Expression subsystem for strata
//!
//! Values, tuples and the closed expression tree evaluated against them.
//!
//! # Invariants
//!
//! - Evaluation is pure: no state, no side effects
//! - Comparisons use the total value order shared with indexes
//! - Aggregates are only evaluated by aggregation plan nodes

mod errors;
mod expression;
mod indexed;
mod value;

pub use errors::{ExprError, ExprErrorCode, ExprResult};
pub use expression::{
    and, avg, col, count, eq, gt, gte, in_list, lit, lower, lt, lte, max, neq, or, sum, upper,
    AggregateFunction, Expr, ScalarFunction,
};
pub use indexed::{reverse_all, IndexedExpr, SortDirection};
pub use value::{RowId, Tuple, Value};
