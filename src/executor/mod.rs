//! Executor subsystem for strata
//!
//! A tree of plan nodes pulled lazily, Volcano style.
//!
//! # Execution Flow
//!
//! 1. The caller builds or receives a `PlanNode` tree
//! 2. `stream` wraps each child's iterator in its parent's
//! 3. Tuples are pulled until the caller stops or the stream ends
//! 4. Counters accumulate on the call's `ExecutionContext`
//!
//! # Invariants
//!
//! - `Limit` never pulls past its limit; `Filter` and `Project` never buffer
//! - `Sort` and the aggregation nodes drain their child on first pull
//! - Errors surface when the failing tuple is pulled
//! - Mutation nodes drain their child before changing storage

mod aggregate;
mod context;
mod errors;
mod explain;
mod plan;
mod result;

pub use aggregate::{AggState, AggregateSpec};
pub use context::ExecutionContext;
pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult};
pub use explain::ExplainNode;
pub use plan::{PlanNode, TupleStream};
pub use result::ExecutionResult;
