//! strata - an embeddable relational query engine
//!
//! Tables live in memory as append-only slot vectors with AVL secondary
//! indexes. Already-parsed statements are planned against those indexes and
//! executed by lazily pulled plan nodes that count their own work.
//!
//! # Layout
//!
//! - [`expr`]: values, tuples, expressions
//! - [`index`]: AVL tree, comparators, search arguments
//! - [`storage`]: tables, index maintenance, the storage contract
//! - [`journal`]: mutation records and their file sink
//! - [`planner`]: statement AST, index matcher, planner
//! - [`executor`]: plan nodes, aggregates, explain
//! - [`engine`]: facade tying config, storage, planner and executor together

pub mod config;
pub mod engine;
mod error;
pub mod executor;
pub mod expr;
pub mod index;
pub mod journal;
pub mod observability;
pub mod planner;
pub mod storage;

pub use config::{ConfigError, ConfigErrorCode, EngineConfig};
pub use engine::Engine;
pub use error::{StrataError, StrataResult};
pub use executor::{ExecutionContext, ExecutionResult, ExplainNode, PlanNode};
pub use expr::{Expr, IndexedExpr, SortDirection, Tuple, Value};
pub use index::SearchArgs;
pub use observability::{ExecutionStats, StatsSnapshot};
pub use planner::{Delete, Insert, Query, QueryOptions, QueryPlanner, Statement, Update};
pub use storage::{Database, IndexCatalog, IndexDef, Storage};
