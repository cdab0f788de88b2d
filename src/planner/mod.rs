//! Query planner subsystem for strata
//!
//! Statements arrive already parsed (see [`ast`]). The planner asks the
//! [`IndexMatcher`] for access path candidates and builds executor plans
//! from the first one.
//!
//! # Design Principles
//!
//! - Deterministic: same statement and catalog, same plan
//! - First match wins: no cost model
//! - Table scans are refused at plan time when `notablescan` is in effect

pub mod ast;
mod errors;
mod matcher;
mod planner;

pub use ast::{Delete, Insert, Query, QueryOptions, Statement, Update};
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult};
pub use matcher::{Candidate, IndexMatcher};
pub use planner::{combine, QueryPlanner};
