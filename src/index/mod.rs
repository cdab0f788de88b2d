//! Index subsystem for strata
//!
//! Indexes are derived, in-memory-only state rebuilt from table storage.
//!
//! # Design Principles
//!
//! - AVL discipline: rebalanced on the way up from every insert and delete
//! - Pluggable comparator: lexicographic by default, prefix-aware on request
//! - Lazy scans: keys are produced one at a time under the search arguments
//!
//! # Invariants
//!
//! - Every live tuple has exactly one entry in each index of its table
//! - Keys whose components are all null are rejected
//! - Every node examined by a scan increments `index_comparisons`

mod comparator;
mod errors;
mod sargs;
mod secondary;
mod tree;

pub use comparator::{KeyComparator, Lexicographic, PrefixComparator};
pub use errors::{IndexError, IndexErrorCode, IndexResult};
pub use sargs::{format_key, IndexKey, SearchArgs};
pub use secondary::Index;
pub use tree::{AvlTree, TreeScan};
