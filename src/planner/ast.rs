//! Query AST structures
//!
//! Already-parsed statements as handed over by a front end. `where_`
//! predicates are implicitly ANDed.

use serde::{Deserialize, Serialize};

use crate::expr::{col, Expr, IndexedExpr};

/// Per-statement options
///
/// `partial`, `remote` and `sql` are carried for coordinators; the planner
/// only reads `notablescan` and `explain`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Overrides the engine-wide default when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notablescan: Option<bool>,
    pub explain: bool,
    pub partial: bool,
    pub remote: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

/// Select statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Output columns as (alias, expression); empty selects every column
    pub select: Vec<(String, Expr)>,
    /// Source table; `None` evaluates the select list once
    pub from: Option<String>,
    pub where_: Vec<Expr>,
    pub order_by: Vec<IndexedExpr>,
    pub group_by: Vec<Expr>,
    pub limit: Option<usize>,
    pub options: QueryOptions,
}

impl Query {
    /// Creates a query over a table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            from: Some(table.into()),
            ..Self::default()
        }
    }

    /// Creates a query without a source table
    pub fn constant() -> Self {
        Self::default()
    }

    /// Adds an aliased output column
    pub fn select(mut self, alias: impl Into<String>, expr: Expr) -> Self {
        self.select.push((alias.into(), expr));
        self
    }

    /// Adds a column under its own name
    pub fn select_column(self, name: &str) -> Self {
        self.select(name, col(name))
    }

    /// Adds a predicate
    pub fn where_(mut self, predicate: Expr) -> Self {
        self.where_.push(predicate);
        self
    }

    pub fn order_by(mut self, ordering: IndexedExpr) -> Self {
        self.order_by.push(ordering);
        self
    }

    pub fn group_by(mut self, expr: Expr) -> Self {
        self.group_by.push(expr);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn notablescan(mut self, notablescan: bool) -> Self {
        self.options.notablescan = Some(notablescan);
        self
    }

    pub fn explain(mut self) -> Self {
        self.options.explain = true;
        self
    }

    /// True when any select item is an aggregate call
    pub fn has_aggregates(&self) -> bool {
        self.select.iter().any(|(_, e)| e.is_aggregate())
    }
}

/// Insert statement: literal rows of (column, expression)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Insert {
    pub table: String,
    pub rows: Vec<Vec<(String, Expr)>>,
    pub options: QueryOptions,
}

impl Insert {
    pub fn into_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn row(mut self, row: Vec<(String, Expr)>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn explain(mut self) -> Self {
        self.options.explain = true;
        self
    }
}

/// Update statement
///
/// Assignments run in order; later ones see earlier results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Update {
    pub table: String,
    pub where_: Vec<Expr>,
    pub set: Vec<(String, Expr)>,
    pub options: QueryOptions,
}

impl Update {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn set(mut self, column: impl Into<String>, expr: Expr) -> Self {
        self.set.push((column.into(), expr));
        self
    }

    pub fn where_(mut self, predicate: Expr) -> Self {
        self.where_.push(predicate);
        self
    }

    pub fn notablescan(mut self, notablescan: bool) -> Self {
        self.options.notablescan = Some(notablescan);
        self
    }

    pub fn explain(mut self) -> Self {
        self.options.explain = true;
        self
    }
}

/// Delete statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delete {
    pub table: String,
    pub where_: Vec<Expr>,
    pub options: QueryOptions,
}

impl Delete {
    pub fn from_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn where_(mut self, predicate: Expr) -> Self {
        self.where_.push(predicate);
        self
    }

    pub fn notablescan(mut self, notablescan: bool) -> Self {
        self.options.notablescan = Some(notablescan);
        self
    }

    pub fn explain(mut self) -> Self {
        self.options.explain = true;
        self
    }
}

/// Any plannable statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Select(Query),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl From<Query> for Statement {
    fn from(q: Query) -> Self {
        Statement::Select(q)
    }
}

impl From<Insert> for Statement {
    fn from(i: Insert) -> Self {
        Statement::Insert(i)
    }
}

impl From<Update> for Statement {
    fn from(u: Update) -> Self {
        Statement::Update(u)
    }
}

impl From<Delete> for Statement {
    fn from(d: Delete) -> Self {
        Statement::Delete(d)
    }
}
