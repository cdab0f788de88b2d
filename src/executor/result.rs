//! Execution result returned by the engine

use serde::Serialize;

use crate::expr::{Tuple, Value};
use crate::observability::StatsSnapshot;

/// Tuples produced by one plan evaluation plus its counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub tuples: Vec<Tuple>,
    pub stats: StatsSnapshot,
}

impl ExecutionResult {
    pub fn new(tuples: Vec<Tuple>, stats: StatsSnapshot) -> Self {
        Self { tuples, stats }
    }

    /// Returns the number of tuples
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Affected row count reported by a mutation plan
    pub fn affected(&self) -> Option<i64> {
        match self.tuples.as_slice() {
            [only] if only.len() == 1 => only.get("count").and_then(Value::as_int),
            _ => None,
        }
    }

    /// Values of one column, in result order
    pub fn column(&self, name: &str) -> Vec<Value> {
        self.tuples
            .iter()
            .map(|t| t.get(name).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affected_count() {
        let result = ExecutionResult::new(
            vec![Tuple::new().with("count", 3)],
            StatsSnapshot::default(),
        );
        assert_eq!(result.affected(), Some(3));
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_column() {
        let result = ExecutionResult::new(
            vec![Tuple::new().with("id", 1), Tuple::new().with("name", "x")],
            StatsSnapshot::default(),
        );
        assert_eq!(result.column("id"), vec![Value::Int(1), Value::Null]);
        assert_eq!(result.affected(), None);
    }

    #[test]
    fn test_serialize() {
        let result = ExecutionResult::new(
            vec![Tuple::new().with("id", 8).with("name", "Quincy")],
            StatsSnapshot {
                index_comparisons: 8,
                index_tuples_scanned: 7,
                table_tuples_scanned: 0,
            },
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["tuples"][0]["name"], "Quincy");
        assert_eq!(json["stats"]["index_tuples_scanned"], 7);
    }
}
