//! Explain output
//!
//! A recursive `(kind, params, children)` structure. Parameters are kept in
//! a sorted map so the rendered text is deterministic.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// One plan node as seen by `EXPLAIN`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainNode {
    pub kind: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ExplainNode>,
}

impl ExplainNode {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    pub fn child(mut self, child: ExplainNode) -> Self {
        self.children.push(child);
        self
    }

    /// Kinds in pre-order, handy for asserting plan shape
    pub fn kinds(&self) -> Vec<&str> {
        let mut out = vec![self.kind.as_str()];
        for child in &self.children {
            out.extend(child.kinds());
        }
        out
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"kind\":\"{}\"}}", self.kind))
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.kind, indent = depth * 2)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, " ({})", params.join(", "))?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ExplainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
