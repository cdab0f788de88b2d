//! Expression tree and evaluation
//!
//! A closed set of variants evaluated against a tuple. Comparisons use the
//! total value order so that a filter and an index scan agree on every key.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{ExprError, ExprResult};
use super::value::{Tuple, Value};

/// Scalar functions callable per tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarFunction {
    Upper,
    Lower,
}

impl ScalarFunction {
    /// Looks up a scalar function by name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "upper" => Some(ScalarFunction::Upper),
            "lower" => Some(ScalarFunction::Lower),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarFunction::Upper => "upper",
            ScalarFunction::Lower => "lower",
        }
    }

    fn apply(&self, args: Vec<Value>) -> ExprResult<Value> {
        let [arg]: [Value; 1] = args.try_into().map_err(|args: Vec<Value>| {
            ExprError::invalid_argument(format!(
                "{} expects 1 argument, got {}",
                self.as_str(),
                args.len()
            ))
        })?;

        match arg {
            Value::Null => Ok(Value::Null),
            Value::String(s) => Ok(Value::String(match self {
                ScalarFunction::Upper => s.to_uppercase(),
                ScalarFunction::Lower => s.to_lowercase(),
            })),
            other => Err(ExprError::invalid_argument(format!(
                "{} expects a string, got {}",
                self.as_str(),
                other.type_name()
            ))),
        }
    }
}

/// Aggregate functions, evaluated only by aggregation plan nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Max,
}

impl AggregateFunction {
    /// Looks up an aggregate function by name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(AggregateFunction::Count),
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Avg),
            "max" => Some(AggregateFunction::Max),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Max => "max",
        }
    }
}

/// Expression variants
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Column(String),
    Literal(Value),
    Eq(Box<Expr>, Box<Expr>),
    Neq(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    Gte(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    Lte(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    In(Box<Expr>, Vec<Expr>),
    FnCall(ScalarFunction, Vec<Expr>),
    Aggregate(AggregateFunction, Vec<Expr>),
}

impl Expr {
    /// Resolves a function call by name
    ///
    /// Aggregate names take precedence, so `count(x)` always becomes an
    /// aggregate expression.
    pub fn function(name: &str, args: Vec<Expr>) -> ExprResult<Expr> {
        if let Some(agg) = AggregateFunction::from_name(name) {
            return Ok(Expr::Aggregate(agg, args));
        }
        if let Some(f) = ScalarFunction::from_name(name) {
            return Ok(Expr::FnCall(f, args));
        }
        Err(ExprError::unknown_function(name))
    }

    /// Evaluates the expression against a tuple
    pub fn eval(&self, tuple: &Tuple) -> ExprResult<Value> {
        match self {
            Expr::Column(name) => Ok(tuple.get(name).cloned().unwrap_or(Value::Null)),
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Eq(l, r) => compare(l, r, tuple, |o| o == Ordering::Equal),
            Expr::Neq(l, r) => compare(l, r, tuple, |o| o != Ordering::Equal),
            Expr::Gt(l, r) => compare(l, r, tuple, |o| o == Ordering::Greater),
            Expr::Gte(l, r) => compare(l, r, tuple, |o| o != Ordering::Less),
            Expr::Lt(l, r) => compare(l, r, tuple, |o| o == Ordering::Less),
            Expr::Lte(l, r) => compare(l, r, tuple, |o| o != Ordering::Greater),
            Expr::And(l, r) => {
                if !l.eval(tuple)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(r.eval(tuple)?.is_truthy()))
            }
            Expr::Or(l, r) => {
                if l.eval(tuple)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(r.eval(tuple)?.is_truthy()))
            }
            Expr::In(e, list) => {
                let needle = e.eval(tuple)?;
                for item in list {
                    if item.eval(tuple)? == needle {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            Expr::FnCall(f, args) => {
                let values = args
                    .iter()
                    .map(|a| a.eval(tuple))
                    .collect::<ExprResult<Vec<_>>>()?;
                f.apply(values)
            }
            Expr::Aggregate(..) => Err(ExprError::aggregate_context(self.to_string())),
        }
    }

    /// Evaluates the expression as a predicate
    pub fn matches(&self, tuple: &Tuple) -> ExprResult<bool> {
        Ok(self.eval(tuple)?.is_truthy())
    }

    /// True for aggregate function calls
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expr::Aggregate(..))
    }

    /// Returns the literal payload for `Literal` expressions
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Expr::Literal(v) => Some(v),
            _ => None,
        }
    }
}

fn compare(
    l: &Expr,
    r: &Expr,
    tuple: &Tuple,
    accept: impl Fn(Ordering) -> bool,
) -> ExprResult<Value> {
    let left = l.eval(tuple)?;
    let right = r.eval(tuple)?;
    Ok(Value::Bool(accept(left.cmp(&right))))
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "{}", name),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Eq(l, r) => write!(f, "{} = {}", l, r),
            Expr::Neq(l, r) => write!(f, "{} != {}", l, r),
            Expr::Gt(l, r) => write!(f, "{} > {}", l, r),
            Expr::Gte(l, r) => write!(f, "{} >= {}", l, r),
            Expr::Lt(l, r) => write!(f, "{} < {}", l, r),
            Expr::Lte(l, r) => write!(f, "{} <= {}", l, r),
            Expr::And(l, r) => write!(f, "({} AND {})", l, r),
            Expr::Or(l, r) => write!(f, "({} OR {})", l, r),
            Expr::In(e, list) => {
                write!(f, "{} IN (", e)?;
                write_list(f, list)?;
                write!(f, ")")
            }
            Expr::FnCall(func, args) => {
                write!(f, "{}(", func.as_str())?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::Aggregate(func, args) => {
                write!(f, "{}(", func.as_str())?;
                if args.is_empty() {
                    write!(f, "*")?;
                }
                write_list(f, args)?;
                write!(f, ")")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, list: &[Expr]) -> fmt::Result {
    for (i, e) in list.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", e)?;
    }
    Ok(())
}

// Constructors

pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

pub fn eq(l: Expr, r: Expr) -> Expr {
    Expr::Eq(Box::new(l), Box::new(r))
}

pub fn neq(l: Expr, r: Expr) -> Expr {
    Expr::Neq(Box::new(l), Box::new(r))
}

pub fn gt(l: Expr, r: Expr) -> Expr {
    Expr::Gt(Box::new(l), Box::new(r))
}

pub fn gte(l: Expr, r: Expr) -> Expr {
    Expr::Gte(Box::new(l), Box::new(r))
}

pub fn lt(l: Expr, r: Expr) -> Expr {
    Expr::Lt(Box::new(l), Box::new(r))
}

pub fn lte(l: Expr, r: Expr) -> Expr {
    Expr::Lte(Box::new(l), Box::new(r))
}

pub fn and(l: Expr, r: Expr) -> Expr {
    Expr::And(Box::new(l), Box::new(r))
}

pub fn or(l: Expr, r: Expr) -> Expr {
    Expr::Or(Box::new(l), Box::new(r))
}

pub fn in_list(e: Expr, list: Vec<Expr>) -> Expr {
    Expr::In(Box::new(e), list)
}

pub fn upper(e: Expr) -> Expr {
    Expr::FnCall(ScalarFunction::Upper, vec![e])
}

pub fn lower(e: Expr) -> Expr {
    Expr::FnCall(ScalarFunction::Lower, vec![e])
}

/// `count(*)`
pub fn count() -> Expr {
    Expr::Aggregate(AggregateFunction::Count, Vec::new())
}

pub fn sum(e: Expr) -> Expr {
    Expr::Aggregate(AggregateFunction::Sum, vec![e])
}

pub fn avg(e: Expr) -> Expr {
    Expr::Aggregate(AggregateFunction::Avg, vec![e])
}

pub fn max(e: Expr) -> Expr {
    Expr::Aggregate(AggregateFunction::Max, vec![e])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprErrorCode;

    fn row() -> Tuple {
        Tuple::new().with("id", 8).with("name", "Quincy").with("active", true)
    }

    #[test]
    fn test_column_and_literal() {
        assert_eq!(col("id").eval(&row()).unwrap(), Value::Int(8));
        assert_eq!(col("missing").eval(&row()).unwrap(), Value::Null);
        assert_eq!(lit("x").eval(&row()).unwrap(), Value::from("x"));
    }

    #[test]
    fn test_comparisons() {
        let t = row();
        assert!(eq(col("id"), lit(8)).matches(&t).unwrap());
        assert!(neq(col("id"), lit(9)).matches(&t).unwrap());
        assert!(gt(col("name"), lit("Kathleen")).matches(&t).unwrap());
        assert!(gte(col("id"), lit(8)).matches(&t).unwrap());
        assert!(!lt(col("id"), lit(8)).matches(&t).unwrap());
        assert!(lte(col("id"), lit(8)).matches(&t).unwrap());
    }

    #[test]
    fn test_null_compares_below_everything() {
        let t = Tuple::new().with("x", Value::Null);
        assert!(lt(col("x"), lit(false)).matches(&t).unwrap());
        assert!(eq(col("x"), lit(Value::Null)).matches(&t).unwrap());
    }

    #[test]
    fn test_boolean_connectives() {
        let t = row();
        assert!(and(eq(col("id"), lit(8)), col("active")).matches(&t).unwrap());
        assert!(or(eq(col("id"), lit(1)), col("active")).matches(&t).unwrap());
        assert!(!and(col("missing"), col("active")).matches(&t).unwrap());
    }

    #[test]
    fn test_in_list() {
        let t = row();
        assert!(in_list(col("id"), vec![lit(1), lit(8)]).matches(&t).unwrap());
        assert!(!in_list(col("id"), vec![lit(1), lit(2)]).matches(&t).unwrap());
    }

    #[test]
    fn test_scalar_functions() {
        let t = row();
        assert_eq!(upper(col("name")).eval(&t).unwrap(), Value::from("QUINCY"));
        assert_eq!(lower(col("name")).eval(&t).unwrap(), Value::from("quincy"));
        assert_eq!(upper(col("missing")).eval(&t).unwrap(), Value::Null);

        let err = upper(col("id")).eval(&t).unwrap_err();
        assert_eq!(err.code(), ExprErrorCode::StrataExprInvalidArgument);
    }

    #[test]
    fn test_function_lookup_detects_aggregates() {
        assert!(Expr::function("COUNT", vec![]).unwrap().is_aggregate());
        assert!(!Expr::function("upper", vec![col("name")]).unwrap().is_aggregate());
        assert_eq!(
            Expr::function("nope", vec![]).unwrap_err().code(),
            ExprErrorCode::StrataExprUnknownFunction
        );
    }

    #[test]
    fn test_aggregate_not_evaluable_per_tuple() {
        let err = count().eval(&row()).unwrap_err();
        assert_eq!(err.code(), ExprErrorCode::StrataExprAggregateContext);
    }

    #[test]
    fn test_display() {
        assert_eq!(upper(col("name")).to_string(), "upper(name)");
        assert_eq!(eq(col("name"), lit("Cara")).to_string(), "name = 'Cara'");
        assert_eq!(count().to_string(), "count(*)");
    }
}
