//! Aggregate state machines
//!
//! Each aggregate follows init, reduce per tuple, optionally combine with
//! partial states from elsewhere, then render. Partial states are written
//! as plain columns so they can travel through an `Append`.

use std::fmt;

use crate::expr::{AggregateFunction, Expr, Tuple, Value};

use super::errors::{ExecutorError, ExecutorResult};

/// One aggregate in a select list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSpec {
    pub alias: String,
    pub func: AggregateFunction,
    pub arg: Option<Expr>,
}

impl AggregateSpec {
    pub fn new(alias: impl Into<String>, func: AggregateFunction, arg: Option<Expr>) -> Self {
        Self {
            alias: alias.into(),
            func,
            arg,
        }
    }

    /// Builds a spec from an `Expr::Aggregate`; `None` for anything else
    pub fn from_expr(alias: impl Into<String>, expr: &Expr) -> Option<Self> {
        match expr {
            Expr::Aggregate(func, args) => Some(Self::new(alias, *func, args.first().cloned())),
            _ => None,
        }
    }

    /// Evaluates the argument; sum, avg and max need a non-null one
    fn input(&self, tuple: &Tuple) -> ExecutorResult<Value> {
        let arg = self
            .arg
            .as_ref()
            .ok_or_else(|| ExecutorError::aggregate_evaluation(&self.to_string(), "missing argument"))?;
        let value = arg.eval(tuple)?;
        if value.is_null() {
            return Err(ExecutorError::aggregate_evaluation(
                &self.to_string(),
                format!("null input in {}", tuple),
            ));
        }
        Ok(value)
    }

    fn int_input(&self, tuple: &Tuple) -> ExecutorResult<i64> {
        let value = self.input(tuple)?;
        value.as_int().ok_or_else(|| {
            ExecutorError::aggregate_evaluation(
                &self.to_string(),
                format!("expected int, got {}", value.type_name()),
            )
        })
    }
}

impl fmt::Display for AggregateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Some(arg) => write!(f, "{}({})", self.func.as_str(), arg),
            None => write!(f, "{}(*)", self.func.as_str()),
        }
    }
}

/// Running state of one aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggState {
    Count(i64),
    Sum(i64),
    /// `Null` until the first input
    Max(Value),
    Avg { sum: i64, count: i64 },
}

impl AggState {
    pub fn init(func: AggregateFunction) -> Self {
        match func {
            AggregateFunction::Count => AggState::Count(0),
            AggregateFunction::Sum => AggState::Sum(0),
            AggregateFunction::Max => AggState::Max(Value::Null),
            AggregateFunction::Avg => AggState::Avg { sum: 0, count: 0 },
        }
    }

    /// Folds one input tuple into the state
    pub fn reduce(&mut self, spec: &AggregateSpec, tuple: &Tuple) -> ExecutorResult<()> {
        match self {
            AggState::Count(n) => *n += 1,
            AggState::Sum(total) => {
                let v = spec.int_input(tuple)?;
                *total = checked(spec, total.checked_add(v))?;
            }
            AggState::Max(best) => {
                let v = spec.input(tuple)?;
                if v > *best {
                    *best = v;
                }
            }
            AggState::Avg { sum, count } => {
                let v = spec.int_input(tuple)?;
                *sum = checked(spec, sum.checked_add(v))?;
                *count += 1;
            }
        }
        Ok(())
    }

    /// Merges another partial state of the same aggregate
    pub fn combine(&mut self, spec: &AggregateSpec, other: AggState) -> ExecutorResult<()> {
        match (self, other) {
            (AggState::Count(a), AggState::Count(b)) => *a += b,
            (AggState::Sum(a), AggState::Sum(b)) => *a = checked(spec, a.checked_add(b))?,
            (AggState::Max(a), AggState::Max(b)) => {
                if b > *a {
                    *a = b;
                }
            }
            (
                AggState::Avg { sum, count },
                AggState::Avg {
                    sum: other_sum,
                    count: other_count,
                },
            ) => {
                *sum = checked(spec, sum.checked_add(other_sum))?;
                *count += other_count;
            }
            _ => {
                return Err(ExecutorError::aggregate_evaluation(
                    &spec.to_string(),
                    "partial state of a different aggregate",
                ))
            }
        }
        Ok(())
    }

    /// Final value
    pub fn render(&self) -> Value {
        match self {
            AggState::Count(n) | AggState::Sum(n) => Value::Int(*n),
            AggState::Max(v) => v.clone(),
            AggState::Avg { count: 0, .. } => Value::Int(0),
            AggState::Avg { sum, count } => Value::Int(sum / count),
        }
    }

    /// Writes mergeable state columns for `alias`
    pub fn write_partial(&self, alias: &str, tuple: &mut Tuple) {
        match self {
            AggState::Avg { sum, count } => {
                tuple.set(format!("{}.sum", alias), *sum);
                tuple.set(format!("{}.count", alias), *count);
            }
            other => tuple.set(alias, other.render()),
        }
    }

    /// Reads the state columns written by [`AggState::write_partial`]
    pub fn read_partial(spec: &AggregateSpec, tuple: &Tuple) -> ExecutorResult<Self> {
        let int_column = |column: String| -> ExecutorResult<i64> {
            tuple.get(&column).and_then(Value::as_int).ok_or_else(|| {
                ExecutorError::aggregate_evaluation(
                    &spec.to_string(),
                    format!("partial column '{}' missing or not an int", column),
                )
            })
        };

        Ok(match spec.func {
            AggregateFunction::Count => AggState::Count(int_column(spec.alias.clone())?),
            AggregateFunction::Sum => AggState::Sum(int_column(spec.alias.clone())?),
            AggregateFunction::Max => {
                AggState::Max(tuple.get(&spec.alias).cloned().unwrap_or(Value::Null))
            }
            AggregateFunction::Avg => AggState::Avg {
                sum: int_column(format!("{}.sum", spec.alias))?,
                count: int_column(format!("{}.count", spec.alias))?,
            },
        })
    }
}

fn checked(spec: &AggregateSpec, value: Option<i64>) -> ExecutorResult<i64> {
    value.ok_or_else(|| ExecutorError::aggregate_evaluation(&spec.to_string(), "integer overflow"))
}

/// Fresh states for a select list
pub(crate) fn init_states(specs: &[AggregateSpec]) -> Vec<AggState> {
    specs.iter().map(|s| AggState::init(s.func)).collect()
}

pub(crate) fn reduce_states(
    states: &mut [AggState],
    specs: &[AggregateSpec],
    tuple: &Tuple,
) -> ExecutorResult<()> {
    for (state, spec) in states.iter_mut().zip(specs) {
        state.reduce(spec, tuple)?;
    }
    Ok(())
}
