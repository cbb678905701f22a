//! Direct evaluation of a bound tree against a [`Source`].
//!
//! Unresolved names and operand mismatches produce [`Value::Undefined`].
//! Trees that still contain `FAILED` or `EACH` nodes are errors: they must
//! be bound first.

use tx_ir::stack::ensure_sufficient_stack;
use tx_ir::unit::{self, Coercion};
use tx_ir::{AggregateFn, Expr, ExprKind, NaryOp, PropertyBag, PropertyValue, TemporalFn, Value};

use crate::env::Env;
use crate::errors::{EvalError, EvalResult};
use crate::functions::call_builtin;
use crate::operators::{evaluate_arithmetic, evaluate_binary, evaluate_unary, truthy};
use crate::rebind::substitute;
use crate::source::Source;

/// Evaluate `expr` reading names from `source`.
#[tracing::instrument(level = "debug", skip_all)]
pub fn evaluate_direct(expr: &Expr, source: &dyn Source) -> EvalResult {
    Evaluator::new(source).eval(expr)
}

/// Evaluate `expr` reading names from an environment.
pub fn evaluate_with_env(expr: &Expr, env: &Env) -> EvalResult {
    evaluate_direct(expr, env)
}

/// Tree-walking evaluator.
pub struct Evaluator<'a> {
    source: &'a dyn Source,
}

impl<'a> Evaluator<'a> {
    pub fn new(source: &'a dyn Source) -> Self {
        Evaluator { source }
    }

    pub fn eval(&self, expr: &Expr) -> EvalResult {
        ensure_sufficient_stack(|| self.eval_inner(expr))
    }

    fn eval_inner(&self, expr: &Expr) -> EvalResult {
        match expr.kind() {
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Double(d) => Ok(Value::Double(*d)),
            ExprKind::Str(s) => Ok(Value::String(s.clone())),
            ExprKind::DateTime(d) => Ok(Value::DateTime(*d)),
            ExprKind::Variable(name) => Ok(self.variable(name)),
            ExprKind::Property { .. } => self.property(expr),
            ExprKind::Array(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            ExprKind::Unary { op, operand } => evaluate_unary(&self.eval(operand)?, *op),
            ExprKind::Binary { op, left, right } => {
                Ok(evaluate_binary(&self.eval(left)?, &self.eval(right)?, *op))
            }
            ExprKind::Nary { op, children } if op.is_logical() => {
                self.logical(*op, children.iter().map(|child| self.eval(child)))
            }
            ExprKind::Nary { op, children } => {
                let values = children
                    .iter()
                    .map(|child| self.eval(child))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(evaluate_arithmetic(&values, *op))
            }
            ExprKind::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.eval(cond)?;
                if cond.is_undefined() {
                    Ok(Value::Undefined)
                } else if truthy(&cond)? {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            ExprKind::Call { name, args } => self.call(name, args),
            ExprKind::Aggregate { func, arg } => aggregate(*func, self.eval(arg)?),
            ExprKind::Temporal {
                func,
                arg,
                period,
                until,
            } => self.temporal(*func, arg, period, until.as_deref()),
            ExprKind::Each { .. } => Err(EvalError::Unbound { what: "EACH" }),
            ExprKind::Failed { reason, .. } => Err(EvalError::FailedExpression {
                reason: reason.clone(),
            }),
            ExprKind::Twin(twin) => Ok(Value::Twin(twin.clone())),
            // Objects have no value type of their own. They evaluate to their
            // JSON text, which `read_path` parses again when a property is
            // read from a computed object.
            ExprKind::Object(map) => Ok(Value::String(map.to_json())),
        }
    }

    pub(crate) fn variable(&self, name: &str) -> Value {
        self.source.variable(name).unwrap_or(Value::Undefined)
    }

    /// Short-circuiting `&` / `|` over lazily evaluated operands.
    pub(crate) fn logical(
        &self,
        op: NaryOp,
        operands: impl Iterator<Item = EvalResult>,
    ) -> EvalResult {
        let stop_on = op == NaryOp::Or;
        for operand in operands {
            let value = operand?;
            if value.is_undefined() {
                return Ok(Value::Undefined);
            }
            if truthy(&value)? == stop_on {
                return Ok(Value::Bool(stop_on));
            }
        }
        Ok(Value::Bool(!stop_on))
    }

    /// `a.b.c`: the root is read as an object when the source has one,
    /// otherwise evaluated and read as a twin or JSON text.
    fn property(&self, expr: &Expr) -> EvalResult {
        let mut path = Vec::new();
        let mut root = expr;
        while let ExprKind::Property { target, name } = root.kind() {
            path.push(name.as_str());
            root = target;
        }
        path.reverse();

        let found = match root.kind() {
            ExprKind::Object(map) => map.property_path(&path),
            ExprKind::Variable(name) => match self.source.object(name) {
                Some(PropertyValue::Object(map)) => map.property_path(&path),
                _ => read_path(&self.variable(name), &path),
            },
            _ => read_path(&self.eval(root)?, &path),
        };
        Ok(found.map_or(Value::Undefined, |p| Value::from(&p)))
    }

    fn call(&self, name: &str, args: &[Expr]) -> EvalResult {
        let upper = name.to_ascii_uppercase();
        match upper.as_str() {
            "OPTION" | "TOLERANTOPTION" => {
                for arg in args {
                    match self.eval(arg) {
                        Ok(value) if !value.is_undefined() => return Ok(value),
                        Ok(_) | Err(EvalError::FailedExpression { .. }) => {}
                        Err(other) => return Err(other),
                    }
                }
                return Ok(Value::Undefined);
            }
            "EXISTS" => {
                let exists = match args {
                    [arg] => self.eval(arg).is_ok_and(|v| !v.is_undefined()),
                    _ => false,
                };
                return Ok(Value::Bool(exists));
            }
            _ => {}
        }

        if let Some(coercion) = Coercion::from_name(name) {
            let [arg] = args else {
                return Ok(Value::Undefined);
            };
            return Ok(match self.eval(arg)? {
                Value::Double(d) => coercion
                    .conversion(arg.unit())
                    .apply(d)
                    .map_or(Value::Undefined, Value::Double),
                other if coercion.conversion(arg.unit()) == unit::Conversion::Keep => other,
                _ => Value::Undefined,
            });
        }

        let values = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(value) = call_builtin(name, &values) {
            return Ok(value);
        }
        if let Some(model) = self.source.ml_models().and_then(|m| m.model(name)) {
            return Ok(model.run(&values));
        }
        if let Some(function) = self.source.function(name) {
            if function.params.len() != values.len() {
                tracing::debug!(function = name, "macro called with the wrong number of arguments");
                return Ok(Value::Undefined);
            }
            let mut env = Env::empty().push();
            for (param, value) in function.params.iter().zip(values) {
                env = match env.assign(param, value) {
                    Ok(env) => env,
                    Err(_) => return Ok(Value::Undefined),
                };
            }
            return self.eval(&substitute(&function.body, &env));
        }

        tracing::debug!(function = name, "unknown function");
        Ok(Value::Undefined)
    }

    fn temporal(
        &self,
        func: TemporalFn,
        arg: &Expr,
        period: &Expr,
        until: Option<&Expr>,
    ) -> EvalResult {
        if let Some(items) = arg.as_array() {
            if func != TemporalFn::Stnd {
                return Err(EvalError::TemporalOverArray(func));
            }
            let values = items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(numbers(&values).map_or(Value::Undefined, |n| {
                Value::Double(standard_deviation(&n))
            }));
        }

        let period = self.seconds(Some(period))?;
        let until = self.seconds(until)?.unwrap_or(0.0);
        let history = self.source.temporal();
        if let (Some(history), Some(name), Some(period)) = (history, arg.as_variable(), period) {
            if let Some(value) = history.window(func, name, period, until) {
                return Ok(value);
            }
        }

        // Without history a value has no change and no spread.
        match func {
            TemporalFn::Delta | TemporalFn::DeltaTime | TemporalFn::Stnd | TemporalFn::Slope => {
                Ok(Value::Double(0.0))
            }
            _ => self.eval(arg),
        }
    }

    /// A time span like `1h` in seconds. `-1h` counts as `1h`.
    fn seconds(&self, span: Option<&Expr>) -> Result<Option<f64>, EvalError> {
        let Some(span) = span else {
            return Ok(None);
        };
        let (inner, unit) = match span.kind() {
            ExprKind::Unary {
                op: tx_ir::UnaryOp::Minus,
                operand,
            } => (&**operand, operand.unit()),
            _ => (span, span.unit()),
        };
        let Some(unit) = unit else {
            return Ok(None);
        };
        Ok(match self.eval(inner)? {
            Value::Double(amount) => unit::to_seconds(amount.abs(), unit),
            _ => None,
        })
    }
}

fn read_path(value: &Value, path: &[&str]) -> Option<PropertyValue> {
    match value {
        Value::Twin(twin) => twin.property_path(path),
        Value::String(text) => match serde_json::from_str(text).ok()? {
            serde_json::Value::Object(map) => map.property_path(path),
            _ => None,
        },
        _ => None,
    }
}

fn numbers(values: &[Value]) -> Option<Vec<f64>> {
    values
        .iter()
        .map(|v| match v {
            Value::Double(d) => Some(*d),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        })
        .collect()
}

#[expect(clippy::cast_precision_loss, reason = "element counts are small")]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn standard_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let squares: Vec<f64> = values.iter().map(|v| (v - m).powi(2)).collect();
    mean(&squares).sqrt()
}

/// Apply an aggregate to an evaluated argument. Scalars pass through,
/// except `COUNT`, which counts a true scalar as one.
pub(crate) fn aggregate(func: AggregateFn, value: Value) -> EvalResult {
    let items = match value {
        Value::Array(items) => items,
        Value::Undefined => return Ok(Value::Undefined),
        scalar if func == AggregateFn::Count => {
            return Ok(Value::Double(if truthy(&scalar)? { 1.0 } else { 0.0 }));
        }
        scalar => return Ok(scalar),
    };
    if items.iter().any(Value::is_undefined) {
        return Ok(Value::Undefined);
    }

    match func {
        AggregateFn::First => Ok(items.into_iter().next().unwrap_or(Value::Undefined)),
        AggregateFn::Any | AggregateFn::All | AggregateFn::Count => {
            let flags = items.iter().map(truthy).collect::<Result<Vec<_>, _>>()?;
            Ok(match func {
                AggregateFn::Any => Value::Bool(flags.iter().any(|b| *b)),
                AggregateFn::All => Value::Bool(flags.iter().all(|b| *b)),
                _ => {
                    #[expect(clippy::cast_precision_loss, reason = "element counts are small")]
                    let count = flags.iter().filter(|b| **b).count() as f64;
                    Value::Double(count)
                }
            })
        }
        AggregateFn::Sum | AggregateFn::Average | AggregateFn::Min | AggregateFn::Max => {
            let Some(numbers) = numbers(&items) else {
                return Ok(Value::Undefined);
            };
            if numbers.is_empty() && func != AggregateFn::Sum {
                return Err(EvalError::EmptyAggregate(func));
            }
            Ok(Value::Double(match func {
                AggregateFn::Sum => numbers.iter().sum(),
                AggregateFn::Average => mean(&numbers),
                AggregateFn::Min => numbers.iter().copied().fold(f64::INFINITY, f64::min),
                _ => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }))
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
