//! Typed predicates compiled from bound trees.
//!
//! [`compile`] checks the tree's static type against the requested result
//! type once, then turns the tree into nested closures. Operators, logic,
//! branches and built-in calls become closures of their own; anything that
//! needs a name-aware walk (properties, temporals, macros) falls back to the
//! tree-walking [`Evaluator`] for that subtree.

use std::fmt;
use std::marker::PhantomData;

use tx_ir::stack::ensure_sufficient_stack;
use tx_ir::{DateTime, Expr, ExprKind, Value, ValueType};

use crate::errors::{CompileError, EvalResult};
use crate::evaluate::{aggregate, Evaluator};
use crate::functions::{call_builtin, is_builtin};
use crate::operators::{evaluate_arithmetic, evaluate_binary, evaluate_unary, truthy};
use crate::source::Source;

/// A result type a compiled expression can produce.
pub trait FromValue: Sized {
    const VALUE_TYPE: ValueType;

    fn from_value(value: &Value) -> Option<Self>;

    /// Whether a tree of static type `found` can produce `Self`.
    fn accepts(found: ValueType) -> bool {
        found == Self::VALUE_TYPE || found == ValueType::Unknown
    }
}

impl FromValue for bool {
    const VALUE_TYPE: ValueType = ValueType::Bool;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(_) | Value::Double(_) => value.as_bool().ok(),
            _ => None,
        }
    }

    fn accepts(found: ValueType) -> bool {
        matches!(found, ValueType::Bool | ValueType::Double | ValueType::Unknown)
    }
}

impl FromValue for f64 {
    const VALUE_TYPE: ValueType = ValueType::Double;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(_) | Value::Double(_) => value.as_f64().ok(),
            _ => None,
        }
    }
}

impl FromValue for String {
    const VALUE_TYPE: ValueType = ValueType::String;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().ok().map(str::to_owned)
    }
}

impl FromValue for DateTime {
    const VALUE_TYPE: ValueType = ValueType::DateTime;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_datetime().ok()
    }
}

type Node = Box<dyn Fn(&Evaluator<'_>) -> EvalResult + Send + Sync>;

/// A compiled expression producing `T`.
pub struct Compiled<T> {
    node: Node,
    expr: Expr,
    _result: PhantomData<fn() -> T>,
}

impl<T: FromValue> Compiled<T> {
    /// Run against `source`. `None` when the result is undefined, of another
    /// type, or evaluation fails.
    pub fn evaluate(&self, source: &dyn Source) -> Option<T> {
        match (self.node)(&Evaluator::new(source)) {
            Ok(value) => T::from_value(&value),
            Err(error) => {
                tracing::debug!(%error, expr = %self.expr, "compiled expression failed");
                None
            }
        }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl<T> fmt::Debug for Compiled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiled").field("expr", &self.expr).finish_non_exhaustive()
    }
}

/// Compile `expr` into a predicate producing `T`.
#[tracing::instrument(level = "debug", skip_all)]
pub fn compile<T: FromValue>(expr: &Expr) -> Result<Compiled<T>, CompileError> {
    let source_type = expr.value_type();
    if !T::accepts(source_type) {
        return Err(CompileError::TypeMismatch {
            source_type,
            dest_type: T::VALUE_TYPE,
            expr: tx_fmt::serialize(expr),
        });
    }
    Ok(Compiled {
        node: build(expr),
        expr: expr.clone(),
        _result: PhantomData,
    })
}

fn node(f: impl Fn(&Evaluator<'_>) -> EvalResult + Send + Sync + 'static) -> Node {
    Box::new(f)
}

fn build(expr: &Expr) -> Node {
    ensure_sufficient_stack(|| build_inner(expr))
}

fn build_all(exprs: &[Expr]) -> Vec<Node> {
    exprs.iter().map(build).collect()
}

fn run_all(nodes: &[Node], ev: &Evaluator<'_>) -> Result<Vec<Value>, crate::EvalError> {
    nodes.iter().map(|node| node(ev)).collect()
}

fn build_inner(expr: &Expr) -> Node {
    if let Some(value) = expr.constant_value() {
        return node(move |_: &Evaluator<'_>| Ok(value.clone()));
    }
    match expr.kind() {
        ExprKind::Variable(name) => {
            let name = name.clone();
            node(move |ev: &Evaluator<'_>| Ok(ev.variable(&name)))
        }
        ExprKind::Array(items) => {
            let items = build_all(items);
            node(move |ev: &Evaluator<'_>| run_all(&items, ev).map(Value::Array))
        }
        ExprKind::Unary { op, operand } => {
            let (op, operand) = (*op, build(operand));
            node(move |ev: &Evaluator<'_>| evaluate_unary(&operand(ev)?, op))
        }
        ExprKind::Binary { op, left, right } => {
            let (op, left, right) = (*op, build(left), build(right));
            node(move |ev: &Evaluator<'_>| Ok(evaluate_binary(&left(ev)?, &right(ev)?, op)))
        }
        ExprKind::Nary { op, children } if op.is_logical() => {
            let (op, children) = (*op, build_all(children));
            node(move |ev: &Evaluator<'_>| ev.logical(op, children.iter().map(|child| child(ev))))
        }
        ExprKind::Nary { op, children } => {
            let (op, children) = (*op, build_all(children));
            node(move |ev: &Evaluator<'_>| Ok(evaluate_arithmetic(&run_all(&children, ev)?, op)))
        }
        ExprKind::If {
            cond,
            then,
            otherwise,
        } => {
            let (cond, then, otherwise) = (build(cond), build(then), build(otherwise));
            node(move |ev: &Evaluator<'_>| {
                let cond = cond(ev)?;
                if cond.is_undefined() {
                    Ok(Value::Undefined)
                } else if truthy(&cond)? {
                    then(ev)
                } else {
                    otherwise(ev)
                }
            })
        }
        ExprKind::Aggregate { func, arg } => {
            let (func, arg) = (*func, build(arg));
            node(move |ev: &Evaluator<'_>| aggregate(func, arg(ev)?))
        }
        ExprKind::Call { name, args } if is_builtin(name) => {
            let (name, args) = (name.clone(), build_all(args));
            node(move |ev: &Evaluator<'_>| {
                let values = run_all(&args, ev)?;
                Ok(call_builtin(&name, &values).unwrap_or(Value::Undefined))
            })
        }
        _ => {
            let expr = expr.clone();
            node(move |ev: &Evaluator<'_>| ev.eval(&expr))
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
