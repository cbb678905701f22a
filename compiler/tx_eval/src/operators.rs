//! Operator implementations for the evaluator.
//!
//! Direct enum dispatch on the operand pair. Numbers and booleans mix: a
//! number compared against a boolean counts as `true` when positive.
//! Operand combinations with no meaning evaluate to `Undefined`.

use std::cmp::Ordering;

use tx_ir::{BinaryOp, NaryOp, UnaryOp, Value};

use crate::errors::{not_boolean, EvalResult};

/// Evaluate a binary operation on two evaluated operands.
pub fn evaluate_binary(left: &Value, right: &Value, op: BinaryOp) -> Value {
    match (left, right) {
        (Value::Undefined, _) | (_, Value::Undefined) => Value::Undefined,
        (Value::Double(a), Value::Double(b)) => eval_double_binary(*a, *b, op),
        (Value::Bool(a), Value::Bool(b)) => eval_bool_binary(*a, *b, op),
        (Value::Bool(a), Value::Double(b)) => eval_bool_binary(*a, *b > 0.0, op),
        (Value::Double(a), Value::Bool(b)) => eval_bool_binary(*a > 0.0, *b, op),
        (Value::String(a), Value::String(b)) => compare(a.cmp(b), op),
        (Value::DateTime(a), Value::DateTime(b)) => match op {
            BinaryOp::Sub => Value::Double((*a - *b).as_seconds_f64()),
            _ => compare(a.cmp(b), op),
        },
        (Value::Twin(a), Value::Twin(b)) => match op {
            BinaryOp::Eq | BinaryOp::Is => Value::Bool(a == b),
            BinaryOp::NotEq => Value::Bool(a != b),
            _ => Value::Undefined,
        },
        (Value::Null, Value::Null) => match op {
            BinaryOp::Eq | BinaryOp::Is => Value::Bool(true),
            BinaryOp::NotEq => Value::Bool(false),
            _ => Value::Undefined,
        },
        _ => Value::Undefined,
    }
}

fn eval_double_binary(a: f64, b: f64, op: BinaryOp) -> Value {
    match op {
        BinaryOp::Sub => Value::Double(a - b),
        BinaryOp::Div => Value::Double(a / b),
        BinaryOp::Pow => Value::Double(a.powf(b)),
        BinaryOp::Eq | BinaryOp::Is => Value::Bool(a == b),
        BinaryOp::NotEq => Value::Bool(a != b),
        BinaryOp::Lt => Value::Bool(a < b),
        BinaryOp::LtEq => Value::Bool(a <= b),
        BinaryOp::Gt => Value::Bool(a > b),
        BinaryOp::GtEq => Value::Bool(a >= b),
    }
}

/// Booleans order `false < true`.
fn eval_bool_binary(a: bool, b: bool, op: BinaryOp) -> Value {
    match op {
        BinaryOp::Sub | BinaryOp::Div | BinaryOp::Pow => Value::Undefined,
        _ => compare(a.cmp(&b), op),
    }
}

fn compare(ordering: Ordering, op: BinaryOp) -> Value {
    match op {
        BinaryOp::Eq | BinaryOp::Is => Value::Bool(ordering.is_eq()),
        BinaryOp::NotEq => Value::Bool(ordering.is_ne()),
        BinaryOp::Lt => Value::Bool(ordering.is_lt()),
        BinaryOp::LtEq => Value::Bool(ordering.is_le()),
        BinaryOp::Gt => Value::Bool(ordering.is_gt()),
        BinaryOp::GtEq => Value::Bool(ordering.is_ge()),
        BinaryOp::Sub | BinaryOp::Div | BinaryOp::Pow => Value::Undefined,
    }
}

/// Evaluate a unary operation.
///
/// `!` on something that is neither a boolean nor a number is an error,
/// not `Undefined`.
pub fn evaluate_unary(value: &Value, op: UnaryOp) -> EvalResult {
    match (value, op) {
        (Value::Undefined, _) => Ok(Value::Undefined),
        (Value::Double(d), UnaryOp::Minus) => Ok(Value::Double(-d)),
        (_, UnaryOp::Minus) => Ok(Value::Undefined),
        (_, UnaryOp::Not) => truthy(value).map(|b| Value::Bool(!b)),
    }
}

/// Fold evaluated operands of `+` or `*`.
pub fn evaluate_arithmetic(values: &[Value], op: NaryOp) -> Value {
    let (seed, combine): (f64, fn(f64, f64) -> f64) = match op {
        NaryOp::Add => (0.0, |a, b| a + b),
        NaryOp::Mul => (1.0, |a, b| a * b),
        NaryOp::And | NaryOp::Or => return Value::Undefined,
    };
    let mut total = seed;
    for value in values {
        match value {
            Value::Double(d) => total = combine(total, *d),
            Value::Bool(b) => total = combine(total, if *b { 1.0 } else { 0.0 }),
            _ => return Value::Undefined,
        }
    }
    Value::Double(total)
}

/// Boolean reading of a logical operand: numbers are `true` when positive.
pub fn truthy(value: &Value) -> Result<bool, crate::EvalError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Double(d) => Ok(*d > 0.0),
        other => Err(not_boolean(other.value_type())),
    }
}
