//! Evaluation and compilation errors.
//!
//! Unresolved names and type mismatches between operands are not errors:
//! they evaluate to [`Value::Undefined`](tx_ir::Value::Undefined). The
//! variants here are for trees that cannot be evaluated at all.

use tx_ir::{AggregateFn, TemporalFn, ValueType};

/// Result of evaluating one node.
pub type EvalResult = Result<tx_ir::Value, EvalError>;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("{} applied to an array with no elements", .0.name())]
    EmptyAggregate(AggregateFn),

    #[error("cannot calculate a failed expression: {reason}")]
    FailedExpression { reason: String },

    #[error("cannot evaluate {what}, bind it first")]
    Unbound { what: &'static str },

    #[error("value is not convertible to a boolean: {found}")]
    NotBoolean { found: ValueType },

    #[error("cannot {} without time", .0.name())]
    TemporalOverArray(TemporalFn),
}

/// A compiled expression cannot produce the requested type.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("expression '{expr}' has type {source_type}, expected {dest_type}")]
    TypeMismatch {
        source_type: ValueType,
        dest_type: ValueType,
        expr: String,
    },
}

#[cold]
pub(crate) fn not_boolean(found: ValueType) -> EvalError {
    EvalError::NotBoolean { found }
}
