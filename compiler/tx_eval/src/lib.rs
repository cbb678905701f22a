//! Environment and evaluation for twin expressions.
//!
//! - [`Env`]: persistent, case-insensitive scope chain of bindings
//! - [`evaluate_direct`] / [`evaluate_with_env`]: tree-walking evaluation
//! - [`compile`]: typed predicates built once and run against many sources
//! - [`rebind`] / [`substitute`]: syntactic variable replacement
//!
//! Operators use direct enum dispatch (`evaluate_binary`, `evaluate_unary`).
//! Names resolve through the [`Source`] trait, which environments, twins and
//! any [`PropertyBag`](tx_ir::PropertyBag) implement.

mod compile;
mod env;
mod errors;
mod evaluate;
pub mod functions;
mod operators;
mod rebind;
mod source;

pub use compile::{compile, Compiled, FromValue};
pub use env::{Binding, BoundValue, Env, EnvError, EnvValue, FromBinding, RegisteredFunction};
pub use errors::{CompileError, EvalError, EvalResult};
pub use evaluate::{evaluate_direct, evaluate_with_env, Evaluator};
pub use operators::{evaluate_arithmetic, evaluate_binary, evaluate_unary, truthy};
pub use rebind::{rebind, substitute};
pub use source::{MlModel, MlModels, Source, TemporalSource, WithServices};
