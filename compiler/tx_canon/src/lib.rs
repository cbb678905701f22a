//! Canonicalization passes over twin expressions.
//!
//! - [`simplify`]: constant folding and boolean algebra, idempotent
//! - [`unbound`]: the free variables and unknown functions of a tree

mod simplify;
pub mod unbound;

pub use simplify::simplify;
pub use unbound::{
    is_builtin_function, unbound, unbound_functions, unbound_variables, UnboundVariableOrFunction,
};
