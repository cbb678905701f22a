//! Free-reference scanner.
//!
//! Lists the variables and functions a tree still depends on, before any
//! binding. `this` is always bound; names introduced by `EACH` are bound
//! inside its body.

use rustc_hash::FxHashSet;
use tx_ir::stack::ensure_sufficient_stack;
use tx_ir::{Expr, ExprKind};

/// A free name and whether it is called as a function.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnboundVariableOrFunction {
    pub name: String,
    pub is_function: bool,
}

impl UnboundVariableOrFunction {
    pub fn variable(name: impl Into<String>) -> Self {
        UnboundVariableOrFunction {
            name: name.into(),
            is_function: false,
        }
    }

    pub fn function(name: impl Into<String>) -> Self {
        UnboundVariableOrFunction {
            name: name.into(),
            is_function: true,
        }
    }
}

/// Functions every evaluator and binder knows about.
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    // math
    "ABS", "ACOS", "ASIN", "ATAN", "ATAN2", "CEILING", "COS", "DEADBAND", "FLOOR", "IFNAN",
    "ISNAN", "LOG", "LOG10", "POW", "ROUND", "SIGN", "SIN", "SQRT", "TAN",
    // dates
    "DAY", "DAYOFWEEK", "HOUR", "MINUTE", "MONTH",
    // strings
    "CONTAINS", "ENDSWITH", "STARTSWITH", "TOLOWER", "TOUPPER", "TRIM",
    // binding
    "OPTION", "TOLERANTOPTION", "EXISTS", "COUNT_BINDINGS", "TOLERANCE",
    // units
    "CELSIUS", "CELCIUS", "FAHRENHEIT", "FARENHEIT", "FARHENHEIT", "METRIC", "PERCENTAGE",
    "PERCENT",
];

pub fn is_builtin_function(name: &str) -> bool {
    BUILTIN_FUNCTIONS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(name))
}

/// Distinct free references, in first-seen order.
pub fn unbound(expr: &Expr) -> Vec<UnboundVariableOrFunction> {
    let mut scanner = Scanner::default();
    scanner.visit(expr);
    scanner.found
}

/// Distinct free variable names.
pub fn unbound_variables(expr: &Expr) -> Vec<String> {
    unbound(expr)
        .into_iter()
        .filter(|u| !u.is_function)
        .map(|u| u.name)
        .collect()
}

/// Distinct names of called functions that are not built in.
pub fn unbound_functions(expr: &Expr) -> Vec<String> {
    unbound(expr)
        .into_iter()
        .filter(|u| u.is_function && !is_builtin_function(&u.name))
        .map(|u| u.name)
        .collect()
}

#[derive(Default)]
struct Scanner {
    found: Vec<UnboundVariableOrFunction>,
    seen: FxHashSet<UnboundVariableOrFunction>,
    /// Loop variables of enclosing `EACH` nodes.
    scopes: Vec<String>,
}

impl Scanner {
    fn push(&mut self, item: UnboundVariableOrFunction) {
        if self.seen.insert(item.clone()) {
            self.found.push(item);
        }
    }

    fn is_local(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case("this") || self.scopes.iter().any(|s| s.eq_ignore_ascii_case(name))
    }

    fn visit(&mut self, expr: &Expr) {
        ensure_sufficient_stack(|| match expr.kind() {
            ExprKind::Variable(name) => {
                if !self.is_local(name) {
                    self.push(UnboundVariableOrFunction::variable(name.clone()));
                }
            }
            ExprKind::Call { name, args } => {
                self.push(UnboundVariableOrFunction::function(name.clone()));
                for arg in args {
                    self.visit(arg);
                }
            }
            ExprKind::Each { list, var, body } => {
                self.visit(list);
                self.scopes.push(var.clone());
                self.visit(body);
                self.scopes.pop();
            }
            _ => {
                for child in expr.children() {
                    self.visit(child);
                }
            }
        });
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
