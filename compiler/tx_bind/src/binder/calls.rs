//! Function calls and `EACH`.
//!
//! Most functions take scalars, so an array argument folds the call over
//! its elements. The array functions and the `OPTION` family see their
//! arguments whole.

use std::sync::Arc;

use tx_eval::{substitute, Env, RegisteredFunction};
use tx_ir::unit::{
    Coercion, Conversion, CELSIUS_FACTOR, CFM_TO_LPS, FAHRENHEIT_FACTOR, FAHRENHEIT_OFFSET,
    PERCENT_100_TO_PERCENT,
};
use tx_ir::{BinaryOp, Expr};

use super::{like, BindToTwins};

/// Functions over whole arrays.
const ARRAY_FUNCTIONS: &[&str] = &[
    "COUNT", "SUM", "AVERAGE", "MAX", "MIN", "ALL", "ANY", "FIRST", "LAST", "INDEX",
];

/// Functions that handle their own arguments.
const UNFOLDED: &[&str] = &[
    "OPTION",
    "EXISTS",
    "TOLERANCE",
    "TOLERANTOPTION",
    "COUNT_BINDINGS",
];

fn count(len: usize) -> f64 {
    f64::from(u32::try_from(len).unwrap_or(u32::MAX))
}

impl BindToTwins {
    pub(super) fn call(&mut self, expr: &Expr, name: &str, args: &[Expr]) -> Expr {
        let upper = name.to_ascii_uppercase();

        let mut prebound = None;
        if !ARRAY_FUNCTIONS.contains(&upper.as_str()) && !UNFOLDED.contains(&upper.as_str()) {
            let mut all_ok = true;
            let bound: Vec<Expr> = args
                .iter()
                .map(|arg| {
                    let (bound, ok) = self.bind_in_root(arg);
                    all_ok &= ok;
                    bound
                })
                .collect();
            if let Some(index) = bound.iter().position(Expr::is_array) {
                self.success &= all_ok;
                let array = bound[index].clone();
                let items = array.as_array().unwrap_or_default();
                return self.fold(items, |item| {
                    let mut args = bound.clone();
                    args[index] = item;
                    like(expr, Expr::call(name, args))
                });
            }
            prebound = Some((bound, all_ok));
        }

        match upper.as_str() {
            "OPTION" => return self.option(name, false, args),
            "TOLERANTOPTION" => return self.option(name, true, args),
            "EXISTS" => return self.exists(args),
            "COUNT_BINDINGS" => return self.count_bindings(expr, args),
            _ => {}
        }

        if let Some(coercion) = Coercion::from_name(&upper) {
            return self.coerce(expr, name, coercion, args);
        }

        if let Some(function) = self.env.try_get::<RegisteredFunction>(name) {
            return self.expand_macro(expr, name, function, args);
        }

        if self.services.is_ml_model(name) {
            tracing::debug!(model = name, "model-backed call kept for evaluation");
        }

        match prebound {
            Some((bound, all_ok)) => {
                self.success &= all_ok;
                like(expr, Expr::call(name, bound))
            }
            None => expr.map_children(|arg| self.visit(arg)),
        }
    }

    /// `OPTION` takes the first argument that binds. `TOLERANTOPTION` keeps
    /// all that bind. When none do, the failures are returned.
    fn option(&mut self, name: &str, tolerant: bool, args: &[Expr]) -> Expr {
        let mut bound_args = Vec::new();
        let mut failures = Vec::new();
        for arg in args.iter().filter(|arg| !arg.is_failed()) {
            let (bound, ok) = self.bind_in_root(arg);
            if !ok {
                failures.push(bound);
            } else if tolerant {
                bound_args.push(bound);
            } else {
                return bound;
            }
        }

        if !bound_args.is_empty() {
            if bound_args.iter().all(Expr::is_constant) {
                return bound_args.swap_remove(0);
            }
            return Expr::call(name, bound_args);
        }

        self.success = false;
        if failures.len() == 1 {
            return failures.swap_remove(0);
        }
        Expr::call(name, failures)
    }

    fn exists(&self, args: &[Expr]) -> Expr {
        let bound = args
            .iter()
            .all(|arg| !arg.is_failed() && self.bind_in_root(arg).1);
        Expr::bool(bound)
    }

    /// How many twins an argument binds to.
    fn count_bindings(&mut self, expr: &Expr, args: &[Expr]) -> Expr {
        let Some(arg) = args.first() else {
            return self.fail(expr.clone(), "Argument expected");
        };
        let mut child = self.recurse_into_root_unlimited();
        let mut bound = child.visit(arg);
        self.success &= child.success;

        if child.success {
            if let Some(value) = bound.as_variable().and_then(|name| self.env.try_get::<Expr>(name)) {
                bound = value;
            }
            if bound.as_twin().is_some() {
                return Expr::double(1.0);
            }
            if let Some(items) = bound.as_array() {
                return Expr::double(count(items.len()));
            }
        }
        self.fail(bound, "")
    }

    /// `CELSIUS(x)`, `METRIC(x)`, ... rewritten into arithmetic on `x`.
    fn coerce(&mut self, expr: &Expr, name: &str, coercion: Coercion, args: &[Expr]) -> Expr {
        let Some(arg) = args.first() else {
            return self.fail(expr.clone(), "Argument expected");
        };
        let (bound, ok) = self.bind_in_root(arg);
        if !ok {
            self.success = false;
            return like(expr, Expr::call(name, vec![bound]));
        }

        let unit = bound
            .unit()
            .map(str::to_owned)
            .or_else(|| bound.as_twin().and_then(|twin| twin.unit.clone()));
        let conversion = coercion.conversion(unit.as_deref());
        let converted = match conversion {
            Conversion::Keep => return bound,
            Conversion::Reject => {
                return self.fail(Expr::call(name, vec![bound]), "Cannot coerce % to METRIC");
            }
            Conversion::CelsiusToFahrenheit => Expr::add(vec![
                Expr::double(FAHRENHEIT_OFFSET),
                Expr::mul(vec![bound, Expr::double(FAHRENHEIT_FACTOR)]),
            ]),
            Conversion::FahrenheitToCelsius => Expr::mul(vec![
                Expr::binary(BinaryOp::Sub, bound, Expr::double(FAHRENHEIT_OFFSET)),
                Expr::double(CELSIUS_FACTOR),
            ]),
            Conversion::CfmToLps => Expr::mul(vec![bound, Expr::double(CFM_TO_LPS)]),
            Conversion::Percent100ToPercent => {
                Expr::mul(vec![bound, Expr::double(PERCENT_100_TO_PERCENT)])
            }
        };
        tracing::trace!(function = name, ?conversion, "unit coercion");
        converted.with_unit_opt(conversion.target_unit())
    }

    /// Inline a registered function: bind the arguments, substitute them for
    /// the parameters, then bind the body.
    fn expand_macro(
        &mut self,
        expr: &Expr,
        name: &str,
        function: RegisteredFunction,
        args: &[Expr],
    ) -> Expr {
        if function.body.is_failed() {
            self.success = false;
            return function.body;
        }
        if args.len() != function.params.len() {
            return self.fail(
                expr.clone(),
                format!(
                    "Function '{name}' parameter count mismatch source count {} and function count {}",
                    args.len(),
                    function.params.len()
                ),
            );
        }

        let mut params = Env::empty().push();
        for (param, arg) in function.params.iter().zip(args) {
            let (bound, ok) = self.bind_in_root(arg);
            self.success &= ok;
            if let Ok(env) = params.assign(param, bound) {
                params = env;
            }
        }

        let body = substitute(&function.body, &params);
        let (bound, ok) = self.bind_in_root(&body);
        self.success &= ok;
        bound
    }

    /// `EACH(list, var, body)`: `body` bound once per element, centred on the
    /// element when it is a twin. Elements whose body fails are dropped.
    pub(super) fn each(&mut self, expr: &Expr, list: &Expr, var: &str, body: &Expr) -> Expr {
        let mut child = self.recurse_into_root_unlimited();
        let bound = child.visit(list);
        self.success &= child.success;

        let items = match bound.as_array() {
            Some(items) => items.to_vec(),
            None => vec![bound],
        };

        let mut results = Vec::new();
        let mut failures = Vec::new();
        for item in items {
            let centre = item
                .as_twin()
                .cloned()
                .unwrap_or_else(|| Arc::clone(&self.twin));
            let Ok(env) = self.env.push().assign(var, item) else {
                continue;
            };
            let mut sub = self.recurse_into(centre, &env);
            let result = sub.visit(body);
            if sub.success {
                results.push(result);
            } else {
                failures.push(result);
            }
        }

        match results.len() {
            0 if !failures.is_empty() => {
                let failed = failures.len();
                self.fail(
                    Expr::array(failures),
                    format!("EACH Argument is empty. {failed} failed."),
                )
            }
            0 => self.fail(expr.clone(), "EACH Argument is empty"),
            1 => results.swap_remove(0),
            _ => like(expr, Expr::array(results)),
        }
    }
}
