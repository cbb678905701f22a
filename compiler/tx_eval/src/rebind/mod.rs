//! Syntactic substitution of variables.

use tx_ir::stack::ensure_sufficient_stack;
use tx_ir::{Expr, ExprKind};

use crate::env::{Binding, Env};

/// Replace every free `name` in `expr` with `value`.
pub fn rebind(expr: &Expr, name: &str, value: impl Into<Binding>) -> Expr {
    Env::empty()
        .push()
        .assign(name, value)
        .map_or_else(|_| expr.clone(), |env| substitute(expr, &env))
}

/// Replace every free variable bound in `env` by its binding.
///
/// Function bindings are left alone. Loop variables introduced by `EACH`
/// shadow the environment inside the loop body.
pub fn substitute(expr: &Expr, env: &Env) -> Expr {
    Substitute {
        env,
        shadowed: Vec::new(),
    }
    .visit(expr)
}

struct Substitute<'a> {
    env: &'a Env,
    shadowed: Vec<String>,
}

impl Substitute<'_> {
    fn visit(&mut self, expr: &Expr) -> Expr {
        ensure_sufficient_stack(|| match expr.kind() {
            ExprKind::Variable(name) => self.variable(expr, name),
            ExprKind::Each { list, var, body } => {
                let list = self.visit(list);
                self.shadowed.push(var.clone());
                let body = self.visit(body);
                self.shadowed.pop();
                Expr::each(list, var.clone(), body).with_unit_opt(expr.unit())
            }
            _ => expr.map_children(|child| self.visit(child)),
        })
    }

    fn variable(&self, expr: &Expr, name: &str) -> Expr {
        if self.shadowed.iter().any(|s| s.eq_ignore_ascii_case(name)) {
            return expr.clone();
        }
        match self.env.get(name).and_then(Binding::to_expr) {
            Some(replacement) if replacement.unit().is_none() => {
                replacement.with_unit_opt(expr.unit())
            }
            Some(replacement) => replacement,
            None => expr.clone(),
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tx_ir::Value;

    fn parse(source: &str) -> Expr {
        tx_parse::parse(source).unwrap()
    }

    #[test]
    fn test_rebind_replaces_free_occurrences() {
        let expr = rebind(&parse("x + y * x"), "x", 3.0);
        assert_eq!(expr, parse("3 + y * 3"));
    }

    #[test]
    fn test_rebind_with_expression() {
        let expr = rebind(&parse("limit > 2"), "LIMIT", parse("a + 1"));
        assert_eq!(expr, parse("(a + 1) > 2"));
    }

    #[test]
    fn test_rebind_keeps_units() {
        let expr = rebind(&parse("t[degC] > 5"), "t", Value::Double(20.0));
        assert_eq!(expr, parse("20[degC] > 5"));
    }

    #[test]
    fn test_loop_variables_shadow() {
        let expr = rebind(&parse("EACH(items, x, x > limit)"), "x", 1.0);
        assert_eq!(expr, parse("EACH(items, x, x > limit)"));

        let expr = rebind(&parse("EACH(x, v, v > 1)"), "x", parse("{1, 2}"));
        assert_eq!(expr, parse("EACH({1, 2}, v, v > 1)"));
    }

    #[test]
    fn test_substitute_skips_functions_and_properties() {
        let env = Env::empty()
            .push()
            .assign("speed", 4.0)
            .unwrap()
            .assign("fan", parse("this.fan"))
            .unwrap();
        let expr = substitute(&parse("fan.speed + speed(1)"), &env);
        assert_eq!(expr, parse("this.fan.speed + speed(1)"));
    }
}
