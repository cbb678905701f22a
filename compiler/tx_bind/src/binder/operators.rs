//! Operators, conditionals, aggregates and temporal functions.
//!
//! An array operand folds the operator over its elements: `{a,b} > 0`
//! becomes `{a > 0, b > 0}`. Logical operators reject arrays instead, since
//! `ANY` or `ALL` has to say how the elements combine.

use tx_ir::{AggregateFn, BinaryOp, Expr, ExprKind, NaryOp, UnaryOp};

use super::{like, BindToTwins};

/// `ANY`/`ALL` over fewer elements than this become a plain `|`/`&`.
const INLINE_LOGICAL_LIMIT: usize = 4;

impl BindToTwins {
    pub(super) fn unary(&mut self, expr: &Expr, op: UnaryOp, operand: &Expr) -> Expr {
        if op == UnaryOp::Not && operand.is_array() {
            return self.fail(expr.clone(), "Array not allowed for Not");
        }
        let bound = self.visit(operand);
        if op == UnaryOp::Not && bound.is_array() {
            return self.fail(expr.clone(), "Array not allowed for Not");
        }
        like(expr, Expr::unary(op, bound))
    }

    pub(super) fn binary(&mut self, expr: &Expr, op: BinaryOp, left: &Expr, right: &Expr) -> Expr {
        let left = self.visit(left);
        if op == BinaryOp::Is {
            if let Some(result) = right.as_variable().and_then(|model| self.is_model(&left, model)) {
                return result;
            }
        }

        let right = self.visit(right);
        if let Some(items) = left.as_array() {
            return self.fold(items, |item| like(expr, Expr::binary(op, item, right.clone())));
        }
        if let Some(items) = right.as_array() {
            return self.fold(items, |item| like(expr, Expr::binary(op, left.clone(), item)));
        }
        like(expr, Expr::binary(op, left, right))
    }

    /// `x is [dtmi:...]` once `x` is bound. `None` unless `x` is a twin or an
    /// array holding twins; elements that are not twins are dropped.
    fn is_model(&self, bound: &Expr, model: &str) -> Option<Expr> {
        let models = &self.services.models;
        let matches = |expr: &Expr| {
            expr.as_twin()
                .map(|twin| Expr::bool(models.inherits_from_or_equal(&twin.model_id, model)))
        };

        if let Some(result) = matches(bound) {
            return Some(result);
        }
        let items = bound.as_array()?;
        if !items.iter().any(|item| item.as_twin().is_some()) {
            return None;
        }
        Some(Expr::array(items.iter().filter_map(matches).collect()))
    }

    pub(super) fn nary(&mut self, expr: &Expr, op: NaryOp, children: &[Expr]) -> Expr {
        if op.is_logical() && children.iter().any(Expr::is_array) {
            return self.fail(expr.clone(), format!("Array not allowed for {}", op.name()));
        }

        let bound: Vec<Expr> = children.iter().map(|child| self.visit(child)).collect();
        let Some(index) = bound.iter().position(Expr::is_array) else {
            return like(expr, Expr::nary(op, bound));
        };
        if op.is_logical() {
            return self.fail(expr.clone(), format!("Array not allowed for {}", op.name()));
        }

        let mut others = bound;
        let array = others.remove(index);
        let items = array.as_array().unwrap_or_default();
        self.fold(items, |item| {
            let mut children = Vec::with_capacity(others.len() + 1);
            children.push(item);
            children.extend(others.iter().cloned());
            like(expr, Expr::nary(op, children))
        })
    }

    pub(super) fn if_(&mut self, expr: &Expr, parts: [&Expr; 3]) -> Expr {
        let mut all_ok = true;
        let [cond, then, otherwise] = parts.map(|part| {
            let (bound, ok) = self.bind_in_root(part);
            all_ok &= ok;
            bound
        });
        self.success &= all_ok;

        let rebuild = |cond: Expr, then: Expr, otherwise: Expr| like(expr, Expr::if_(cond, then, otherwise));
        if let Some(items) = cond.as_array() {
            return self.fold(items, |item| rebuild(item, then.clone(), otherwise.clone()));
        }
        if let Some(items) = then.as_array() {
            return self.fold(items, |item| rebuild(cond.clone(), item, otherwise.clone()));
        }
        if let Some(items) = otherwise.as_array() {
            return self.fold(items, |item| rebuild(cond.clone(), then.clone(), item));
        }
        rebuild(cond, then, otherwise)
    }

    /// Aggregates consume arrays, so their argument may be as wide as the
    /// graph allows.
    pub(super) fn aggregate(&mut self, expr: &Expr, func: AggregateFn, arg: &Expr) -> Expr {
        let mut child = self.recurse_into_root_unlimited();
        let bound = child.visit(arg);
        self.success &= child.success;

        if func.is_boolean() {
            if let Some(items) = bound.as_array() {
                match items {
                    [] => return Expr::bool(false),
                    [only] => return only.clone(),
                    _ if items.len() < INLINE_LOGICAL_LIMIT => {
                        let items = items.to_vec();
                        return match func {
                            AggregateFn::All => Expr::and(items),
                            _ => Expr::or(items),
                        };
                    }
                    _ => {}
                }
            }
        }
        like(expr, Expr::aggregate(func, bound))
    }

    /// `AVERAGE(x, 1h)` and friends. Over an array of points the window
    /// applies to each point separately.
    pub(super) fn temporal(&mut self, expr: &Expr) -> Expr {
        let ExprKind::Temporal {
            func,
            arg,
            period,
            until,
        } = expr.kind()
        else {
            return expr.clone();
        };
        let func = *func;

        let bound = self.visit(arg);
        let period = self.visit(period);
        let until = until.as_deref().map(|until| self.visit(until));
        let rebuild = |arg: Expr| {
            like(
                expr,
                Expr::temporal(func, arg, period.clone(), until.clone()),
            )
        };

        if !self.success {
            return rebuild(bound);
        }

        if let Some(items) = bound.as_array() {
            return self.fold(items, rebuild);
        }

        // A series computed by an earlier expression stays a reference to
        // that series.
        if let Some(name) = arg.as_variable() {
            if matches!(self.env.get(name), Some(tx_eval::Binding::Expr(_))) {
                return rebuild((**arg).clone());
            }
        }
        rebuild(bound)
    }
}
