//! Expression simplifier.
//!
//! Children are simplified first, then the node itself is rewritten. Every
//! rewrite produces a node in normal form, so `simplify(simplify(e))` equals
//! `simplify(e)`.
//!
//! # Normal form
//!
//! - `+ * & |` nodes hold no child of the same operator and at most one
//!   unitless numeric constant, which comes last
//! - `x - c` is `x + -c` and `x / c` is `x * (1/c)`
//! - comparisons keep constants on the right
//! - `!` never wraps a comparison, a constant or another `!`
//!
//! Folding only uses unitless numbers and never produces a non-finite value.

use tx_ir::stack::ensure_sufficient_stack;
use tx_ir::{BinaryOp, Expr, ExprKind, NaryOp, UnaryOp, Value};

/// Simplify an expression.
#[tracing::instrument(level = "debug", skip_all)]
pub fn simplify(expr: &Expr) -> Expr {
    let result = visit(expr);
    tracing::trace!(before = %expr, after = %result, "simplified");
    result
}

fn visit(expr: &Expr) -> Expr {
    ensure_sufficient_stack(|| {
        let node = expr.map_children(visit);
        let unit = node.unit().map(str::to_owned);
        let rewritten = match node.kind() {
            ExprKind::Unary { .. } | ExprKind::Binary { .. } | ExprKind::Nary { .. } | ExprKind::If { .. } => {
                rewrite(node.into_kind())
            }
            _ => node,
        };
        match unit {
            Some(unit) if rewritten.unit().is_none() => rewritten.with_unit(unit),
            _ => rewritten,
        }
    })
}

fn rewrite(kind: ExprKind) -> Expr {
    match kind {
        ExprKind::Unary {
            op: UnaryOp::Minus,
            operand,
        } => negate(*operand),
        ExprKind::Unary {
            op: UnaryOp::Not,
            operand,
        } => not(*operand),
        ExprKind::Binary { op, left, right } => match op {
            BinaryOp::Sub | BinaryOp::Div | BinaryOp::Pow => arithmetic(op, *left, *right),
            BinaryOp::Is => Expr::binary(op, *left, *right),
            _ => compare(op, *left, *right),
        },
        ExprKind::Nary { op, children } => match op {
            NaryOp::Add | NaryOp::Mul => math(op, children),
            NaryOp::And | NaryOp::Or => logic(op, children),
        },
        ExprKind::If {
            cond,
            then,
            otherwise,
        } => match cond.as_bool() {
            Some(true) => *then,
            Some(false) => *otherwise,
            None => Expr::if_(*cond, *then, *otherwise),
        },
        other => other.into(),
    }
}

/// A numeric constant without a unit.
fn plain(expr: &Expr) -> Option<f64> {
    match expr.unit() {
        None => expr.as_double(),
        Some(_) => None,
    }
}

/// The operand of a unary node with operator `want`, or the expression back.
fn strip_unary(expr: Expr, want: UnaryOp) -> Result<Expr, Expr> {
    match expr.kind() {
        ExprKind::Unary { op, operand } if *op == want => Ok((**operand).clone()),
        _ => Err(expr),
    }
}

fn negate(operand: Expr) -> Expr {
    if let Some(d) = operand.as_double() {
        return Expr::double(-d).with_unit_opt(operand.unit());
    }
    match strip_unary(operand, UnaryOp::Minus) {
        Ok(inner) => inner,
        Err(operand) => Expr::neg(operand),
    }
}

fn not(operand: Expr) -> Expr {
    if let Some(b) = operand.as_bool() {
        return Expr::bool(!b);
    }
    let operand = match strip_unary(operand, UnaryOp::Not) {
        Ok(inner) => return inner,
        Err(operand) => operand,
    };
    if let ExprKind::Binary { op, left, right } = operand.kind() {
        if let Some(inverse) = op.negated() {
            return compare(inverse, (**left).clone(), (**right).clone());
        }
    }
    Expr::not(operand)
}

/// `a - a` and `a / a` only cancel for references, never for calls.
fn same_reference(left: &Expr, right: &Expr) -> bool {
    left == right && matches!(left.kind(), ExprKind::Variable(_) | ExprKind::Property { .. })
}

fn arithmetic(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    if let (Some(a), Some(b)) = (plain(&left), plain(&right)) {
        let folded = match op {
            BinaryOp::Sub => a - b,
            BinaryOp::Div => a / b,
            _ => a.powf(b),
        };
        if folded.is_finite() {
            return Expr::double(folded);
        }
    }
    match op {
        BinaryOp::Sub => {
            if same_reference(&left, &right) {
                return Expr::double(0.0);
            }
            if let Some(c) = plain(&right) {
                return math(NaryOp::Add, vec![left, Expr::double(-c)]);
            }
            // a + b - a
            if let Some(rest) = remove_first(&left, NaryOp::Add, &right) {
                return rest;
            }
        }
        BinaryOp::Div => {
            if same_reference(&left, &right) {
                return Expr::double(1.0);
            }
            if let Some(c) = plain(&right) {
                let inverse = 1.0 / c;
                if inverse.is_finite() {
                    return math(NaryOp::Mul, vec![left, Expr::double(inverse)]);
                }
            }
            // a * b / a
            if let Some(rest) = remove_first(&left, NaryOp::Mul, &right) {
                return rest;
            }
        }
        _ => {}
    }
    Expr::binary(op, left, right)
}

/// `left` without the first child equal to the reference `item`.
fn remove_first(left: &Expr, op: NaryOp, item: &Expr) -> Option<Expr> {
    if left.unit().is_some() || !matches!(item.kind(), ExprKind::Variable(_)) {
        return None;
    }
    let ExprKind::Nary {
        op: left_op,
        children,
    } = left.kind()
    else {
        return None;
    };
    if *left_op != op {
        return None;
    }
    let pos = children.iter().position(|c| c == item)?;
    let mut rest = children.clone();
    rest.remove(pos);
    Some(nary_or_single(op, rest))
}

fn nary_or_single(op: NaryOp, mut children: Vec<Expr>) -> Expr {
    if children.len() == 1 {
        children.remove(0)
    } else {
        Expr::nary(op, children)
    }
}

/// Lift children of the same operator into the parent.
fn flatten(op: NaryOp, children: Vec<Expr>) -> Vec<Expr> {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        let same = child.unit().is_none()
            && matches!(child.kind(), ExprKind::Nary { op: child_op, .. } if *child_op == op);
        if same {
            if let ExprKind::Nary { children, .. } = child.into_kind() {
                flat.extend(children);
            }
        } else {
            flat.push(child);
        }
    }
    flat
}

fn math(op: NaryOp, children: Vec<Expr>) -> Expr {
    let product = op == NaryOp::Mul;
    let seed = if product { 1.0 } else { 0.0 };
    let flat = flatten(op, children);
    let total = flat
        .iter()
        .filter_map(plain)
        .fold(seed, |acc, v| if product { acc * v } else { acc + v });
    if !total.is_finite() {
        return nary_or_single(op, flat);
    }
    let mut rest: Vec<Expr> = flat.into_iter().filter(|c| plain(c).is_none()).collect();
    if rest.is_empty() {
        return Expr::double(total);
    }
    if total != seed {
        rest.push(Expr::double(total));
    }
    nary_or_single(op, rest)
}

fn logic(op: NaryOp, children: Vec<Expr>) -> Expr {
    let seed = op == NaryOp::And;
    let mut result = seed;
    let mut rest = Vec::new();
    for child in flatten(op, children) {
        match child.as_bool() {
            Some(b) if op == NaryOp::And => result &= b,
            Some(b) => result |= b,
            None => rest.push(child),
        }
    }
    if result != seed {
        return Expr::bool(result);
    }
    match rest.len() {
        0 => Expr::bool(seed),
        1 => rest.remove(0),
        _ if mutually_exclusive(&rest) => Expr::bool(!seed),
        _ => Expr::nary(op, rest),
    }
}

/// Whether two children contradict each other: `A` and `!A`, `A > x` and
/// `A <= x`, `A = x` and `A != x`.
fn mutually_exclusive(children: &[Expr]) -> bool {
    children.iter().enumerate().any(|(i, a)| {
        children.iter().skip(i + 1).any(|b| contradicts(a, b) || contradicts(b, a))
    })
}

fn contradicts(a: &Expr, b: &Expr) -> bool {
    match (a.kind(), b.kind()) {
        (
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            },
            _,
        ) => **operand == *b,
        (
            ExprKind::Binary {
                op: op_a,
                left: left_a,
                right: right_a,
            },
            ExprKind::Binary {
                op: op_b,
                left: left_b,
                right: right_b,
            },
        ) => left_a == left_b && right_a == right_b && op_a.negated() == Some(*op_b),
        _ => false,
    }
}

fn compare(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    if let Some(result) = fold_comparison(op, &left, &right) {
        return Expr::bool(result);
    }
    if op == BinaryOp::Eq {
        if let Some(simplified) = compare_with_bool(&left, &right).or_else(|| compare_with_bool(&right, &left)) {
            return simplified;
        }
        if left == right {
            return Expr::bool(true);
        }
    }
    if left.is_constant() && !right.is_constant() {
        return compare(op.mirrored(), right, left);
    }
    if let Some(moved) = move_constant_right(op, &left, &right) {
        return moved;
    }
    Expr::binary(op, left, right)
}

/// `x = True` is `x`, `x = False` is `!x`, for boolean `x`.
fn compare_with_bool(operand: &Expr, constant: &Expr) -> Option<Expr> {
    if operand.value_type() != tx_ir::ValueType::Bool {
        return None;
    }
    match constant.as_bool()? {
        true => Some(operand.clone()),
        false => Some(not(operand.clone())),
    }
}

fn fold_comparison(op: BinaryOp, left: &Expr, right: &Expr) -> Option<bool> {
    if left.unit() != right.unit() {
        return None;
    }
    let (a, b) = (left.constant_value()?, right.constant_value()?);
    let ordering = match (&a, &b) {
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        _ => None,
    };
    match op {
        BinaryOp::Eq => Some(a == b),
        BinaryOp::NotEq => Some(a != b),
        // NaN compares false in every direction
        BinaryOp::Lt => ordering.map(|o| o.is_lt()).or(nan_false(&a, &b)),
        BinaryOp::LtEq => ordering.map(|o| o.is_le()).or(nan_false(&a, &b)),
        BinaryOp::Gt => ordering.map(|o| o.is_gt()).or(nan_false(&a, &b)),
        BinaryOp::GtEq => ordering.map(|o| o.is_ge()).or(nan_false(&a, &b)),
        _ => None,
    }
}

fn nan_false(a: &Value, b: &Value) -> Option<bool> {
    matches!((a, b), (Value::Double(_), Value::Double(_))).then_some(false)
}

/// `x + 5 > 10` is `x > 5`; `x * 2 > 10` is `x > 5`.
fn move_constant_right(op: BinaryOp, left: &Expr, right: &Expr) -> Option<Expr> {
    let target = plain(right)?;
    if left.unit().is_some() {
        return None;
    }
    let ExprKind::Nary {
        op: nary @ (NaryOp::Add | NaryOp::Mul),
        children,
    } = left.kind()
    else {
        return None;
    };
    let pos = children.iter().position(|c| plain(c).is_some())?;
    let constant = plain(&children[pos])?;
    let (op, moved) = match nary {
        NaryOp::Add => (op, target - constant),
        _ if constant > 0.0 => (op, target / constant),
        // dividing by a negative flips the inequality
        _ if constant < 0.0 => (op.mirrored(), target / constant),
        _ => return None,
    };
    if !moved.is_finite() {
        return None;
    }
    let mut rest = children.clone();
    rest.remove(pos);
    Some(compare(op, nary_or_single(*nary, rest), Expr::double(moved)))
}
