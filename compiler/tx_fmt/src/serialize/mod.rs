//! Canonical serializer.
//!
//! Output parses back to an equal tree. Parentheses are emitted only where
//! precedence requires them, with two deliberate exceptions that keep the
//! round-trip exact:
//!
//! - a nested n-ary node of equal precedence is always parenthesized, since
//!   the parser folds `a + b + c` into one node;
//! - unary minus of a number is written `-(2)`, since `-2` is a constant.

use std::fmt::Write;

use tx_ir::stack::ensure_sufficient_stack;
use tx_ir::{BinaryOp, Expr, ExprKind, UnaryOp, PRIORITY_ATOM};

/// Serialize to canonical source text.
pub fn serialize(expr: &Expr) -> String {
    let mut serializer = Serializer::new();
    serializer.expr(expr);
    serializer.finish()
}

/// Words the parser treats specially when written bare.
const KEYWORDS: &[&str] = &["true", "false", "null", "and", "or", "not", "is"];

/// True when `name` can be written without brackets.
pub fn is_simple_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(name))
}

/// Incremental serializer writing into an owned buffer.
#[derive(Default)]
pub struct Serializer {
    out: String,
}

impl Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.out
    }

    pub fn expr(&mut self, expr: &Expr) {
        ensure_sufficient_stack(|| self.expr_inner(expr));
    }

    fn expr_inner(&mut self, expr: &Expr) {
        match (expr.unit(), expr.kind()) {
            (None, _) => self.kind(expr),
            (Some(unit), ExprKind::Double(_)) => {
                self.kind(expr);
                self.unit(unit);
            }
            (Some(unit), _) => {
                self.out.push('(');
                self.kind(expr);
                self.out.push(')');
                self.unit(unit);
            }
        }
    }

    fn unit(&mut self, unit: &str) {
        let _ = write!(self.out, "[{unit}]");
    }

    fn kind(&mut self, expr: &Expr) {
        match expr.kind() {
            ExprKind::Null => self.out.push_str("null"),
            ExprKind::Bool(true) => self.out.push_str("True"),
            ExprKind::Bool(false) => self.out.push_str("False"),
            ExprKind::Double(d) => {
                let _ = write!(self.out, "{d}");
            }
            ExprKind::Str(s) => self.string(s),
            ExprKind::DateTime(d) => {
                self.out.push_str("DATETIME(");
                self.string(&tx_ir::format_datetime(*d));
                self.out.push(')');
            }
            ExprKind::Variable(name) => self.identifier(name),
            ExprKind::Property { target, name } => {
                if target.as_variable().is_some() && target.unit().is_none() {
                    self.expr(target);
                } else {
                    self.grouped(target);
                }
                self.out.push('.');
                self.identifier(name);
            }
            ExprKind::Array(items) => {
                self.out.push('{');
                self.list(items);
                self.out.push('}');
            }
            ExprKind::Unary { op, operand } => {
                self.out.push_str(op.as_symbol());
                let needs_parens = priority(operand) < PRIORITY_ATOM
                    || (*op == UnaryOp::Minus && operand.as_double().is_some());
                if needs_parens {
                    self.grouped(operand);
                } else {
                    self.expr(operand);
                }
            }
            ExprKind::Binary { op, left, right } => {
                let parent = op.precedence();
                let left_parens = match priority(left).cmp(&parent) {
                    std::cmp::Ordering::Less => true,
                    std::cmp::Ordering::Equal => !is_same_left_assoc(left, *op),
                    std::cmp::Ordering::Greater => false,
                };
                self.child(left, left_parens);
                if *op == BinaryOp::Pow {
                    self.out.push('^');
                } else {
                    let _ = write!(self.out, " {} ", op.as_symbol());
                }
                self.child(right, priority(right) <= parent);
            }
            ExprKind::Nary { op, children } => {
                let parent = op.precedence();
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        let _ = write!(self.out, " {} ", op.as_symbol());
                    }
                    self.child(child, priority(child) <= parent);
                }
            }
            ExprKind::If {
                cond,
                then,
                otherwise,
            } => {
                self.out.push_str("IF(");
                self.list([cond.as_ref(), then.as_ref(), otherwise.as_ref()]);
                self.out.push(')');
            }
            ExprKind::Call { name, args } => {
                self.out.push_str(name);
                self.out.push('(');
                self.list(args);
                self.out.push(')');
            }
            ExprKind::Aggregate { func, arg } => {
                self.out.push_str(func.name());
                self.out.push('(');
                self.expr(arg);
                self.out.push(')');
            }
            ExprKind::Temporal {
                func,
                arg,
                period,
                until,
            } => {
                self.out.push_str(func.name());
                self.out.push('(');
                self.expr(arg);
                self.out.push_str(", ");
                self.expr(period);
                if let Some(until) = until {
                    self.out.push_str(", ");
                    self.expr(until);
                }
                self.out.push(')');
            }
            ExprKind::Each { list, var, body } => {
                self.out.push_str("EACH(");
                self.expr(list);
                self.out.push(',');
                self.identifier(var);
                self.out.push(',');
                self.expr(body);
                self.out.push(')');
            }
            ExprKind::Failed { reason, expr } => {
                self.out.push_str("FAILED(");
                if !reason.is_empty() {
                    self.string(reason);
                    self.out.push(',');
                }
                self.expr(expr);
                self.out.push(')');
            }
            ExprKind::Twin(twin) => {
                let _ = write!(self.out, "[{}]", twin.id);
            }
            ExprKind::Object(map) => self.out.push_str(&map.to_json()),
        }
    }

    fn child(&mut self, child: &Expr, parens: bool) {
        if parens {
            self.grouped(child);
        } else {
            self.expr(child);
        }
    }

    fn grouped(&mut self, expr: &Expr) {
        self.out.push('(');
        self.expr(expr);
        self.out.push(')');
    }

    fn list<'a>(&mut self, items: impl IntoIterator<Item = &'a Expr>) {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.expr(item);
        }
    }

    fn identifier(&mut self, name: &str) {
        if is_simple_identifier(name) {
            self.out.push_str(name);
        } else {
            let _ = write!(self.out, "[{name}]");
        }
    }

    fn string(&mut self, s: &str) {
        self.out.push('"');
        for c in s.chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\t' => self.out.push_str("\\t"),
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }
}

/// Precedence as seen by a parent. A node with a unit renders as `(..)[u]`.
fn priority(expr: &Expr) -> u8 {
    if expr.unit().is_some() {
        PRIORITY_ATOM
    } else {
        expr.priority()
    }
}

fn is_same_left_assoc(child: &Expr, op: BinaryOp) -> bool {
    matches!(child.kind(), ExprKind::Binary { op: child_op, .. } if *child_op == op && op.is_left_associative())
}
