//! Diagnostic rendering.
//!
//! Every operator node is wrapped in parentheses, so the output is
//! unambiguous without precedence rules: `(((1 + 2) + 3) + B)` for a nested
//! sum, `(a > b)`, `!(x)`. Use `tx_fmt::serialize` for the canonical,
//! minimally parenthesized form.

use std::fmt::{self, Display, Formatter, Write};

use super::{Expr, ExprKind};
use crate::operators::UnaryOp;

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        crate::stack::ensure_sufficient_stack(|| self.fmt_inner(f))
    }
}

impl Expr {
    fn fmt_inner(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Null => f.write_str("null")?,
            ExprKind::Bool(true) => f.write_str("True")?,
            ExprKind::Bool(false) => f.write_str("False")?,
            ExprKind::Double(d) => write!(f, "{d}")?,
            ExprKind::Str(s) => write!(f, "\"{s}\"")?,
            ExprKind::DateTime(d) => write!(f, "DATETIME(\"{}\")", crate::format_datetime(*d))?,
            ExprKind::Variable(name) => f.write_str(name)?,
            ExprKind::Property { target, name } => write!(f, "{target}.{name}")?,
            ExprKind::Array(items) => {
                f.write_char('{')?;
                write_joined(f, items, ",")?;
                f.write_char('}')?;
            }
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => write!(f, "!({operand})")?,
            ExprKind::Unary {
                op: UnaryOp::Minus,
                operand,
            } => write!(f, "-({operand})")?,
            ExprKind::Binary { op, left, right } => {
                if op.precedence() == 6 {
                    write!(f, "({left}{}{right})", op.as_symbol())?;
                } else {
                    write!(f, "({left} {} {right})", op.as_symbol())?;
                }
            }
            ExprKind::Nary { op, children } => {
                f.write_char('(')?;
                let sep = format!(" {} ", op.as_symbol());
                write_joined(f, children, &sep)?;
                f.write_char(')')?;
            }
            ExprKind::If {
                cond,
                then,
                otherwise,
            } => write!(f, "IF({cond}, {then}, {otherwise})")?,
            ExprKind::Call { name, args } => {
                write!(f, "{name}(")?;
                write_joined(f, args, ", ")?;
                f.write_char(')')?;
            }
            ExprKind::Aggregate { func, arg } => write!(f, "{}({arg})", func.name())?,
            ExprKind::Temporal {
                func,
                arg,
                period,
                until,
            } => {
                write!(f, "{}({arg}, {period}", func.name())?;
                if let Some(until) = until {
                    write!(f, ", {until}")?;
                }
                f.write_char(')')?;
            }
            ExprKind::Each { list, var, body } => write!(f, "EACH({list}, {var}, {body})")?,
            ExprKind::Failed { reason, expr } => write!(f, "FAILED('{reason}',{expr})")?,
            ExprKind::Twin(twin) => write!(f, "[{}]", twin.id)?,
            ExprKind::Object(map) => f.write_str(&map.to_json())?,
        }
        if let Some(unit) = &self.unit {
            write!(f, "[{unit}]")?;
        }
        Ok(())
    }
}

fn write_joined(f: &mut Formatter<'_>, items: &[Expr], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        Display::fmt(item, f)?;
    }
    Ok(())
}
