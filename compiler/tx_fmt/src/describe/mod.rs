//! English descriptions.
//!
//! `temperature > 5[degC]` reads "temperature is greater than 5 °C" for
//! metric callers and "temperature is greater than 41 °F" for imperial ones.

use tx_ir::stack::ensure_sufficient_stack;
use tx_ir::{unit, AggregateFn, Expr, ExprKind, TemporalFn, UnaryOp, PRIORITY_ATOM};

/// Describe an expression in English.
pub fn describe(expr: &Expr, metric: bool) -> String {
    Describer { metric }.expr(expr)
}

struct Describer {
    metric: bool,
}

impl Describer {
    fn expr(&self, expr: &Expr) -> String {
        ensure_sufficient_stack(|| self.expr_inner(expr))
    }

    fn expr_inner(&self, expr: &Expr) -> String {
        match expr.kind() {
            ExprKind::Null => "nothing".to_owned(),
            ExprKind::Bool(b) => b.to_string(),
            ExprKind::Double(d) => self.amount(*d, expr.unit()),
            ExprKind::Str(s) => format!("'{s}'"),
            ExprKind::DateTime(d) => tx_ir::format_datetime(*d).replace('T', " "),
            ExprKind::Variable(name) => name.clone(),
            ExprKind::Property { target, name } => format!("{}.{name}", self.expr(target)),
            ExprKind::Array(items) => self.list(items, "and"),
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => format!("not {}", self.operand(operand, PRIORITY_ATOM)),
            ExprKind::Unary {
                op: UnaryOp::Minus,
                operand,
            } => format!("minus {}", self.operand(operand, PRIORITY_ATOM)),
            ExprKind::Binary { op, left, right } => format!(
                "{} {} {}",
                self.operand(left, op.precedence()),
                op.as_phrase(),
                self.operand(right, op.precedence())
            ),
            ExprKind::Nary { op, children } => children
                .iter()
                .map(|c| self.operand(c, op.precedence()))
                .collect::<Vec<_>>()
                .join(&format!(" {} ", op.as_phrase())),
            ExprKind::If {
                cond,
                then,
                otherwise,
            } => format!(
                "if {} then {} otherwise {}",
                self.expr(cond),
                self.expr(then),
                self.expr(otherwise)
            ),
            ExprKind::Call { name, args } => self.call(name, args),
            ExprKind::Aggregate { func, arg } => {
                format!("{} {}", aggregate_phrase(*func), self.expr(arg))
            }
            ExprKind::Temporal {
                func,
                arg,
                period,
                until,
            } => {
                let mut text = format!(
                    "{} {} over {}",
                    temporal_phrase(*func),
                    self.expr(arg),
                    self.expr(period)
                );
                if let Some(until) = until {
                    text.push_str(&format!(" ending {} ago", self.expr(until)));
                }
                text
            }
            ExprKind::Each { list, var, body } => format!(
                "for each {var} in {}, {}",
                self.expr(list),
                self.expr(body)
            ),
            ExprKind::Failed { reason, expr } if reason.is_empty() => {
                format!("{} (failed)", self.expr(expr))
            }
            ExprKind::Failed { reason, expr } => {
                format!("{} (failed: {reason})", self.expr(expr))
            }
            ExprKind::Twin(twin) => twin.name.clone(),
            ExprKind::Object(_) => "an object".to_owned(),
        }
    }

    /// A child of an operator, parenthesized when it binds no tighter.
    fn operand(&self, expr: &Expr, parent: u8) -> String {
        let text = self.expr(expr);
        if expr.priority() <= parent && expr.priority() < PRIORITY_ATOM {
            format!("({text})")
        } else {
            text
        }
    }

    fn amount(&self, value: f64, unit: Option<&str>) -> String {
        let Some(unit) = unit else {
            return number(value);
        };
        let value = unit::to_system(value, unit, self.metric);
        let suffix = unit::describe(unit, self.metric);
        if suffix == unit::PERCENT {
            format!("{}%", number(value))
        } else {
            format!("{} {suffix}", number(value))
        }
    }

    fn call(&self, name: &str, args: &[Expr]) -> String {
        let upper = name.to_ascii_uppercase();
        match (upper.as_str(), args) {
            ("OPTION" | "TOLERANTOPTION", _) => {
                format!("the first available of {}", self.list(args, "or"))
            }
            ("CELSIUS" | "CELCIUS" | "FAHRENHEIT" | "FARENHEIT" | "FARHENHEIT" | "METRIC", [arg]) => {
                self.expr(arg)
            }
            ("PERCENTAGE" | "PERCENT", [arg]) => format!("{} as a percentage", self.expr(arg)),
            ("EXISTS", [arg]) => format!("{} exists", self.expr(arg)),
            _ => {
                let args: Vec<String> = args.iter().map(|a| self.expr(a)).collect();
                format!("{}({})", name.to_lowercase(), args.join(", "))
            }
        }
    }

    /// `a, b and c`
    fn list(&self, items: &[Expr], conjunction: &str) -> String {
        let parts: Vec<String> = items.iter().map(|i| self.expr(i)).collect();
        match parts.split_last() {
            None => "nothing".to_owned(),
            Some((last, [])) => last.clone(),
            Some((last, rest)) => format!("{} {conjunction} {last}", rest.join(", ")),
        }
    }
}

/// At most two decimals, no trailing zeros.
fn number(value: f64) -> String {
    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_owned()
    } else {
        text.to_owned()
    }
}

const fn aggregate_phrase(func: AggregateFn) -> &'static str {
    match func {
        AggregateFn::Sum => "the sum of",
        AggregateFn::Count => "the number of",
        AggregateFn::Average => "the average of",
        AggregateFn::Min => "the minimum of",
        AggregateFn::Max => "the maximum of",
        AggregateFn::Any => "any of",
        AggregateFn::All => "all of",
        AggregateFn::First => "the first of",
    }
}

const fn temporal_phrase(func: TemporalFn) -> &'static str {
    match func {
        TemporalFn::Average => "the average of",
        TemporalFn::Min => "the minimum of",
        TemporalFn::Max => "the maximum of",
        TemporalFn::Sum => "the sum of",
        TemporalFn::Count => "the number of readings of",
        TemporalFn::Any => "any of",
        TemporalFn::All => "all of",
        TemporalFn::Delta => "the change in",
        TemporalFn::DeltaTime => "the time between readings of",
        TemporalFn::Stnd => "the standard deviation of",
        TemporalFn::Slope => "the slope of",
        TemporalFn::Forecast => "the forecast of",
    }
}
