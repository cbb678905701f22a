//! Built-in functions available to evaluation.
//!
//! Lookup is case-insensitive. Arity or argument-type mismatches evaluate
//! to [`Value::Undefined`]; they are not errors.

use time::macros::datetime;
use tx_ir::{DateTime, Value};

type Unary = fn(f64) -> Value;
type Binary = fn(f64, f64) -> Value;

const UNARY: &[(&str, Unary)] = &[
    ("ABS", |x| Value::Double(x.abs())),
    ("ACOS", |x| Value::Double(x.acos())),
    ("ASIN", |x| Value::Double(x.asin())),
    ("ATAN", |x| Value::Double(x.atan())),
    ("CEILING", |x| Value::Double(x.ceil())),
    ("COS", |x| Value::Double(x.cos())),
    ("FLOOR", |x| Value::Double(x.floor())),
    ("LOG", |x| Value::Double(x.ln())),
    ("LOG10", |x| Value::Double(x.log10())),
    ("ROUND", |x| Value::Double(round_half_even(x))),
    ("SIGN", |x| Value::Double(sign(x))),
    ("SIN", |x| Value::Double(x.sin())),
    ("SQRT", |x| Value::Double(x.sqrt())),
    ("TAN", |x| Value::Double(x.tan())),
    ("ISNAN", |x| Value::Bool(x.is_nan())),
];

const BINARY: &[(&str, Binary)] = &[
    ("POW", |x, y| Value::Double(x.powf(y))),
    ("ATAN2", |y, x| Value::Double(y.atan2(x))),
    ("IFNAN", |x, fallback| Value::Double(if x.is_nan() { fallback } else { x })),
];

const DATE: &[(&str, fn(DateTime) -> f64)] = &[
    ("HOUR", |d| f64::from(d.hour())),
    ("MINUTE", |d| f64::from(d.minute())),
    ("DAY", |d| f64::from(d.day())),
    ("DAYOFWEEK", |d| f64::from(d.weekday().number_days_from_sunday())),
    ("MONTH", |d| f64::from(u8::from(d.month()))),
];

const STRING: &[(&str, fn(&str) -> String)] = &[
    ("TOUPPER", str::to_uppercase),
    ("TOLOWER", str::to_lowercase),
    ("TRIM", |s| s.trim().to_owned()),
];

const STRING_PAIR: &[(&str, fn(&str, &str) -> bool)] = &[
    ("CONTAINS", |s, part| s.contains(part)),
    ("ENDSWITH", |s, part| s.ends_with(part)),
    ("STARTSWITH", |s, part| s.starts_with(part)),
];

fn lookup<T: Copy>(table: &[(&str, T)], name: &str) -> Option<T> {
    table
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, f)| *f)
}

/// Whether `name` is in the built-in table.
pub fn is_builtin(name: &str) -> bool {
    lookup(UNARY, name).is_some()
        || lookup(BINARY, name).is_some()
        || lookup(DATE, name).is_some()
        || lookup(STRING, name).is_some()
        || lookup(STRING_PAIR, name).is_some()
        || name.eq_ignore_ascii_case("DEADBAND")
}

/// Apply a built-in to evaluated arguments.
///
/// `None` when `name` is not a built-in; `Some(Undefined)` when it is but
/// the arguments do not fit.
pub fn call_builtin(name: &str, args: &[Value]) -> Option<Value> {
    if let Some(f) = lookup(UNARY, name) {
        return Some(match args {
            [x] => numeric(x).map_or(Value::Undefined, f),
            _ => Value::Undefined,
        });
    }
    if let Some(f) = lookup(BINARY, name) {
        return Some(match args {
            [x, y] => match (numeric(x), numeric(y)) {
                (Some(x), Some(y)) => f(x, y),
                _ => Value::Undefined,
            },
            _ => Value::Undefined,
        });
    }
    if name.eq_ignore_ascii_case("DEADBAND") {
        return Some(match args {
            [x, setpoint, band] => match (numeric(x), numeric(setpoint), numeric(band)) {
                (Some(x), Some(s), Some(b)) => Value::Double(deadband(x, s, b)),
                _ => Value::Undefined,
            },
            _ => Value::Undefined,
        });
    }
    if let Some(f) = lookup(DATE, name) {
        return Some(match args {
            [x] => date(x).map_or(Value::Undefined, |d| Value::Double(f(d))),
            _ => Value::Undefined,
        });
    }
    if let Some(f) = lookup(STRING, name) {
        return Some(match args {
            [x] if !x.is_undefined() => Value::String(f(&x.to_text())),
            _ => Value::Undefined,
        });
    }
    if let Some(f) = lookup(STRING_PAIR, name) {
        return Some(match args {
            [x, y] if !x.is_undefined() && !y.is_undefined() => {
                Value::Bool(f(&x.to_text(), &y.to_text()))
            }
            _ => Value::Undefined,
        });
    }
    None
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Double(d) => Some(*d),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Dates, or numbers read as 100ns ticks since 0001-01-01.
fn date(value: &Value) -> Option<DateTime> {
    match value {
        Value::DateTime(d) => Some(*d),
        Value::Double(ticks) if ticks.is_finite() => {
            #[expect(clippy::cast_possible_truncation, reason = "ticks are whole numbers")]
            let micros = (*ticks / 10.0) as i64;
            datetime!(0001-01-01 0:00).checked_add(time::Duration::microseconds(micros))
        }
        _ => None,
    }
}

/// Midpoints round to the even neighbour.
fn round_half_even(x: f64) -> f64 {
    let rounded = x.round();
    if (x - x.trunc()).abs() == 0.5 && rounded % 2.0 != 0.0 {
        rounded - x.signum()
    } else {
        rounded
    }
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Distance of `x` from `setpoint` outside a band of `band` either side.
fn deadband(x: f64, setpoint: f64, band: f64) -> f64 {
    let offset = x - setpoint;
    if offset.abs() <= band {
        0.0
    } else {
        offset - band.copysign(offset)
    }
}
