//! The expression tree.
//!
//! An [`Expr`] is an immutable node: an [`ExprKind`] plus an optional unit of
//! measure and an optional source snippet. Visitors never mutate a tree; they
//! rebuild the parts that change and clone the rest.
//!
//! # Equality
//!
//! Structural over kind, children and unit. The source snippet is diagnostic
//! only and never compared.

use std::fmt;

use smallvec::SmallVec;

use crate::operators::{AggregateFn, BinaryOp, NaryOp, TemporalFn, UnaryOp};
use crate::twin::{PropertyMap, PropertyValue, TwinRef};
use crate::unit;
use crate::value::{Value, ValueType};
use crate::DateTime;

mod display;

/// Precedence of leaves, calls and arrays.
pub const PRIORITY_ATOM: u8 = 100;
/// Precedence of `a.b`.
pub const PRIORITY_PROPERTY: u8 = 90;
/// Precedence of `!a` and `-a`.
pub const PRIORITY_UNARY: u8 = 7;

/// Node kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    // Constants
    Null,
    Bool(bool),
    Double(f64),
    Str(String),
    DateTime(DateTime),

    /// A free reference: `x`, `[air flow sp]`, `[dtmi:com:acme:Fan;1]`.
    Variable(String),
    /// `target.name`
    Property { target: Box<Expr>, name: String },
    /// `{a,b,c}`
    Array(Vec<Expr>),

    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Nary { op: NaryOp, children: Vec<Expr> },

    /// `IF(cond, then, otherwise)`
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Any other function call, including `OPTION` and the unit coercions.
    Call { name: String, args: Vec<Expr> },
    /// `SUM(x)`, `ANY(x)`, ...
    Aggregate { func: AggregateFn, arg: Box<Expr> },
    /// `AVERAGE(x, 1h)`, `DELTA(x, 15min, 1h)`
    Temporal {
        func: TemporalFn,
        arg: Box<Expr>,
        period: Box<Expr>,
        until: Option<Box<Expr>>,
    },
    /// `EACH(list, var, body)`
    Each {
        list: Box<Expr>,
        var: String,
        body: Box<Expr>,
    },
    /// A binding failure, keeping the expression that failed.
    Failed { reason: String, expr: Box<Expr> },

    /// A resolved twin.
    Twin(TwinRef),
    /// A JSON-object-backed property bag.
    Object(PropertyMap),
}

/// An expression node.
#[derive(Clone, Debug)]
pub struct Expr {
    kind: ExprKind,
    unit: Option<String>,
    text: Option<String>,
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.unit == other.unit
    }
}

impl From<ExprKind> for Expr {
    fn from(kind: ExprKind) -> Self {
        Expr {
            kind,
            unit: None,
            text: None,
        }
    }
}

// Construction
impl Expr {
    pub fn null() -> Self {
        ExprKind::Null.into()
    }

    pub fn bool(value: bool) -> Self {
        ExprKind::Bool(value).into()
    }

    pub fn double(value: f64) -> Self {
        ExprKind::Double(value).into()
    }

    pub fn string(value: impl Into<String>) -> Self {
        ExprKind::Str(value.into()).into()
    }

    pub fn datetime(value: DateTime) -> Self {
        ExprKind::DateTime(value).into()
    }

    pub fn variable(name: impl Into<String>) -> Self {
        ExprKind::Variable(name.into()).into()
    }

    pub fn property(target: Expr, name: impl Into<String>) -> Self {
        ExprKind::Property {
            target: Box::new(target),
            name: name.into(),
        }
        .into()
    }

    pub fn array(items: Vec<Expr>) -> Self {
        ExprKind::Array(items).into()
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        ExprKind::Unary {
            op,
            operand: Box::new(operand),
        }
        .into()
    }

    pub fn not(operand: Expr) -> Self {
        Self::unary(UnaryOp::Not, operand)
    }

    pub fn neg(operand: Expr) -> Self {
        Self::unary(UnaryOp::Minus, operand)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
        .into()
    }

    pub fn nary(op: NaryOp, children: Vec<Expr>) -> Self {
        ExprKind::Nary { op, children }.into()
    }

    pub fn add(children: Vec<Expr>) -> Self {
        Self::nary(NaryOp::Add, children)
    }

    pub fn mul(children: Vec<Expr>) -> Self {
        Self::nary(NaryOp::Mul, children)
    }

    pub fn and(children: Vec<Expr>) -> Self {
        Self::nary(NaryOp::And, children)
    }

    pub fn or(children: Vec<Expr>) -> Self {
        Self::nary(NaryOp::Or, children)
    }

    pub fn if_(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        ExprKind::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
        .into()
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        ExprKind::Call {
            name: name.into(),
            args,
        }
        .into()
    }

    pub fn aggregate(func: AggregateFn, arg: Expr) -> Self {
        ExprKind::Aggregate {
            func,
            arg: Box::new(arg),
        }
        .into()
    }

    pub fn temporal(func: TemporalFn, arg: Expr, period: Expr, until: Option<Expr>) -> Self {
        ExprKind::Temporal {
            func,
            arg: Box::new(arg),
            period: Box::new(period),
            until: until.map(Box::new),
        }
        .into()
    }

    pub fn each(list: Expr, var: impl Into<String>, body: Expr) -> Self {
        ExprKind::Each {
            list: Box::new(list),
            var: var.into(),
            body: Box::new(body),
        }
        .into()
    }

    pub fn failed(reason: impl Into<String>, expr: Expr) -> Self {
        ExprKind::Failed {
            reason: reason.into(),
            expr: Box::new(expr),
        }
        .into()
    }

    pub fn twin(twin: TwinRef) -> Self {
        ExprKind::Twin(twin).into()
    }

    pub fn object(map: PropertyMap) -> Self {
        ExprKind::Object(map).into()
    }

    /// Attach a unit of measure in its canonical spelling, so
    /// `degrees-celsius` and `degC` tag the same node. An empty string clears
    /// it.
    #[must_use]
    pub fn with_unit(self, unit: impl Into<String>) -> Self {
        let unit = unit.into();
        self.with_unit_opt(Some(&unit))
    }

    #[must_use]
    pub fn with_unit_opt(mut self, unit: Option<&str>) -> Self {
        self.unit = unit
            .filter(|u| !u.is_empty())
            .map(|u| unit::canonical(u).into_owned());
        self
    }

    /// Attach the source snippet this node was parsed from.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Constant node for a value; `None` for [`Value::Undefined`].
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Undefined => return None,
            Value::Null => Expr::null(),
            Value::Bool(b) => Expr::bool(*b),
            Value::Double(d) => Expr::double(*d),
            Value::String(s) => Expr::string(s.clone()),
            Value::DateTime(d) => Expr::datetime(*d),
            Value::Array(items) => {
                Expr::array(items.iter().map(Expr::from_value).collect::<Option<_>>()?)
            }
            Value::Twin(t) => Expr::twin(t.clone()),
        })
    }

    /// Expression for a twin property value; `None` for JSON null.
    pub fn from_property_value(value: &PropertyValue) -> Option<Self> {
        Some(match value {
            PropertyValue::Null => return None,
            PropertyValue::Bool(b) => Expr::bool(*b),
            PropertyValue::Number(n) => Expr::double(*n),
            PropertyValue::String(s) => Expr::string(s.clone()),
            PropertyValue::Array(items) => Expr::array(
                items
                    .iter()
                    .filter_map(Expr::from_property_value)
                    .collect(),
            ),
            PropertyValue::Object(map) => Expr::object(map.clone()),
        })
    }
}

// Inspection
impl Expr {
    #[inline]
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    #[inline]
    pub fn into_kind(self) -> ExprKind {
        self.kind
    }

    #[inline]
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    #[inline]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_constant(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Null
                | ExprKind::Bool(_)
                | ExprKind::Double(_)
                | ExprKind::Str(_)
                | ExprKind::DateTime(_)
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.kind, ExprKind::Failed { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ExprKind::Array(_))
    }

    pub fn as_double(&self) -> Option<f64> {
        match self.kind {
            ExprKind::Double(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            ExprKind::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Variable(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Expr]> {
        match &self.kind {
            ExprKind::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_twin(&self) -> Option<&TwinRef> {
        match &self.kind {
            ExprKind::Twin(t) => Some(t),
            _ => None,
        }
    }

    /// Value of a constant node.
    pub fn constant_value(&self) -> Option<Value> {
        Some(match &self.kind {
            ExprKind::Null => Value::Null,
            ExprKind::Bool(b) => Value::Bool(*b),
            ExprKind::Double(d) => Value::Double(*d),
            ExprKind::Str(s) => Value::String(s.clone()),
            ExprKind::DateTime(d) => Value::DateTime(*d),
            _ => return None,
        })
    }

    /// The first `FAILED` node in pre-order, if any.
    pub fn first_failed(&self) -> Option<&Expr> {
        if self.is_failed() {
            return Some(self);
        }
        self.children().into_iter().find_map(Expr::first_failed)
    }

    /// Ordered direct children.
    pub fn children(&self) -> SmallVec<[&Expr; 4]> {
        match &self.kind {
            ExprKind::Null
            | ExprKind::Bool(_)
            | ExprKind::Double(_)
            | ExprKind::Str(_)
            | ExprKind::DateTime(_)
            | ExprKind::Variable(_)
            | ExprKind::Twin(_)
            | ExprKind::Object(_) => SmallVec::new(),
            ExprKind::Property { target, .. } => smallvec::smallvec![&**target],
            ExprKind::Array(items)
            | ExprKind::Nary {
                children: items, ..
            }
            | ExprKind::Call { args: items, .. } => items.iter().collect(),
            ExprKind::Unary { operand, .. } => smallvec::smallvec![&**operand],
            ExprKind::Binary { left, right, .. } => smallvec::smallvec![&**left, &**right],
            ExprKind::If {
                cond,
                then,
                otherwise,
            } => smallvec::smallvec![&**cond, &**then, &**otherwise],
            ExprKind::Aggregate { arg, .. } => smallvec::smallvec![&**arg],
            ExprKind::Temporal {
                arg, period, until, ..
            } => {
                let mut out: SmallVec<[&Expr; 4]> = smallvec::smallvec![&**arg, &**period];
                if let Some(until) = until {
                    out.push(until);
                }
                out
            }
            ExprKind::Each { list, body, .. } => smallvec::smallvec![&**list, &**body],
            ExprKind::Failed { expr, .. } => smallvec::smallvec![&**expr],
        }
    }

    /// Rebuild this node with every direct child replaced by `f(child)`.
    ///
    /// Unit and source text are kept.
    #[must_use]
    pub fn map_children(&self, mut f: impl FnMut(&Expr) -> Expr) -> Expr {
        let mut bx = |e: &Expr| Box::new(f(e));
        let kind = match &self.kind {
            ExprKind::Property { target, name } => ExprKind::Property {
                target: bx(target),
                name: name.clone(),
            },
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: bx(operand),
            },
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op: *op,
                left: bx(left),
                right: bx(right),
            },
            ExprKind::If {
                cond,
                then,
                otherwise,
            } => ExprKind::If {
                cond: bx(cond),
                then: bx(then),
                otherwise: bx(otherwise),
            },
            ExprKind::Aggregate { func, arg } => ExprKind::Aggregate {
                func: *func,
                arg: bx(arg),
            },
            ExprKind::Temporal {
                func,
                arg,
                period,
                until,
            } => ExprKind::Temporal {
                func: *func,
                arg: bx(arg),
                period: bx(period),
                until: until.as_deref().map(&mut bx),
            },
            ExprKind::Each { list, var, body } => ExprKind::Each {
                list: bx(list),
                var: var.clone(),
                body: bx(body),
            },
            ExprKind::Failed { reason, expr } => ExprKind::Failed {
                reason: reason.clone(),
                expr: bx(expr),
            },
            ExprKind::Array(items) => ExprKind::Array(items.iter().map(|e| *bx(e)).collect()),
            ExprKind::Nary { op, children } => ExprKind::Nary {
                op: *op,
                children: children.iter().map(|e| *bx(e)).collect(),
            },
            ExprKind::Call { name, args } => ExprKind::Call {
                name: name.clone(),
                args: args.iter().map(|e| *bx(e)).collect(),
            },
            leaf => leaf.clone(),
        };
        Expr {
            kind,
            unit: self.unit.clone(),
            text: self.text.clone(),
        }
    }

    /// Semantic type this node yields, when it can be known statically.
    pub fn value_type(&self) -> ValueType {
        match &self.kind {
            ExprKind::Null => ValueType::Null,
            ExprKind::Bool(_) => ValueType::Bool,
            ExprKind::Double(_) => ValueType::Double,
            ExprKind::Str(_) => ValueType::String,
            ExprKind::DateTime(_) => ValueType::DateTime,
            ExprKind::Array(_) => ValueType::Array,
            ExprKind::Twin(_) => ValueType::Twin,
            ExprKind::Object(_) => ValueType::Object,
            ExprKind::Unary {
                op: UnaryOp::Not, ..
            } => ValueType::Bool,
            ExprKind::Unary {
                op: UnaryOp::Minus, ..
            } => ValueType::Double,
            ExprKind::Binary { op, .. } => match op {
                BinaryOp::Sub | BinaryOp::Div | BinaryOp::Pow => ValueType::Double,
                _ => ValueType::Bool,
            },
            ExprKind::Nary { op, .. } => {
                if op.is_logical() {
                    ValueType::Bool
                } else {
                    ValueType::Double
                }
            }
            ExprKind::If { then, .. } => then.value_type(),
            ExprKind::Aggregate { func, arg } => match func {
                AggregateFn::Any | AggregateFn::All => ValueType::Bool,
                AggregateFn::First => arg
                    .as_array()
                    .and_then(|items| items.first())
                    .map_or(ValueType::Unknown, Expr::value_type),
                _ => ValueType::Double,
            },
            ExprKind::Temporal { func, .. } => {
                if func.is_boolean() {
                    ValueType::Bool
                } else {
                    ValueType::Double
                }
            }
            ExprKind::Failed { expr, .. } => expr.value_type(),
            ExprKind::Variable(_)
            | ExprKind::Property { .. }
            | ExprKind::Call { .. }
            | ExprKind::Each { .. } => ValueType::Unknown,
        }
    }

    /// Serializer precedence; higher binds tighter.
    pub fn priority(&self) -> u8 {
        match &self.kind {
            ExprKind::Unary { .. } => PRIORITY_UNARY,
            ExprKind::Binary { op, .. } => op.precedence(),
            ExprKind::Nary { op, .. } => op.precedence(),
            ExprKind::Property { .. } => PRIORITY_PROPERTY,
            _ => PRIORITY_ATOM,
        }
    }

    pub fn is_commutative(&self) -> bool {
        matches!(self.kind, ExprKind::Nary { .. })
            || matches!(
                self.kind,
                ExprKind::Binary {
                    op: BinaryOp::Eq | BinaryOp::NotEq,
                    ..
                }
            )
    }
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExprKind::Null => "Null",
            ExprKind::Bool(_) => "Bool",
            ExprKind::Double(_) => "Double",
            ExprKind::Str(_) => "String",
            ExprKind::DateTime(_) => "DateTime",
            ExprKind::Variable(_) => "VariableAccess",
            ExprKind::Property { .. } => "PropertyAccess",
            ExprKind::Array(_) => "Array",
            ExprKind::Unary { op: UnaryOp::Not, .. } => "Not",
            ExprKind::Unary { .. } => "UnaryMinus",
            ExprKind::Binary { .. } => "Binary",
            ExprKind::Nary { op, .. } => op.name(),
            ExprKind::If { .. } => "Ternary",
            ExprKind::Call { .. } => "FunctionCall",
            ExprKind::Aggregate { .. } => "Aggregate",
            ExprKind::Temporal { .. } => "Temporal",
            ExprKind::Each { .. } => "Each",
            ExprKind::Failed { .. } => "Failed",
            ExprKind::Twin(_) => "Twin",
            ExprKind::Object(_) => "Object",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests;
