//! Operators and built-in aggregate families.
//!
//! # Precedence
//!
//! Higher binds tighter. `&` and `|` share a level so that mixing them in
//! serialized output is always parenthesized.
//!
//! | level | operators |
//! |---|---|
//! | 7 | unary `!` `-` |
//! | 6 | `^` |
//! | 5 | `*` `/` |
//! | 4 | `+` `-` |
//! | 3 | `=` `!=` `<` `<=` `>` `>=` `is` |
//! | 2 | `&` `|` |

/// Non-commutative binary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    // Arithmetic
    Sub,
    Div,
    Pow,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Model predicate
    Is,
}

impl BinaryOp {
    /// Returns the source-level symbol for this operator.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Sub => "-",
            Self::Div => "/",
            Self::Pow => "^",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Is => "is",
        }
    }

    /// Binding strength, see the module table.
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Pow => 6,
            Self::Div => 5,
            Self::Sub => 4,
            Self::Eq
            | Self::NotEq
            | Self::Lt
            | Self::LtEq
            | Self::Gt
            | Self::GtEq
            | Self::Is => 3,
        }
    }

    /// Comparison operators produce a boolean from two ordered operands.
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    /// `a op b op c` means `(a op b) op c`.
    pub const fn is_left_associative(self) -> bool {
        matches!(self, Self::Sub | Self::Div | Self::Pow)
    }

    /// The operator with swapped operands: `a < b` is `b > a`.
    pub const fn mirrored(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::LtEq => Self::GtEq,
            Self::Gt => Self::Lt,
            Self::GtEq => Self::LtEq,
            other => other,
        }
    }

    /// The logical complement of a comparison: `!(a < b)` is `a >= b`.
    pub const fn negated(self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::NotEq),
            Self::NotEq => Some(Self::Eq),
            Self::Lt => Some(Self::GtEq),
            Self::LtEq => Some(Self::Gt),
            Self::Gt => Some(Self::LtEq),
            Self::GtEq => Some(Self::Lt),
            _ => None,
        }
    }

    /// English phrase used by the describer.
    pub const fn as_phrase(self) -> &'static str {
        match self {
            Self::Sub => "minus",
            Self::Div => "divided by",
            Self::Pow => "to the power of",
            Self::Eq => "is",
            Self::NotEq => "is not",
            Self::Lt => "is less than",
            Self::LtEq => "is less than or equal to",
            Self::Gt => "is greater than",
            Self::GtEq => "is greater than or equal to",
            Self::Is => "is a",
        }
    }
}

/// Commutative operators over any number of children.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum NaryOp {
    Add,
    Mul,
    And,
    Or,
}

impl NaryOp {
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Mul => "*",
            Self::And => "&",
            Self::Or => "|",
        }
    }

    pub const fn precedence(self) -> u8 {
        match self {
            Self::Mul => 5,
            Self::Add => 4,
            Self::And | Self::Or => 2,
        }
    }

    pub const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub const fn as_phrase(self) -> &'static str {
        match self {
            Self::Add => "plus",
            Self::Mul => "times",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// Name used in failure messages ("Array not allowed for And").
    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Mul => "Multiply",
            Self::And => "And",
            Self::Or => "Or",
        }
    }
}

/// Unary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Not,
    Minus,
}

impl UnaryOp {
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Minus => "-",
        }
    }
}

/// Aggregates over an array operand: `SUM({1,2,3})`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AggregateFn {
    Sum,
    Count,
    Average,
    Min,
    Max,
    Any,
    All,
    First,
}

impl AggregateFn {
    pub const ALL: [Self; 8] = [
        Self::Sum,
        Self::Count,
        Self::Average,
        Self::Min,
        Self::Max,
        Self::Any,
        Self::All,
        Self::First,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Sum => "SUM",
            Self::Count => "COUNT",
            Self::Average => "AVERAGE",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Any => "ANY",
            Self::All => "ALL",
            Self::First => "FIRST",
        }
    }

    /// Case-insensitive lookup by function name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    pub const fn is_boolean(self) -> bool {
        matches!(self, Self::Any | Self::All)
    }
}

/// Aggregates over a time window of a point's history: `AVERAGE(x, 1h)`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TemporalFn {
    Average,
    Min,
    Max,
    Sum,
    Count,
    Any,
    All,
    Delta,
    DeltaTime,
    Stnd,
    Slope,
    Forecast,
}

impl TemporalFn {
    pub const ALL: [Self; 12] = [
        Self::Average,
        Self::Min,
        Self::Max,
        Self::Sum,
        Self::Count,
        Self::Any,
        Self::All,
        Self::Delta,
        Self::DeltaTime,
        Self::Stnd,
        Self::Slope,
        Self::Forecast,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Average => "AVERAGE",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Sum => "SUM",
            Self::Count => "COUNT",
            Self::Any => "ANY",
            Self::All => "ALL",
            Self::Delta => "DELTA",
            Self::DeltaTime => "DELTA_TIME",
            Self::Stnd => "STND",
            Self::Slope => "SLOPE",
            Self::Forecast => "FORECAST",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    /// Functions that only exist in their temporal form (`DELTA(x, 1h)`).
    pub const fn is_temporal_only(self) -> bool {
        matches!(
            self,
            Self::Delta | Self::DeltaTime | Self::Stnd | Self::Slope | Self::Forecast
        )
    }

    pub const fn is_boolean(self) -> bool {
        matches!(self, Self::Any | Self::All)
    }
}
