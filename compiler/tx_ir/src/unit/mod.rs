//! Units of measure.
//!
//! Units are carried as plain strings on expression nodes. This module maps
//! the many spellings seen in twin metadata onto canonical names and exposes
//! the fixed linear conversions used by `CELSIUS`, `FAHRENHEIT`, `METRIC` and
//! `PERCENTAGE`.

use std::borrow::Cow;

pub const DEG_C: &str = "degC";
pub const DEG_F: &str = "degF";
pub const LPS: &str = "l/s";
pub const CFM: &str = "cfm";
pub const PERCENT: &str = "%";
pub const PERCENT_100: &str = "percentage100";

/// `(v - 32) * CELSIUS_FACTOR` converts °F to °C.
pub const CELSIUS_FACTOR: f64 = 0.555_555_555_555_556;
pub const FAHRENHEIT_FACTOR: f64 = 1.8;
pub const FAHRENHEIT_OFFSET: f64 = 32.0;
pub const CFM_TO_LPS: f64 = 0.471_947_45;
pub const PERCENT_100_TO_PERCENT: f64 = 0.01;

/// Conversion family a unit belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum UnitKind {
    Celsius,
    Fahrenheit,
    LitresPerSecond,
    CubicFeetPerMinute,
    /// Percentage as a 0..100 number (`%`).
    Percentage,
    /// Percentage stored as 0..10000 (`percentage100`).
    Percentage100,
    Time(TimeUnit),
    Other,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl TimeUnit {
    pub const fn seconds(self) -> f64 {
        match self {
            Self::Second => 1.0,
            Self::Minute => 60.0,
            Self::Hour => 3_600.0,
            Self::Day => 86_400.0,
            Self::Week => 604_800.0,
        }
    }

    pub const fn canonical(self) -> &'static str {
        match self {
            Self::Second => "s",
            Self::Minute => "min",
            Self::Hour => "h",
            Self::Day => "d",
            Self::Week => "w",
        }
    }
}

const ALIASES: &[(&str, UnitKind)] = &[
    (DEG_C, UnitKind::Celsius),
    ("degrees-celsius", UnitKind::Celsius),
    ("°C", UnitKind::Celsius),
    ("celsius", UnitKind::Celsius),
    (DEG_F, UnitKind::Fahrenheit),
    ("degrees-fahrenheit", UnitKind::Fahrenheit),
    ("°F", UnitKind::Fahrenheit),
    ("fahrenheit", UnitKind::Fahrenheit),
    (LPS, UnitKind::LitresPerSecond),
    ("lps", UnitKind::LitresPerSecond),
    ("liters-per-second", UnitKind::LitresPerSecond),
    (CFM, UnitKind::CubicFeetPerMinute),
    ("cubic-feet-per-minute", UnitKind::CubicFeetPerMinute),
    (PERCENT, UnitKind::Percentage),
    ("percentage", UnitKind::Percentage),
    ("percent", UnitKind::Percentage),
    (PERCENT_100, UnitKind::Percentage100),
    ("%100", UnitKind::Percentage100),
    ("s", UnitKind::Time(TimeUnit::Second)),
    ("sec", UnitKind::Time(TimeUnit::Second)),
    ("second", UnitKind::Time(TimeUnit::Second)),
    ("seconds", UnitKind::Time(TimeUnit::Second)),
    ("min", UnitKind::Time(TimeUnit::Minute)),
    ("minute", UnitKind::Time(TimeUnit::Minute)),
    ("minutes", UnitKind::Time(TimeUnit::Minute)),
    ("h", UnitKind::Time(TimeUnit::Hour)),
    ("hr", UnitKind::Time(TimeUnit::Hour)),
    ("hour", UnitKind::Time(TimeUnit::Hour)),
    ("hours", UnitKind::Time(TimeUnit::Hour)),
    ("d", UnitKind::Time(TimeUnit::Day)),
    ("day", UnitKind::Time(TimeUnit::Day)),
    ("days", UnitKind::Time(TimeUnit::Day)),
    ("w", UnitKind::Time(TimeUnit::Week)),
    ("week", UnitKind::Time(TimeUnit::Week)),
    ("weeks", UnitKind::Time(TimeUnit::Week)),
];

/// Classify a unit string. Matching is exact first, then ASCII case-insensitive.
pub fn kind_of(unit: &str) -> UnitKind {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == unit)
        .or_else(|| ALIASES.iter().find(|(alias, _)| alias.eq_ignore_ascii_case(unit)))
        .map_or(UnitKind::Other, |(_, kind)| *kind)
}

/// Classify an optional unit; no unit is [`UnitKind::Other`].
pub fn kind_of_opt(unit: Option<&str>) -> UnitKind {
    unit.map_or(UnitKind::Other, kind_of)
}

/// Canonical spelling of a unit, or the input if unknown.
pub fn canonical(unit: &str) -> Cow<'_, str> {
    let name = match kind_of(unit) {
        UnitKind::Celsius => DEG_C,
        UnitKind::Fahrenheit => DEG_F,
        UnitKind::LitresPerSecond => LPS,
        UnitKind::CubicFeetPerMinute => CFM,
        UnitKind::Percentage => PERCENT,
        UnitKind::Percentage100 => PERCENT_100,
        UnitKind::Time(t) => t.canonical(),
        UnitKind::Other => return Cow::Borrowed(unit),
    };
    Cow::Borrowed(name)
}

/// Length of a time span like `1h` in seconds.
pub fn to_seconds(amount: f64, unit: &str) -> Option<f64> {
    match kind_of(unit) {
        UnitKind::Time(t) => Some(amount * t.seconds()),
        _ => None,
    }
}

/// Human readable unit suffix in the caller's measurement system.
///
/// Temperatures are spelled in the target system; callers convert the
/// amount with [`to_system`] first.
pub fn describe(unit: &str, metric: bool) -> Cow<'_, str> {
    match (kind_of(unit), metric) {
        (UnitKind::Celsius | UnitKind::Fahrenheit, true) => Cow::Borrowed("°C"),
        (UnitKind::Celsius | UnitKind::Fahrenheit, false) => Cow::Borrowed("°F"),
        (UnitKind::LitresPerSecond, _) => Cow::Borrowed("litres per second"),
        (UnitKind::CubicFeetPerMinute, _) => Cow::Borrowed("cubic feet per minute"),
        (UnitKind::Percentage | UnitKind::Percentage100, _) => Cow::Borrowed("%"),
        (UnitKind::Time(t), _) => Cow::Borrowed(match t {
            TimeUnit::Second => "seconds",
            TimeUnit::Minute => "minutes",
            TimeUnit::Hour => "hours",
            TimeUnit::Day => "days",
            TimeUnit::Week => "weeks",
        }),
        (UnitKind::Other, _) => Cow::Borrowed(unit),
    }
}

/// Convert a temperature amount into the metric or imperial system.
/// Other units pass through unchanged.
pub fn to_system(amount: f64, unit: &str, metric: bool) -> f64 {
    match (kind_of(unit), metric) {
        (UnitKind::Fahrenheit, true) => (amount - FAHRENHEIT_OFFSET) * CELSIUS_FACTOR,
        (UnitKind::Celsius, false) => FAHRENHEIT_OFFSET + amount * FAHRENHEIT_FACTOR,
        _ => amount,
    }
}

/// A unit-coercing function: `CELSIUS(x)`, `METRIC(x)`, ...
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Coercion {
    Celsius,
    Fahrenheit,
    Metric,
    Percentage,
}

/// What a coercion does to an argument in a given unit.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Conversion {
    /// Already in the target system.
    Keep,
    /// `32 + v * 1.8` in degF.
    CelsiusToFahrenheit,
    /// `(v - 32) * 0.555555555555556` in degC.
    FahrenheitToCelsius,
    /// `v * 0.47194745` in l/s.
    CfmToLps,
    /// `v * 0.01` in %.
    Percent100ToPercent,
    /// The unit has no counterpart in the target system.
    Reject,
}

impl Coercion {
    /// Matches the misspellings found in existing rules too.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "CELSIUS" | "CELCIUS" => Some(Coercion::Celsius),
            "FAHRENHEIT" | "FARENHEIT" | "FARHENHEIT" => Some(Coercion::Fahrenheit),
            "METRIC" => Some(Coercion::Metric),
            "PERCENTAGE" | "PERCENT" => Some(Coercion::Percentage),
            _ => None,
        }
    }

    pub fn conversion(self, unit: Option<&str>) -> Conversion {
        match (self, kind_of_opt(unit)) {
            (Coercion::Fahrenheit, UnitKind::Celsius) => Conversion::CelsiusToFahrenheit,
            (Coercion::Celsius | Coercion::Metric, UnitKind::Fahrenheit) => {
                Conversion::FahrenheitToCelsius
            }
            (Coercion::Metric, UnitKind::CubicFeetPerMinute) => Conversion::CfmToLps,
            (Coercion::Metric, UnitKind::Percentage | UnitKind::Percentage100) => {
                Conversion::Reject
            }
            (Coercion::Percentage, UnitKind::Percentage) => Conversion::Keep,
            (Coercion::Percentage, UnitKind::Percentage100) => Conversion::Percent100ToPercent,
            (Coercion::Percentage, _) => Conversion::Reject,
            _ => Conversion::Keep,
        }
    }
}

impl Conversion {
    /// Unit of the converted amount; `None` keeps the argument's unit.
    pub const fn target_unit(self) -> Option<&'static str> {
        match self {
            Conversion::CelsiusToFahrenheit => Some(DEG_F),
            Conversion::FahrenheitToCelsius => Some(DEG_C),
            Conversion::CfmToLps => Some(LPS),
            Conversion::Percent100ToPercent => Some(PERCENT),
            Conversion::Keep | Conversion::Reject => None,
        }
    }

    /// Convert an amount; `None` when rejected.
    pub fn apply(self, amount: f64) -> Option<f64> {
        match self {
            Conversion::Keep => Some(amount),
            Conversion::CelsiusToFahrenheit => Some(FAHRENHEIT_OFFSET + amount * FAHRENHEIT_FACTOR),
            Conversion::FahrenheitToCelsius => Some((amount - FAHRENHEIT_OFFSET) * CELSIUS_FACTOR),
            Conversion::CfmToLps => Some(amount * CFM_TO_LPS),
            Conversion::Percent100ToPercent => Some(amount * PERCENT_100_TO_PERCENT),
            Conversion::Reject => None,
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
