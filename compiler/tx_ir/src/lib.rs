//! Intermediate representation for the twin expression engine.
//!
//! This crate holds the types every other `tx_*` crate agrees on:
//!
//! - [`Expr`] / [`ExprKind`]: the immutable expression tree
//! - [`BinaryOp`], [`NaryOp`], [`UnaryOp`], [`AggregateFn`], [`TemporalFn`]: operators
//! - [`Value`] / [`ValueType`]: the closed value sum produced by evaluation
//! - [`unit`]: unit-of-measure registry and conversion constants
//! - [`Twin`], [`PropertyMap`], [`PropertyBag`]: the twin data model
//!
//! # Design
//!
//! Visitors are plain functions that `match` on [`ExprKind`]. Trees are never
//! mutated in place; every transformation builds new nodes.

mod expr;
mod operators;
pub mod stack;
mod twin;
pub mod unit;
mod value;

pub use expr::{Expr, ExprKind, PRIORITY_ATOM, PRIORITY_PROPERTY, PRIORITY_UNARY};
pub use operators::{AggregateFn, BinaryOp, NaryOp, TemporalFn, UnaryOp};
pub use twin::{PropertyBag, PropertyMap, PropertyValue, Twin, TwinRef};
pub use value::{ConversionError, Value, ValueType};

/// Date-time type used by constants and values.
pub type DateTime = time::PrimitiveDateTime;

const DATETIME_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
    time::macros::format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Parse `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_datetime(text: &str) -> Option<DateTime> {
    DateTime::parse(text.trim(), DATETIME_FORMAT).ok()
}

/// Format as `YYYY-MM-DDTHH:MM:SS`.
pub fn format_datetime(value: DateTime) -> String {
    value.format(DATETIME_FORMAT).unwrap_or_default()
}
