//! Command handlers for the `txc` CLI.
//!
//! Each submodule implements one command. Expression arguments are either
//! inline text or `@path` to read the expression from a file.

use tx_eval::{CompileError, EvalError};
use tx_ir::Expr;
use tx_parse::ParseError;

use crate::fixture::{self, FixtureError};

mod bind;
mod eval;
mod inspect;

pub use bind::{bind_expression, bind_report, BindReport, BindRequest};
pub use eval::{eval_expression, evaluate, EvalMode};
pub use inspect::{
    describe_expression, parse_expression, render_parse, render_unbound, simplify_expression,
    unbound_expression,
};

/// Why a command could not complete.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("no twin '{0}' in the building")]
    UnknownTwin(String),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Expression text from an argument: inline, or `@path` for a file.
pub(crate) fn expression_text(arg: &str) -> Result<String, CommandError> {
    match arg.strip_prefix('@') {
        Some(path) => Ok(fixture::read(path)?),
        None => Ok(arg.to_owned()),
    }
}

pub(crate) fn read_expression(arg: &str) -> Result<Expr, CommandError> {
    let text = expression_text(arg)?;
    Ok(tx_parse::parse(text.trim())?)
}
