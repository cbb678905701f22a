//! `eval`: evaluate an expression in an environment.

use tx_eval::{compile, evaluate_with_env, Compiled, Env, FromValue};
use tx_ir::Expr;

use super::{read_expression, CommandError};
use crate::fixture::{self, EnvFixture};

/// How to evaluate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EvalMode {
    /// Walk the tree directly.
    #[default]
    Direct,
    /// Compile to a boolean predicate first.
    Bool,
    /// Compile to a numeric expression first.
    Number,
}

impl EvalMode {
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "direct" => Some(EvalMode::Direct),
            "bool" => Some(EvalMode::Bool),
            "number" => Some(EvalMode::Number),
            _ => None,
        }
    }
}

/// Evaluate `expr` and render the result.
#[tracing::instrument(level = "debug", skip_all, fields(mode = ?mode))]
pub fn evaluate(expr: &Expr, env: &Env, mode: EvalMode) -> Result<String, CommandError> {
    fn compiled<T: FromValue + ToString>(expr: &Expr, env: &Env) -> Result<String, CommandError> {
        let compiled: Compiled<T> = compile(expr)?;
        Ok(compiled
            .evaluate(env)
            .map_or_else(|| "undefined".to_owned(), |value| value.to_string()))
    }

    match mode {
        EvalMode::Direct => Ok(evaluate_with_env(expr, env)?.to_string()),
        EvalMode::Bool => compiled::<bool>(expr, env),
        EvalMode::Number => compiled::<f64>(expr, env),
    }
}

pub fn eval_expression(arg: &str, env_path: Option<&str>, mode: EvalMode) -> Result<(), CommandError> {
    let expr = read_expression(arg)?;
    let env = match env_path {
        Some(path) => EnvFixture::from_json(path, &fixture::read(path)?)?.into_env()?,
        None => Env::empty(),
    };
    println!("{}", evaluate(&expr, &env, mode)?);
    Ok(())
}
