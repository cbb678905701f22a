//! `bind`: bind an expression to a twin in a building fixture, then simplify
//! and, when binding succeeded, evaluate it.

use std::fmt;

use tx_bind::{BindOptions, BindToTwins};
use tx_eval::{evaluate_with_env, Env};
use tx_ir::{Expr, Value};

use super::{read_expression, CommandError};
use crate::fixture::{self, Building, BuildingFixture, EnvFixture};

/// What to bind against.
#[derive(Clone, Debug, Default)]
pub struct BindRequest {
    pub twin: String,
    pub env: Option<String>,
    pub options: BindOptions,
}

/// The stages of one binding.
#[derive(Clone, Debug)]
pub struct BindReport {
    pub success: bool,
    pub bound: Expr,
    pub simplified: Expr,
    /// Only computed for successful bindings.
    pub value: Option<Value>,
}

impl fmt::Display for BindReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "success:    {}", self.success)?;
        writeln!(f, "bound:      {}", tx_fmt::serialize(&self.bound))?;
        writeln!(f, "simplified: {}", tx_fmt::serialize(&self.simplified))?;
        if let Some(value) = &self.value {
            writeln!(f, "value:      {value}")?;
        }
        Ok(())
    }
}

/// Bind `expr` centred on `twin_id` in `building`.
#[tracing::instrument(level = "debug", skip_all, fields(twin = twin_id))]
pub fn bind_report(
    expr: &Expr,
    building: &Building,
    twin_id: &str,
    env: &Env,
    options: BindOptions,
) -> Result<BindReport, CommandError> {
    let twin = building
        .twin(twin_id)
        .ok_or_else(|| CommandError::UnknownTwin(twin_id.to_owned()))?;

    let mut binder = BindToTwins::with_options(env, twin, building.services.clone(), options);
    let bound = binder.bind(expr);
    let success = binder.success();
    let simplified = tx_canon::simplify(&bound);

    let value = if success {
        Some(evaluate_with_env(&simplified, binder.env())?)
    } else {
        None
    };

    Ok(BindReport {
        success,
        bound,
        simplified,
        value,
    })
}

pub fn bind_expression(arg: &str, building_path: &str, request: BindRequest) -> Result<(), CommandError> {
    let expr = read_expression(arg)?;
    let building = BuildingFixture::from_json(building_path, &fixture::read(building_path)?)?
        .into_building()?;
    let env = match request.env.as_deref() {
        Some(path) => EnvFixture::from_json(path, &fixture::read(path)?)?.into_env()?,
        None => Env::empty(),
    };

    let report = bind_report(&expr, &building, &request.twin, &env, request.options)?;
    print!("{report}");
    if !report.success {
        if let Some(failed) = report.bound.first_failed() {
            eprintln!("first failure: {failed}");
        }
    }
    Ok(())
}
