//! Inspection commands: `parse`, `simplify`, `describe` and `unbound`.

use std::fmt::Write;

use tx_ir::Expr;

use super::{read_expression, CommandError};

/// The diagnostic form and the canonical form of a parsed expression.
pub fn render_parse(expr: &Expr) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "tree:      {expr}");
    let _ = writeln!(out, "canonical: {}", tx_fmt::serialize(expr));
    let _ = writeln!(out, "type:      {}", expr.value_type());
    out
}

/// Free variables and non-builtin functions, one per line.
pub fn render_unbound(expr: &Expr) -> String {
    let mut out = String::new();
    for name in tx_canon::unbound_variables(expr) {
        let _ = writeln!(out, "variable  {name}");
    }
    for name in tx_canon::unbound_functions(expr) {
        let _ = writeln!(out, "function  {name}");
    }
    out
}

pub fn parse_expression(arg: &str) -> Result<(), CommandError> {
    let expr = read_expression(arg)?;
    print!("{}", render_parse(&expr));
    Ok(())
}

pub fn simplify_expression(arg: &str) -> Result<(), CommandError> {
    let expr = read_expression(arg)?;
    println!("{}", tx_fmt::serialize(&tx_canon::simplify(&expr)));
    Ok(())
}

pub fn describe_expression(arg: &str, metric: bool) -> Result<(), CommandError> {
    let expr = read_expression(arg)?;
    println!("{}", tx_fmt::describe(&expr, metric));
    Ok(())
}

pub fn unbound_expression(arg: &str) -> Result<(), CommandError> {
    let expr = read_expression(arg)?;
    print!("{}", render_unbound(&expr));
    Ok(())
}
