//! Parser for the twin expression language.
//!
//! ```text
//! OPTION([zone air temp], [return air temp]) > 21°C & this.fan.speed < 80%
//! ```
//!
//! [`parse`] turns text into a [`tx_ir::Expr`]. Empty input parses as `True`,
//! the neutral rule condition.

mod error;
mod lexer;
mod parser;

pub use error::{ParseError, ParseErrorKind};

use tx_ir::Expr;

/// Parse a complete expression.
#[tracing::instrument(level = "debug", skip_all)]
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = lexer::lex(source)?;
    if tokens.is_empty() {
        return Ok(Expr::bool(true));
    }
    let result = parser::Parser::new(source, tokens).parse_root();
    if let Err(err) = &result {
        tracing::debug!(%err, source, "parse failed");
    }
    result
}
