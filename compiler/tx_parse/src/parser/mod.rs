//! Recursive descent parser.
//!
//! Precedence, loosest first: `|`, `&`, comparisons and `is`, `+ -`, `* /`,
//! `^`, unary `! -`, postfix `.name`. Unparenthesized chains of the same
//! commutative operator (`a + b + c`) become a single n-ary node; an explicit
//! parenthesized group stays nested so that serialization round-trips.

use std::ops::Range;

use tx_ir::stack::ensure_sufficient_stack;
use tx_ir::{unit, AggregateFn, BinaryOp, Expr, ExprKind, NaryOp, TemporalFn};

use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{unquote, RawToken, Token};

pub(crate) struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
}

/// Result of parsing one operand: the expression and whether it came from
/// an explicit parenthesized group.
struct Operand {
    expr: Expr,
    grouped: bool,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        Parser {
            source,
            tokens,
            pos: 0,
        }
    }

    pub(crate) fn parse_root(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        match self.peek() {
            None => Ok(expr),
            Some(token) => Err(self.unexpected(token, "end of input")),
        }
    }

    // Token cursor

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_raw(&self) -> Option<RawToken> {
        self.peek().map(|t| t.raw)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn slice(&self, span: &Range<usize>) -> &'src str {
        &self.source[span.clone()]
    }

    fn eof_span(&self) -> Range<usize> {
        self.source.len()..self.source.len()
    }

    /// True when the next token starts exactly where the previous one ended.
    fn next_is_adjacent(&self) -> bool {
        match (self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)), self.peek()) {
            (Some(prev), Some(next)) => prev.span.end == next.span.start,
            _ => false,
        }
    }

    fn next_is_word(&self, word: &str) -> bool {
        self.peek()
            .is_some_and(|t| t.raw == RawToken::Ident && self.slice(&t.span).eq_ignore_ascii_case(word))
    }

    #[cold]
    fn unexpected(&self, token: &Token, expected: &'static str) -> ParseError {
        ParseError::new(
            ParseErrorKind::UnexpectedToken {
                found: token.raw.describe(),
                expected,
            },
            token.span.clone(),
        )
    }

    fn expect(&mut self, raw: RawToken, expected: &'static str) -> Result<Token, ParseError> {
        match self.bump() {
            Some(token) if token.raw == raw => Ok(token),
            Some(token) => Err(self.unexpected(&token, expected)),
            None => Err(ParseError::new(
                ParseErrorKind::UnexpectedEof { expected },
                self.eof_span(),
            )),
        }
    }

    // Grammar

    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        ensure_sufficient_stack(|| self.parse_or().map(|op| op.expr))
    }

    fn parse_or(&mut self) -> Result<Operand, ParseError> {
        self.parse_nary_chain(NaryOp::Or, Self::parse_and, |p: &Self| {
            p.peek_raw() == Some(RawToken::Pipe) || p.next_is_word("or")
        })
    }

    fn parse_and(&mut self) -> Result<Operand, ParseError> {
        self.parse_nary_chain(NaryOp::And, Self::parse_comparison, |p: &Self| {
            p.peek_raw() == Some(RawToken::Amp) || p.next_is_word("and")
        })
    }

    /// `operand (op operand)*` folded into one n-ary node.
    fn parse_nary_chain(
        &mut self,
        op: NaryOp,
        mut operand: impl FnMut(&mut Self) -> Result<Operand, ParseError>,
        at_operator: impl Fn(&Self) -> bool,
    ) -> Result<Operand, ParseError> {
        let first = operand(self)?;
        if !at_operator(self) {
            return Ok(first);
        }
        let mut children = vec![first.expr];
        while at_operator(self) {
            self.bump();
            children.push(operand(self)?.expr);
        }
        Ok(Operand {
            expr: Expr::nary(op, children),
            grouped: false,
        })
    }

    fn parse_comparison(&mut self) -> Result<Operand, ParseError> {
        let left = self.parse_sum()?;
        let op = match self.peek_raw() {
            Some(RawToken::Eq) => BinaryOp::Eq,
            Some(RawToken::NotEq) => BinaryOp::NotEq,
            Some(RawToken::Lt) => BinaryOp::Lt,
            Some(RawToken::LtEq) => BinaryOp::LtEq,
            Some(RawToken::Gt) => BinaryOp::Gt,
            Some(RawToken::GtEq) => BinaryOp::GtEq,
            _ if self.next_is_word("is") => BinaryOp::Is,
            _ => return Ok(left),
        };
        self.bump();
        let right = self.parse_sum()?;
        Ok(Operand {
            expr: Expr::binary(op, left.expr, right.expr),
            grouped: false,
        })
    }

    fn parse_sum(&mut self) -> Result<Operand, ParseError> {
        self.parse_mixed_chain(
            NaryOp::Add,
            BinaryOp::Sub,
            RawToken::Plus,
            RawToken::Minus,
            Self::parse_product,
        )
    }

    fn parse_product(&mut self) -> Result<Operand, ParseError> {
        self.parse_mixed_chain(
            NaryOp::Mul,
            BinaryOp::Div,
            RawToken::Star,
            RawToken::Slash,
            Self::parse_power,
        )
    }

    /// Left-associative chain mixing a commutative operator (`+`) with its
    /// inverse (`-`). Consecutive commutative steps extend the same n-ary node.
    fn parse_mixed_chain(
        &mut self,
        nary: NaryOp,
        inverse: BinaryOp,
        nary_token: RawToken,
        inverse_token: RawToken,
        operand: fn(&mut Self) -> Result<Operand, ParseError>,
    ) -> Result<Operand, ParseError> {
        let mut acc = operand(self)?;
        loop {
            let raw = self.peek_raw();
            if raw == Some(nary_token) {
                self.bump();
                let rhs = operand(self)?.expr;
                let extend = !acc.grouped
                    && matches!(acc.expr.kind(), ExprKind::Nary { op, .. } if *op == nary)
                    && acc.expr.unit().is_none();
                acc.expr = if extend {
                    match acc.expr.into_kind() {
                        ExprKind::Nary { mut children, .. } => {
                            children.push(rhs);
                            Expr::nary(nary, children)
                        }
                        other => Expr::nary(nary, vec![other.into(), rhs]),
                    }
                } else {
                    Expr::nary(nary, vec![acc.expr, rhs])
                };
            } else if raw == Some(inverse_token) {
                self.bump();
                let rhs = operand(self)?.expr;
                acc.expr = Expr::binary(inverse, acc.expr, rhs);
            } else {
                return Ok(acc);
            }
            acc.grouped = false;
        }
    }

    fn parse_power(&mut self) -> Result<Operand, ParseError> {
        let mut acc = self.parse_unary()?;
        while self.peek_raw() == Some(RawToken::Caret) {
            self.bump();
            let rhs = self.parse_unary()?.expr;
            acc = Operand {
                expr: Expr::binary(BinaryOp::Pow, acc.expr, rhs),
                grouped: false,
            };
        }
        Ok(acc)
    }

    fn parse_unary(&mut self) -> Result<Operand, ParseError> {
        ensure_sufficient_stack(|| {
            if self.peek_raw() == Some(RawToken::Bang) || self.next_is_word("not") {
                self.bump();
                let operand = self.parse_unary()?.expr;
                return Ok(Operand {
                    expr: Expr::not(operand),
                    grouped: false,
                });
            }
            if self.peek_raw() == Some(RawToken::Minus) {
                self.bump();
                // `-200` is a negative constant, `-(200)` a negation
                if let Some(RawToken::Number(n)) = self.peek_raw() {
                    if self.next_is_adjacent() {
                        self.bump();
                        let expr = self.parse_unit_suffix(Expr::double(-n))?;
                        return self.parse_postfix(Operand {
                            expr,
                            grouped: false,
                        });
                    }
                }
                let operand = self.parse_unary()?.expr;
                return Ok(Operand {
                    expr: Expr::neg(operand),
                    grouped: false,
                });
            }
            let primary = self.parse_primary()?;
            self.parse_postfix(primary)
        })
    }

    fn parse_postfix(&mut self, mut operand: Operand) -> Result<Operand, ParseError> {
        while self.peek_raw() == Some(RawToken::Dot) {
            self.bump();
            let token = self.bump().ok_or_else(|| {
                ParseError::new(
                    ParseErrorKind::UnexpectedEof {
                        expected: "property name",
                    },
                    self.eof_span(),
                )
            })?;
            let name = match token.raw {
                RawToken::Ident => self.slice(&token.span).to_owned(),
                RawToken::Bracketed => bracket_inner(self.slice(&token.span)).to_owned(),
                _ => return Err(self.unexpected(&token, "property name")),
            };
            operand = Operand {
                expr: Expr::property(operand.expr, name),
                grouped: false,
            };
        }
        if operand.expr.unit().is_none() {
            operand.expr = self.parse_unit_suffix(operand.expr)?;
        }
        Ok(operand)
    }

    /// An optional unit written directly after an operand:
    /// `5h`, `1[h]`, `10%`, `21°C`, `(5 + 5)h`, `t[degC]`, `fan.speed[%]`.
    fn parse_unit_suffix(&mut self, expr: Expr) -> Result<Expr, ParseError> {
        if !self.next_is_adjacent() {
            return Ok(expr);
        }
        let unit_text = match self.peek() {
            Some(t) if t.raw == RawToken::Ident => self.slice(&t.span),
            Some(t) if t.raw == RawToken::Bracketed => bracket_inner(self.slice(&t.span)),
            Some(t) if matches!(t.raw, RawToken::Percent | RawToken::Degree) => {
                self.slice(&t.span)
            }
            _ => return Ok(expr),
        };
        self.bump();
        Ok(expr.with_unit(unit_text))
    }

    fn parse_primary(&mut self) -> Result<Operand, ParseError> {
        let Some(token) = self.bump() else {
            return Err(ParseError::new(
                ParseErrorKind::UnexpectedEof {
                    expected: "expression",
                },
                self.eof_span(),
            ));
        };
        let text = self.slice(&token.span);
        let expr = match token.raw {
            RawToken::Number(n) => self.parse_unit_suffix(Expr::double(n))?,
            RawToken::Str => Expr::string(unquote(text)),
            RawToken::Bracketed => Expr::variable(bracket_inner(text)).with_text(text),
            RawToken::Ident => {
                if self.peek_raw() == Some(RawToken::LParen) {
                    self.bump();
                    let args = self.parse_list(RawToken::RParen, "`)`")?;
                    self.build_call(text, args, token.span.start)?
                } else if text.eq_ignore_ascii_case("true") {
                    Expr::bool(true)
                } else if text.eq_ignore_ascii_case("false") {
                    Expr::bool(false)
                } else if text.eq_ignore_ascii_case("null") {
                    Expr::null()
                } else {
                    Expr::variable(text).with_text(text)
                }
            }
            RawToken::LBrace => Expr::array(self.parse_list(RawToken::RBrace, "`}`")?),
            RawToken::LParen => {
                let inner = self.parse_expr()?;
                self.expect(RawToken::RParen, "`)`")?;
                let expr = self.parse_unit_suffix(inner)?;
                return Ok(Operand {
                    expr,
                    grouped: true,
                });
            }
            _ => return Err(self.unexpected(&token, "expression")),
        };
        Ok(Operand {
            expr,
            grouped: false,
        })
    }

    /// Comma separated expressions up to `close`, which is consumed.
    fn parse_list(&mut self, close: RawToken, expected: &'static str) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        if self.peek_raw() == Some(close) {
            self.bump();
            return Ok(items);
        }
        loop {
            items.push(self.parse_expr()?);
            match self.bump() {
                Some(t) if t.raw == RawToken::Comma => {}
                Some(t) if t.raw == close => return Ok(items),
                Some(t) => return Err(self.unexpected(&t, expected)),
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedEof { expected },
                        self.eof_span(),
                    ))
                }
            }
        }
    }

    /// Calls with dedicated node kinds; everything else is a plain call.
    fn build_call(&self, name: &str, mut args: Vec<Expr>, start: usize) -> Result<Expr, ParseError> {
        let end = self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)).map_or(start, |t| t.span.end);
        let span = start..end;
        let found = args.len();
        let upper = name.to_ascii_uppercase();
        let arity = |expected: &'static str| {
            ParseError::new(
                ParseErrorKind::ArgumentCount {
                    function: upper.clone(),
                    expected,
                    found,
                },
                span.clone(),
            )
        };

        match upper.as_str() {
            "IF" => {
                return match <[Expr; 3]>::try_from(args) {
                    Ok([cond, then, otherwise]) => Ok(Expr::if_(cond, then, otherwise)),
                    Err(_) => Err(arity("3")),
                };
            }
            "EACH" => {
                let Ok([list, var, body]) = <[Expr; 3]>::try_from(args) else {
                    return Err(arity("3"));
                };
                return match var.into_kind() {
                    ExprKind::Variable(var) | ExprKind::Str(var) => Ok(Expr::each(list, var, body)),
                    _ => Err(ParseError::new(ParseErrorKind::EachVariable, span.clone())),
                };
            }
            "FAILED" => {
                return match found {
                    1 => Ok(Expr::failed("", args.remove(0))),
                    2 => {
                        let expr = args.remove(1);
                        match args.remove(0).into_kind() {
                            ExprKind::Str(reason) => Ok(Expr::failed(reason, expr)),
                            _ => Err(ParseError::new(ParseErrorKind::FailedReason, span.clone())),
                        }
                    }
                    _ => Err(arity("1 or 2")),
                };
            }
            "DATETIME" => {
                return match args.first().map(Expr::kind) {
                    Some(ExprKind::Str(text)) if found == 1 => tx_ir::parse_datetime(text)
                        .map(Expr::datetime)
                        .ok_or_else(|| {
                            ParseError::new(
                                ParseErrorKind::InvalidDateTime(text.clone()),
                                span.clone(),
                            )
                        }),
                    _ => Err(arity("1 string")),
                };
            }
            _ => {}
        }

        if let Some(temporal) = TemporalFn::from_name(&upper) {
            let periodic = (2..=3).contains(&args.len()) && args[1..].iter().all(is_time_span);
            if periodic {
                let until = (args.len() == 3).then(|| args.remove(2));
                let period = args.remove(1);
                return Ok(Expr::temporal(temporal, args.remove(0), period, until));
            }
            if temporal.is_temporal_only() {
                return Err(arity("2 or 3"));
            }
        }

        if let Some(aggregate) = AggregateFn::from_name(&upper) {
            return match args.len() {
                0 => Err(arity("at least 1")),
                1 => Ok(Expr::aggregate(aggregate, args.remove(0))),
                _ => Ok(Expr::aggregate(aggregate, Expr::array(args))),
            };
        }

        Ok(Expr::call(name, args).with_text(&self.source[span.clone()]))
    }
}

/// Period arguments of temporal functions carry a time unit: `1h`, `(5 + 5)[min]`.
fn is_time_span(expr: &Expr) -> bool {
    matches!(unit::kind_of_opt(expr.unit()), unit::UnitKind::Time(_))
}

fn bracket_inner(slice: &str) -> &str {
    &slice[1..slice.len() - 1]
}
