//! Tokenizer.
//!
//! `RawToken` is logos-derived. Token text is not copied: the parser slices
//! the source with each token's span.

use std::ops::Range;

use logos::Logos;

use crate::error::{ParseError, ParseErrorKind};

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub(crate) enum RawToken {
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r"'([^'\\]|\\.)*'")]
    Str,

    /// `[anything but a closing bracket]`
    #[regex(r"\[[^\]]*\]")]
    Bracketed,

    #[regex(r"[\p{L}_$][\p{L}\p{N}_$]*")]
    Ident,

    /// `°C`, `°F`
    #[regex(r"°[CF]")]
    Degree,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("%")]
    Percent,

    #[token("=")]
    #[token("==")]
    Eq,
    #[token("!=")]
    #[token("<>")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,

    #[token("&")]
    #[token("&&")]
    Amp,
    #[token("|")]
    #[token("||")]
    Pipe,
    #[token("!")]
    Bang,

    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
}

impl RawToken {
    /// Short description for error messages.
    pub(crate) fn describe(self) -> &'static str {
        match self {
            RawToken::Number(_) => "number",
            RawToken::Str => "string",
            RawToken::Bracketed => "bracketed name",
            RawToken::Ident => "identifier",
            RawToken::Degree => "degree unit",
            RawToken::Plus => "`+`",
            RawToken::Minus => "`-`",
            RawToken::Star => "`*`",
            RawToken::Slash => "`/`",
            RawToken::Caret => "`^`",
            RawToken::Percent => "`%`",
            RawToken::Eq => "`=`",
            RawToken::NotEq => "`!=`",
            RawToken::Lt => "`<`",
            RawToken::LtEq => "`<=`",
            RawToken::Gt => "`>`",
            RawToken::GtEq => "`>=`",
            RawToken::Amp => "`&`",
            RawToken::Pipe => "`|`",
            RawToken::Bang => "`!`",
            RawToken::Dot => "`.`",
            RawToken::Comma => "`,`",
            RawToken::LParen => "`(`",
            RawToken::RParen => "`)`",
            RawToken::LBrace => "`{`",
            RawToken::RBrace => "`}`",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Token {
    pub raw: RawToken,
    pub span: Range<usize>,
}

/// Tokenize `source`. The first unrecognized character is an error.
pub(crate) fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = RawToken::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(raw) => tokens.push(Token { raw, span }),
            Err(()) => {
                let kind = if lexer.slice().starts_with(|c: char| c.is_ascii_digit()) {
                    ParseErrorKind::InvalidNumber(lexer.slice().to_owned())
                } else {
                    ParseErrorKind::InvalidToken(lexer.slice().to_owned())
                };
                return Err(ParseError::new(kind, span));
            }
        }
    }
    Ok(tokens)
}

/// Strip quotes from a string token and resolve backslash escapes.
pub(crate) fn unquote(slice: &str) -> String {
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<RawToken> {
        lex(source)
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.raw)
            .collect()
    }

    #[test]
    fn test_operators_and_literals() {
        assert_eq!(
            kinds("a >= 1.5 & [b c] != 'x'"),
            vec![
                RawToken::Ident,
                RawToken::GtEq,
                RawToken::Number(1.5),
                RawToken::Amp,
                RawToken::Bracketed,
                RawToken::NotEq,
                RawToken::Str,
            ]
        );
    }

    #[test]
    fn test_units_are_adjacent_tokens() {
        let tokens = lex("5°C").unwrap_or_default();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].span.end, tokens[1].span.start);
        assert_eq!(kinds("10%"), vec![RawToken::Number(10.0), RawToken::Percent]);
    }

    #[test]
    fn test_unicode_identifiers() {
        assert_eq!(kinds("débit"), vec![RawToken::Ident]);
        assert_eq!(kinds("$_abcd"), vec![RawToken::Ident]);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#""a\"b""#), "a\"b");
        assert_eq!(unquote("'it\\'s'"), "it's");
    }

    #[test]
    fn test_invalid_character() {
        let err = lex("a # b").err();
        assert_eq!(
            err.map(|e| e.kind),
            Some(ParseErrorKind::InvalidToken("#".to_owned()))
        );
    }
}
