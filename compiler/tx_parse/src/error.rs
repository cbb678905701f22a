//! Parse errors.

use std::ops::Range;

/// What went wrong.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("unrecognized input '{0}'")]
    InvalidToken(String),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected {found}, expected {expected}")]
    UnexpectedToken {
        found: &'static str,
        expected: &'static str,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },

    #[error("{function} needs {expected} arguments, found {found}")]
    ArgumentCount {
        function: String,
        expected: &'static str,
        found: usize,
    },

    #[error("EACH needs a variable name as its second argument")]
    EachVariable,

    #[error("FAILED reason must be a string")]
    FailedReason,

    #[error("invalid date-time '{0}', expected YYYY-MM-DDTHH:MM:SS")]
    InvalidDateTime(String),
}

/// A parse error with the byte range it applies to.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {}..{}", span.start, span.end)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Range<usize>,
}

impl ParseError {
    #[cold]
    pub fn new(kind: ParseErrorKind, span: Range<usize>) -> Self {
        ParseError { kind, span }
    }
}
