use crate::ast::Span;
use crate::lexer::LexError;
use crate::parser::{ParseError, ParseErrorKind};
use crate::symbol::SymbolTableFull;
use crate::vm::{CompileError, VmError};

/// Any failure from source text to final value.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Symbols(#[from] SymbolTableFull),
    /// A runtime failure, located at the top-level expression that raised it.
    #[error("{error}")]
    Vm {
        #[source]
        error: VmError,
        span: Span,
    },
}

/// Stable classification of every [`Error`], one diagnostic code each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidToken,
    UnexpectedToken,
    IncompleteInput,
    UnsupportedForm,
    UnboundIdentifier,
    LimitExceeded,
    OperandStackOverflow,
    OperandStackUnderflow,
    CallStackOverflow,
    InvalidOpcode,
    InvalidOperand,
    InstructionOverrun,
    NotCallable,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InvalidToken => "RKT-L001",
            ErrorKind::UnexpectedToken => "RKT-P001",
            ErrorKind::IncompleteInput => "RKT-P002",
            ErrorKind::UnsupportedForm => "RKT-C001",
            ErrorKind::UnboundIdentifier => "RKT-C002",
            ErrorKind::LimitExceeded => "RKT-C003",
            ErrorKind::OperandStackOverflow => "RKT-R001",
            ErrorKind::OperandStackUnderflow => "RKT-R002",
            ErrorKind::CallStackOverflow => "RKT-R003",
            ErrorKind::InvalidOpcode => "RKT-R004",
            ErrorKind::InvalidOperand => "RKT-R005",
            ErrorKind::InstructionOverrun => "RKT-R006",
            ErrorKind::NotCallable => "RKT-R007",
        }
    }
}

impl From<&VmError> for ErrorKind {
    fn from(e: &VmError) -> Self {
        match e {
            VmError::OperandStackOverflow => ErrorKind::OperandStackOverflow,
            VmError::OperandStackUnderflow => ErrorKind::OperandStackUnderflow,
            VmError::CallStackOverflow => ErrorKind::CallStackOverflow,
            VmError::InvalidOpcode { .. } => ErrorKind::InvalidOpcode,
            VmError::InvalidOperand { .. } => ErrorKind::InvalidOperand,
            VmError::InstructionOverrun { .. } => ErrorKind::InstructionOverrun,
            VmError::NotCallable { .. } => ErrorKind::NotCallable,
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Lex(_) => ErrorKind::InvalidToken,
            Error::Parse(e) => match e.kind {
                ParseErrorKind::UnexpectedToken => ErrorKind::UnexpectedToken,
                ParseErrorKind::Incomplete => ErrorKind::IncompleteInput,
                ParseErrorKind::TooDeep => ErrorKind::LimitExceeded,
            },
            Error::Compile(CompileError::UnsupportedForm { .. }) => ErrorKind::UnsupportedForm,
            Error::Compile(CompileError::UnboundIdentifier { .. }) => ErrorKind::UnboundIdentifier,
            Error::Compile(CompileError::LimitExceeded { .. }) | Error::Symbols(_) => ErrorKind::LimitExceeded,
            Error::Vm { error, .. } => error.into(),
        }
    }

    /// Byte range in the source that the error points at, when there is one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Lex(e) => Some(Span::new(e.position, e.position + e.snippet.len().max(1))),
            Error::Parse(e) => Some(e.span),
            Error::Compile(e) => Some(e.span()),
            Error::Symbols(_) => None,
            Error::Vm { span, .. } => Some(*span),
        }
    }

    /// True when more input could turn this into a complete program.
    pub fn is_incomplete(&self) -> bool {
        self.kind() == ErrorKind::IncompleteInput
    }
}
