pub mod ansi;
pub mod json;
pub mod registry;

use crate::ast::Span;
use crate::error::Error;

/// A source range with a short caption, rendered under the snippet.
#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

/// An error report. Every diagnostic is an error; the first label is the primary one.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<&'static str>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
            source: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into() });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// ---- From impls for the per-stage error types ----

impl From<&crate::lexer::LexError> for Diagnostic {
    fn from(e: &crate::lexer::LexError) -> Self {
        let span = Span {
            start: e.position,
            end: e.position + e.snippet.len().max(1),
        };
        let mut d = Diagnostic::error(format!("unexpected input '{}'", e.snippet))
            .with_span(span, "here");
        if !e.suggestion.is_empty() {
            d = d.with_suggestion(e.suggestion.clone());
        }
        d
    }
}

impl From<&crate::parser::ParseError> for Diagnostic {
    fn from(e: &crate::parser::ParseError) -> Self {
        Diagnostic::error(&e.message).with_span(e.span, "here")
    }
}

impl From<&crate::vm::CompileError> for Diagnostic {
    fn from(e: &crate::vm::CompileError) -> Self {
        use crate::vm::CompileError;
        let d = Diagnostic::error(e.to_string());
        match e {
            CompileError::UnsupportedForm { span, .. } => d
                .with_span(*span, "not compilable")
                .with_note("only literals, global names and procedure calls compile"),
            CompileError::UnboundIdentifier { span, .. } => d
                .with_span(*span, "not defined")
                .with_suggestion("bind it first, e.g. `--define NAME=VALUE`"),
            CompileError::LimitExceeded { span, .. } => d.with_span(*span, "limit reached here"),
        }
    }
}

impl From<&crate::vm::VmError> for Diagnostic {
    fn from(e: &crate::vm::VmError) -> Self {
        Diagnostic::error(e.to_string())
    }
}

impl From<&Error> for Diagnostic {
    fn from(e: &Error) -> Self {
        let d = match e {
            Error::Lex(e) => Diagnostic::from(e),
            Error::Parse(e) => Diagnostic::from(e),
            Error::Compile(e) => Diagnostic::from(e),
            Error::Symbols(e) => Diagnostic::error(e.to_string()),
            Error::Vm { error, span } => Diagnostic::from(error).with_span(*span, "while evaluating this"),
        };
        d.with_code(e.kind().code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Loc;
    use crate::parser::{ParseError, ParseErrorKind};
    use crate::vm::{CompileError, VmError};

    #[test]
    fn diagnostic_error_builder() {
        let d = Diagnostic::error("something went wrong");
        assert_eq!(d.message, "something went wrong");
        assert!(d.code.is_none());
        assert!(d.labels.is_empty());
        assert!(d.notes.is_empty());
        assert!(d.suggestion.is_none());
    }

    #[test]
    fn diagnostic_with_span() {
        let d = Diagnostic::error("bad token")
            .with_span(Span { start: 5, end: 8 }, "here");
        assert_eq!(d.labels.len(), 1);
        assert_eq!(d.labels[0].span.start, 5);
        assert_eq!(d.labels[0].span.end, 8);
        assert_eq!(d.labels[0].message, "here");
    }

    #[test]
    fn from_lex_error() {
        let e = crate::lexer::LexError {
            position: 3,
            loc: Loc { line: 1, column: 4 },
            snippet: "[x]".to_string(),
            suggestion: "Use parentheses for lists.".to_string(),
        };
        let d = Diagnostic::from(&e);
        assert!(d.message.contains("[x]"));
        assert_eq!(d.labels[0].span, Span::new(3, 6));
        assert!(d.suggestion.is_some());
    }

    #[test]
    fn from_parse_error() {
        let e = ParseError {
            kind: ParseErrorKind::UnexpectedToken,
            loc: Loc { line: 1, column: 11 },
            span: Span { start: 10, end: 11 },
            message: "unexpected ')'".to_string(),
        };
        let d = Diagnostic::from(&e);
        assert!(d.message.contains("unexpected ')'"));
        assert_eq!(d.labels[0].span, Span { start: 10, end: 11 });
    }

    #[test]
    fn from_unbound_identifier_has_suggestion() {
        let e = CompileError::UnboundIdentifier { name: "x".to_string(), span: Span::new(0, 1) };
        let d = Diagnostic::from(&e);
        assert!(d.message.contains("x"));
        assert!(d.suggestion.as_deref().unwrap().contains("--define"));
    }

    #[test]
    fn from_crate_error_carries_code() {
        let e = Error::Vm { error: VmError::OperandStackOverflow, span: Span::new(2, 4) };
        let d = Diagnostic::from(&e);
        assert_eq!(d.code, Some("RKT-R001"));
        assert_eq!(d.labels[0].span, Span::new(2, 4));
        assert!(d.message.contains("overflow"));

        let e = Error::Compile(CompileError::UnsupportedForm { form: "quotation", span: Span::new(0, 2) });
        assert_eq!(Diagnostic::from(&e).code, Some("RKT-C001"));
    }

    #[test]
    fn symbol_table_full_is_a_limit() {
        let e = Error::Symbols(crate::symbol::SymbolTableFull);
        assert_eq!(Diagnostic::from(&e).code, Some("RKT-C003"));
    }
}
