use std::fmt::{self, Write};

use logos::Logos;

use crate::ast::{SourceMap, Span};
use crate::value::char_by_name;

/// Raw token set recognised by logos. Converted to [`TokenKind`] (which adds `Eof`)
/// before it leaves this module.
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip(r";[^\n]*", allow_greedy = true))]
enum Raw {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(".")]
    Dot,
    #[token("'")]
    Quote,
    #[token("`")]
    Backquote,

    #[token("#t", |_| Some(true))]
    #[token("#true", |_| Some(true))]
    #[token("#f", |_| Some(false))]
    #[token("#false", |_| Some(false))]
    Boolean(bool),

    // `#\x` for any single char, or `#\name` for the named ones.
    #[regex(r"#\\([a-zA-Z]+|.)", char_literal)]
    Char(char),

    #[regex(r"[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    // <initial> <subsequent>*, or a peculiar identifier starting with a sign or a dot.
    #[regex(
        r"[a-zA-Z!$%&*/:<=>?@^_~][a-zA-Z0-9!$%&*/:<=>?@^_~+\-.]*|[+-]([a-zA-Z!$%&*/:<=>?@^_~+\-][a-zA-Z0-9!$%&*/:<=>?@^_~+\-.]*|\.[a-zA-Z!$%&*/:<=>?@^_~+\-.][a-zA-Z0-9!$%&*/:<=>?@^_~+\-.]*)?|\.[a-zA-Z!$%&*/:<=>?@^_~+\-.][a-zA-Z0-9!$%&*/:<=>?@^_~+\-.]*",
        |lex| lex.slice().to_string()
    )]
    Ident(String),
}

fn char_literal(lex: &mut logos::Lexer<Raw>) -> Option<char> {
    let name = &lex.slice()[2..];
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => char_by_name(name),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    Dot,
    Quote,
    Backquote,
    Boolean(bool),
    Char(char),
    Number(f64),
    Ident(String),
    Eof,
}

impl TokenKind {
    /// Upper-case tag used by the token dump.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::Dot => "DOT",
            TokenKind::Quote => "QUOTE",
            TokenKind::Backquote => "BACKQUOTE",
            TokenKind::Boolean(_) => "BOOL",
            TokenKind::Char(_) => "CHAR",
            TokenKind::Number(_) => "NUMBER",
            TokenKind::Ident(_) => "IDENTIFIER",
            TokenKind::Eof => "EOF",
        }
    }
}

impl From<Raw> for TokenKind {
    fn from(raw: Raw) -> Self {
        match raw {
            Raw::LParen => TokenKind::LParen,
            Raw::RParen => TokenKind::RParen,
            Raw::Dot => TokenKind::Dot,
            Raw::Quote => TokenKind::Quote,
            Raw::Backquote => TokenKind::Backquote,
            Raw::Boolean(b) => TokenKind::Boolean(b),
            Raw::Char(c) => TokenKind::Char(c),
            Raw::Number(n) => TokenKind::Number(n),
            Raw::Ident(s) => TokenKind::Ident(s),
        }
    }
}

/// 1-based line and column of a token's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Loc {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub loc: Loc,
    /// Source text of the token; empty for `Eof`.
    pub literal: String,
}

/// Lex source code into located tokens. The result always ends with an `Eof` token.
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    let map = SourceMap::new(source);
    let locate = |offset: usize| {
        let (line, column) = map.lookup(offset);
        Loc { line, column }
    };

    let mut lexer = Raw::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(raw) => tokens.push(Token {
                kind: raw.into(),
                span: span.clone().into(),
                loc: locate(span.start),
                literal: source[span].to_string(),
            }),
            Err(()) => {
                let snippet = bad_token_text(source, span.start);
                return Err(LexError {
                    position: span.start,
                    loc: locate(span.start),
                    suggestion: suggest_fix(&snippet),
                    snippet,
                });
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(source.len(), source.len()),
        loc: locate(source.len()),
        literal: String::new(),
    });
    Ok(tokens)
}

/// Widen an error position out to the next delimiter so the message shows the whole word.
fn bad_token_text(source: &str, start: usize) -> String {
    let rest = &source[start..];
    let word = rest
        .split(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .next()
        .unwrap_or_default();
    if word.is_empty() {
        rest.chars().take(1).collect()
    } else {
        word.to_string()
    }
}

/// Every lex error comes with a suggested fix.
fn suggest_fix(bad_token: &str) -> String {
    if let Some(rest) = bad_token.strip_prefix("#\\") {
        format!("Unknown character name '{}'. Use a single character or one of: space, newline, tab.", rest)
    } else if bad_token.starts_with('#') {
        "Booleans are written #t or #f; characters start with #\\.".to_string()
    } else if bad_token.starts_with(',') {
        "Unquote is not supported; only ' and ` quotation marks are.".to_string()
    } else if bad_token.starts_with('"') {
        "String literals are not supported.".to_string()
    } else if bad_token.starts_with(['[', ']', '{', '}']) {
        "Use parentheses for lists.".to_string()
    } else {
        format!("Unexpected character(s): '{}'.", bad_token)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Lex error at {loc}: '{snippet}'. {suggestion}")]
pub struct LexError {
    pub position: usize,
    pub loc: Loc,
    pub snippet: String,
    pub suggestion: String,
}

/// One `(line:col) KIND: literal` line per token, `Eof` included.
pub fn dump(tokens: &[Token]) -> String {
    let mut out = String::new();
    for tok in tokens {
        let _ = writeln!(out, "({}) {}: {}", tok.loc, tok.kind.name(), tok.literal);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_procedure_call() {
        assert_eq!(
            kinds("(add 1 2.5)"),
            vec![
                TokenKind::LParen,
                TokenKind::Ident("add".into()),
                TokenKind::Number(1.0),
                TokenKind::Number(2.5),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_booleans_long_and_short() {
        assert_eq!(
            kinds("#t #true #f #false"),
            vec![
                TokenKind::Boolean(true),
                TokenKind::Boolean(true),
                TokenKind::Boolean(false),
                TokenKind::Boolean(false),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_characters() {
        assert_eq!(
            kinds(r"#\a #\space #\( #\newline"),
            vec![
                TokenKind::Char('a'),
                TokenKind::Char(' '),
                TokenKind::Char('('),
                TokenKind::Char('\n'),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_numbers_with_signs_and_exponents() {
        assert_eq!(
            kinds("3.1400 -7 +2 .5 1e3 -2.5e-1"),
            vec![
                TokenKind::Number(3.14),
                TokenKind::Number(-7.0),
                TokenKind::Number(2.0),
                TokenKind::Number(0.5),
                TokenKind::Number(1000.0),
                TokenKind::Number(-0.25),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_peculiar_identifiers() {
        assert_eq!(
            kinds("+ - ... ->x .foo list->vector"),
            vec![
                TokenKind::Ident("+".into()),
                TokenKind::Ident("-".into()),
                TokenKind::Ident("...".into()),
                TokenKind::Ident("->x".into()),
                TokenKind::Ident(".foo".into()),
                TokenKind::Ident("list->vector".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_quote_marks_and_dot() {
        assert_eq!(
            kinds("'(a . b) `c"),
            vec![
                TokenKind::Quote,
                TokenKind::LParen,
                TokenKind::Ident("a".into()),
                TokenKind::Dot,
                TokenKind::Ident("b".into()),
                TokenKind::RParen,
                TokenKind::Backquote,
                TokenKind::Ident("c".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(kinds("; nothing here\n#t ; trailing"), vec![TokenKind::Boolean(true), TokenKind::Eof]);
    }

    #[test]
    fn tokens_carry_locations_and_literals() {
        let toks = lex("(f\n  #t)").unwrap();
        assert_eq!(toks[0].loc, Loc { line: 1, column: 1 });
        assert_eq!(toks[2].loc, Loc { line: 2, column: 3 });
        assert_eq!(toks[2].literal, "#t");
        assert_eq!(toks[2].span, Span::new(5, 7));
        let eof = toks.last().unwrap();
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!(eof.literal, "");
    }

    #[test]
    fn empty_source_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("   \n\t"), vec![TokenKind::Eof]);
    }

    #[test]
    fn unknown_char_name_is_an_error() {
        let err = lex(r"(f #\bogus)").unwrap_err();
        assert_eq!(err.position, 3);
        assert_eq!(err.snippet, r"#\bogus");
        assert!(err.suggestion.contains("bogus"));
    }

    #[test]
    fn unquote_comma_is_an_error() {
        let err = lex("`(a ,b)").unwrap_err();
        assert_eq!(err.loc, Loc { line: 1, column: 5 });
        assert!(err.suggestion.contains("Unquote"));
    }

    #[test]
    fn dump_format() {
        let toks = lex("(f #t)").unwrap();
        let out = dump(&toks);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "(1:1) LPAREN: (");
        assert_eq!(lines[1], "(1:2) IDENTIFIER: f");
        assert_eq!(lines[2], "(1:4) BOOL: #t");
        assert_eq!(lines[4], "(1:7) EOF: ");
    }
}
