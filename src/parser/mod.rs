use crate::ast::*;
use crate::lexer::{Loc, Token, TokenKind};

/// Deepest nesting of lists and quotes a single form may have.
pub const MAX_PARSE_DEPTH: usize = 256;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A token that cannot start or continue a form here.
    UnexpectedToken,
    /// Input ended inside a form. More text could complete it.
    Incomplete,
    /// Lists or quotes nested past [`MAX_PARSE_DEPTH`].
    TooDeep,
}

#[derive(Debug, thiserror::Error)]
#[error("Parse error at {loc}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub loc: Loc,
    pub span: Span,
    pub message: String,
}

type Result<T> = std::result::Result<T, ParseError>;

/// Whether a parenthesised form is code (a call) or quoted data (a list).
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    Datum,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(Token { kind: TokenKind::Eof, .. })) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or(0);
            let loc = tokens.last().map(|t| t.loc).unwrap_or_default();
            tokens.push(Token { kind: TokenKind::Eof, span: Span::new(end, end), loc, literal: String::new() });
        }
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        // `new` guarantees a trailing Eof and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, kind: ParseErrorKind, tok: &Token, message: String) -> ParseError {
        ParseError { kind, loc: tok.loc, span: tok.span, message }
    }

    pub fn at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    // ---- Top-level parsing ----

    pub fn parse_program(&mut self) -> Result<Program> {
        let mut program = Vec::new();
        while !self.at_end() {
            program.push(self.parse_expr()?);
        }
        Ok(program)
    }

    pub fn parse_expr(&mut self) -> Result<Node> {
        self.parse_form(Mode::Code, 0)
    }

    fn parse_form(&mut self, mode: Mode, depth: usize) -> Result<Node> {
        let tok = self.advance();
        if matches!(tok.kind, TokenKind::LParen | TokenKind::Quote | TokenKind::Backquote) && depth >= MAX_PARSE_DEPTH {
            return Err(self.error(
                ParseErrorKind::TooDeep,
                &tok,
                format!("forms nested deeper than {} levels", MAX_PARSE_DEPTH),
            ));
        }
        let node = match tok.kind {
            TokenKind::Boolean(b) => Expr::Boolean(b),
            TokenKind::Char(c) => Expr::Character(c),
            TokenKind::Number(n) => Expr::Number(n),
            TokenKind::Ident(ref name) => Expr::Identifier(name.clone()),
            TokenKind::Quote | TokenKind::Backquote => {
                let datum = self.parse_form(Mode::Datum, depth + 1)?;
                let span = tok.span.merge(datum.span);
                return Ok(Node::new(
                    Expr::Quote { quasi: tok.kind == TokenKind::Backquote, datum: Box::new(datum) },
                    span,
                ));
            }
            TokenKind::LParen => return self.parse_list(tok.span, mode, depth + 1),
            TokenKind::RParen => {
                return Err(self.error(ParseErrorKind::UnexpectedToken, &tok, "unexpected ')'".into()));
            }
            TokenKind::Dot => {
                return Err(self.error(ParseErrorKind::UnexpectedToken, &tok, "unexpected '.'".into()));
            }
            TokenKind::Eof => {
                return Err(self.error(ParseErrorKind::Incomplete, &tok, "expected an expression, got end of input".into()));
            }
        };
        Ok(Node::new(node, tok.span))
    }

    /// Parse the rest of a form after its `(`.
    fn parse_list(&mut self, open: Span, mode: Mode, depth: usize) -> Result<Node> {
        let mut items = Vec::new();
        let mut tail = None;

        loop {
            let tok = self.peek().clone();
            match tok.kind {
                TokenKind::RParen => break,
                TokenKind::Eof => {
                    return Err(self.error(ParseErrorKind::Incomplete, &tok, "unterminated list, expected ')'".into()));
                }
                TokenKind::Dot if mode == Mode::Datum && !items.is_empty() && tail.is_none() => {
                    self.advance();
                    tail = Some(Box::new(self.parse_form(Mode::Datum, depth)?));
                    let close = self.peek().clone();
                    if close.kind == TokenKind::Eof {
                        return Err(self.error(ParseErrorKind::Incomplete, &close, "unterminated list, expected ')'".into()));
                    }
                    if close.kind != TokenKind::RParen {
                        return Err(self.error(
                            ParseErrorKind::UnexpectedToken,
                            &close,
                            "expected ')' after the tail of a dotted list".into(),
                        ));
                    }
                }
                TokenKind::Dot => {
                    return Err(self.error(ParseErrorKind::UnexpectedToken, &tok, "unexpected '.'".into()));
                }
                _ => items.push(self.parse_form(mode, depth)?),
            }
        }

        let close = self.advance();
        let span = open.merge(close.span);

        if mode == Mode::Code {
            let mut forms = items.into_iter();
            return Ok(match forms.next() {
                Some(callable) => Node::new(
                    Expr::ProcedureCall { callable: Box::new(callable), args: forms.collect() },
                    span,
                ),
                None => Node::new(Expr::List { items: Vec::new(), tail: None }, span),
            });
        }
        Ok(Node::new(Expr::List { items, tail }, span))
    }
}

pub fn parse(tokens: Vec<Token>) -> Result<Program> {
    Parser::new(tokens).parse_program()
}
