use serde::Serialize;

pub mod source_map;
pub use source_map::SourceMap;

// ---- Span infrastructure ----

/// Byte range within source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const UNKNOWN: Span = Span { start: 0, end: 0 };

    pub fn new(start: usize, end: usize) -> Span {
        Span { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(r: std::ops::Range<usize>) -> Self {
        Span { start: r.start, end: r.end }
    }
}

/// Wraps a node with its source span. Transparent to serde (serializes as inner node only).
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Spanned { node, span }
    }

    pub fn unknown(node: T) -> Self {
        Spanned { node, span: Span::UNKNOWN }
    }
}

impl<T> std::ops::Deref for Spanned<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.node
    }
}

impl<T: Serialize> Serialize for Spanned<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.node.serialize(serializer)
    }
}

// ---- Core AST types ----

pub type Node = Spanned<Expr>;

/// A parsed program: the top-level expressions in source order.
pub type Program = Vec<Node>;

/// S-expression tree. Children are owned outright, so dropping a node frees its
/// subtree exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// `#t` / `#f`
    Boolean(bool),

    /// `#\a`, `#\space`
    Character(char),

    Number(f64),

    Identifier(String),

    /// `'datum` or, when `quasi`, `` `datum ``
    Quote { quasi: bool, datum: Box<Node> },

    /// `(callable arg ...)`
    ProcedureCall { callable: Box<Node>, args: Vec<Node> },

    /// Quoted list data, `(a b . c)`. Also the empty list `()`.
    List {
        items: Vec<Node>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tail: Option<Box<Node>>,
    },
}

impl Expr {
    /// Short description used in diagnostics ("cannot compile a quotation").
    pub fn describe(&self) -> &'static str {
        match self {
            Expr::Boolean(_) => "boolean",
            Expr::Character(_) => "character",
            Expr::Number(_) => "number",
            Expr::Identifier(_) => "identifier",
            Expr::Quote { quasi: false, .. } => "quotation",
            Expr::Quote { quasi: true, .. } => "quasiquotation",
            Expr::ProcedureCall { .. } => "procedure call",
            Expr::List { items, tail: None } if items.is_empty() => "empty list",
            Expr::List { .. } => "list",
        }
    }
}
