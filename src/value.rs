use std::fmt;

/// One machine word of payload. Every runtime value reduces to a kind tag plus one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Datum(pub u64);

impl Datum {
    pub fn from_bool(b: bool) -> Self {
        Datum(b as u64)
    }

    pub fn as_bool(self) -> bool {
        self.0 != 0
    }

    /// Stores the IEEE-754 bit pattern, not a numeric conversion.
    pub fn from_f64(f: f64) -> Self {
        Datum(f.to_bits())
    }

    pub fn as_f64(self) -> f64 {
        f64::from_bits(self.0)
    }

    pub fn from_char(c: char) -> Self {
        Datum(c as u64)
    }

    pub fn as_char(self) -> Option<char> {
        u32::try_from(self.0).ok().and_then(char::from_u32)
    }

    pub fn from_handle(h: Handle) -> Self {
        Datum(h as u64)
    }

    pub fn as_handle(self) -> Handle {
        self.0 as Handle
    }
}

/// Index into the VM heap pool.
pub type Handle = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Nil,
    Boolean,
    Number,
    Char,
    Pointer,
}

#[derive(Debug, Clone, Copy, Default)]
pub enum Value {
    #[default]
    Nil,
    Boolean(bool),
    Number(f64),
    Char(char),
    Pointer(Handle),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::Char(_) => ValueKind::Char,
            Value::Pointer(_) => ValueKind::Pointer,
        }
    }

    pub fn datum(&self) -> Datum {
        match *self {
            Value::Nil => Datum(0),
            Value::Boolean(b) => Datum::from_bool(b),
            Value::Number(n) => Datum::from_f64(n),
            Value::Char(c) => Datum::from_char(c),
            Value::Pointer(h) => Datum::from_handle(h),
        }
    }

    /// Rebuilds a value from its tag and raw word. `None` when the word is not
    /// a valid payload for `kind` (only possible for chars).
    pub fn from_parts(kind: ValueKind, datum: Datum) -> Option<Value> {
        Some(match kind {
            ValueKind::Nil => Value::Nil,
            ValueKind::Boolean => Value::Boolean(datum.as_bool()),
            ValueKind::Number => Value::Number(datum.as_f64()),
            ValueKind::Char => Value::Char(datum.as_char()?),
            ValueKind::Pointer => Value::Pointer(datum.as_handle()),
        })
    }
}

// Kind first, then the payload word. Numbers compare by bit pattern.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.datum() == other.datum()
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "()"),
            Value::Boolean(true) => write!(f, "#t"),
            Value::Boolean(false) => write!(f, "#f"),
            Value::Number(n) => write!(f, "{:.4}", n),
            Value::Char(c) => match char_name(*c) {
                Some(name) => write!(f, "#\\{}", name),
                None => write!(f, "#\\{}", c),
            },
            Value::Pointer(h) => write!(f, "#<procedure {}>", h),
        }
    }
}

/// Named character literals, shared with the lexer.
const CHAR_NAMES: &[(&str, char)] = &[
    ("space", ' '),
    ("newline", '\n'),
    ("tab", '\t'),
    ("nul", '\0'),
    ("null", '\0'),
    ("return", '\r'),
    ("alarm", '\x07'),
    ("backspace", '\x08'),
    ("delete", '\x7f'),
    ("escape", '\x1b'),
];

pub(crate) fn char_by_name(name: &str) -> Option<char> {
    CHAR_NAMES.iter().find(|(n, _)| *n == name).map(|(_, c)| *c)
}

fn char_name(c: char) -> Option<&'static str> {
    CHAR_NAMES.iter().find(|(_, ch)| *ch == c).map(|(n, _)| *n)
}
