/// An entry in the error code registry.
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str, // one-line summary for tooling
    pub long: &'static str,  // full explanation for --explain
}

/// All stable diagnostic codes. Every `ErrorKind` maps to exactly one.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Lexer ────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "RKT-L001",
        short: "invalid token",
        long: r#"## RKT-L001: invalid token

The input contains text that is not a token of the language.

Tokens are parentheses, `.`, the quote marks `'` and `` ` ``, booleans
(`#t`, `#true`, `#f`, `#false`), characters (`#\a`, `#\space`, ...),
numbers and identifiers.

**Examples that trigger this:**

    (f "text")     ; string literals are not supported
    `(a ,b)        ; unquote is not supported
    #\bogus        ; unknown character name
    [1 2]          ; square brackets
"#,
    },

    // ── Parser ───────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "RKT-P001",
        short: "unexpected token",
        long: r#"## RKT-P001: unexpected token

A token appeared where it cannot start or continue a form.

**Common causes:**
- A `)` with no matching `(`
- A `.` outside a quoted list, or a dotted tail that is not followed by `)`

**Example:**

    (f 1))
         ^ stray close paren
"#,
    },
    ErrorEntry {
        code: "RKT-P002",
        short: "incomplete input",
        long: r#"## RKT-P002: incomplete input

The input ended inside a form: a list is missing its `)` or a quote mark
is missing its datum.

In the REPL this is not an error. The prompt changes to `... ` and the
next line is appended to the form.

**Example:**

    (f (g 1)
"#,
    },

    // ── Compiler ─────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "RKT-C001",
        short: "form cannot be compiled",
        long: r#"## RKT-C001: form cannot be compiled

The parser accepted the form but the compiler has no bytecode for it.
Quoted data (`'x`, `` `x ``) and list literals, including `()`, are
parsed but not compiled.

Only literals, global names and procedure calls compile.
"#,
    },
    ErrorEntry {
        code: "RKT-C002",
        short: "unbound identifier",
        long: r#"## RKT-C002: unbound identifier

An identifier was used that names no global.

Globals are bound by the host before the program runs, for example with
the command-line flag:

    rocket --define answer=42 script.scm
"#,
    },
    ErrorEntry {
        code: "RKT-C003",
        short: "limit exceeded",
        long: r#"## RKT-C003: limit exceeded

Bytecode operands are one byte wide, which caps:
- constants per top-level expression at 256
- arguments per procedure call at 255
- global names per session at 256

Lists and quotes may also nest at most 256 levels deep inside one form.

Split the expression, or use fewer literals in one expression.
"#,
    },

    // ── Runtime ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "RKT-R001",
        short: "operand stack overflow",
        long: r#"## RKT-R001: operand stack overflow

The operand stack holds 256 values, shared by all active frames.
A push beyond that, or a call whose locals do not fit, stops the VM.
"#,
    },
    ErrorEntry {
        code: "RKT-R002",
        short: "operand stack underflow",
        long: r#"## RKT-R002: operand stack underflow

An instruction needed more values than its frame holds. A frame can
never pop values that belong to its caller.
"#,
    },
    ErrorEntry {
        code: "RKT-R003",
        short: "call stack overflow",
        long: r#"## RKT-R003: call stack overflow

At most 256 frames can be active, the toplevel included. This usually
means unbounded recursion; tail calls are not optimised.
"#,
    },
    ErrorEntry {
        code: "RKT-R004",
        short: "invalid opcode",
        long: r#"## RKT-R004: invalid opcode

The VM read a byte that is not an instruction. The compiler never emits
one, so this points at hand-built or corrupted bytecode.
"#,
    },
    ErrorEntry {
        code: "RKT-R005",
        short: "invalid operand",
        long: r#"## RKT-R005: invalid operand

An instruction referenced a constant or global slot that does not exist.
"#,
    },
    ErrorEntry {
        code: "RKT-R006",
        short: "instruction overrun",
        long: r#"## RKT-R006: instruction overrun

Execution ran past the end of the instruction buffer without reaching
`OP_LAST` or `OP_RETURN`.
"#,
    },
    ErrorEntry {
        code: "RKT-R007",
        short: "value is not callable",
        long: r#"## RKT-R007: value is not callable

The first element of a procedure call evaluated to something other than
a procedure.

**Example:**

    $ rocket --define n=1
    > (n)
"#,
    },
];

/// Look up an error entry by code (e.g. `"RKT-C002"`).
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code.eq_ignore_ascii_case(code))
}
