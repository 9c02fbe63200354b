use crate::ast::{Expr, Node, Span};
use crate::symbol::SymbolTable;
use crate::value::Value;

use super::{CompiledFunction, Instructions, ObjectsPool, OP_CONSTANT, OP_GET_GLOBAL, OP_LAST, OP_PROC_CALL, OP_RETURN};

/// Constant indices are one-byte immediates.
pub const MAX_CONSTANTS: usize = u8::MAX as usize + 1;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("cannot compile a {form}")]
    UnsupportedForm { form: &'static str, span: Span },
    #[error("unbound identifier: {name}")]
    UnboundIdentifier { name: String, span: Span },
    #[error("too many {what} (limit {limit})")]
    LimitExceeded { what: &'static str, limit: usize, span: Span },
}

impl CompileError {
    pub fn span(&self) -> Span {
        match self {
            CompileError::UnsupportedForm { span, .. }
            | CompileError::UnboundIdentifier { span, .. }
            | CompileError::LimitExceeded { span, .. } => *span,
        }
    }
}

type Result<T> = std::result::Result<T, CompileError>;

/// Single-pass, depth-first compiler from AST nodes to stack bytecode.
///
/// The instruction buffer and constant pool are owned here until
/// [`Compiler::into_parts`] hands them to the VM.
#[derive(Default)]
pub struct Compiler<'s> {
    instructions: Instructions,
    constants: ObjectsPool,
    symbols: Option<&'s SymbolTable>,
}

impl<'s> Compiler<'s> {
    /// A compiler that knows no global names.
    pub fn new() -> Self {
        Compiler::default()
    }

    pub fn with_symbols(symbols: &'s SymbolTable) -> Self {
        Compiler { symbols: Some(symbols), ..Compiler::default() }
    }

    pub fn instructions(&self) -> &Instructions {
        &self.instructions
    }

    pub fn constants(&self) -> &ObjectsPool {
        &self.constants
    }

    pub fn into_parts(self) -> (Instructions, ObjectsPool) {
        (self.instructions, self.constants)
    }

    /// Compiles one top-level expression, terminated by `OP_LAST`.
    pub fn compile(&mut self, node: &Node) -> Result<()> {
        self.expr(node)?;
        self.emit(OP_LAST);
        log::debug!(
            "compiled {} to {} bytes, {} constants",
            node.node.describe(),
            self.instructions.len(),
            self.constants.len()
        );
        Ok(())
    }

    /// Compiles `body` into a separate buffer ending in `OP_RETURN`. Constants
    /// go into this compiler's pool, so the function must run in a VM built
    /// from the same parts.
    pub fn compile_function(&mut self, body: &Node, num_locals: u8) -> Result<CompiledFunction> {
        let outer = std::mem::take(&mut self.instructions);
        let result = self.expr(body);
        self.emit(OP_RETURN);
        let instructions = std::mem::replace(&mut self.instructions, outer);
        result?;
        Ok(CompiledFunction { instructions, num_locals })
    }

    /// Appends `value` and returns its index. Identical values get separate
    /// slots. `None` once the pool holds [`MAX_CONSTANTS`].
    pub fn add_constant(&mut self, value: Value) -> Option<u8> {
        if self.constants.len() >= MAX_CONSTANTS {
            return None;
        }
        Some(self.constants.append(value) as u8)
    }

    fn emit(&mut self, byte: u8) {
        self.instructions.append(byte);
    }

    fn emit_with(&mut self, op: u8, operand: u8) {
        self.emit(op);
        self.emit(operand);
    }

    fn expr(&mut self, node: &Node) -> Result<()> {
        match &node.node {
            Expr::Boolean(b) => self.constant(Value::Boolean(*b), node.span),
            Expr::Number(n) => self.constant(Value::Number(*n), node.span),
            Expr::Character(c) => self.constant(Value::Char(*c), node.span),
            Expr::Identifier(name) => {
                let slot = self.symbols.and_then(|s| s.resolve(name)).ok_or_else(|| {
                    CompileError::UnboundIdentifier { name: name.clone(), span: node.span }
                })?;
                self.emit_with(OP_GET_GLOBAL, slot);
                Ok(())
            }
            Expr::ProcedureCall { callable, args } => {
                let argc = u8::try_from(args.len()).map_err(|_| CompileError::LimitExceeded {
                    what: "arguments in one call",
                    limit: u8::MAX as usize,
                    span: node.span,
                })?;
                for arg in args {
                    self.expr(arg)?;
                }
                // The callee sits on top of its arguments when OP_PROC_CALL runs.
                self.expr(callable)?;
                self.emit_with(OP_PROC_CALL, argc);
                Ok(())
            }
            Expr::Quote { .. } | Expr::List { .. } => {
                Err(CompileError::UnsupportedForm { form: node.node.describe(), span: node.span })
            }
        }
    }

    fn constant(&mut self, value: Value, span: Span) -> Result<()> {
        let index = self.add_constant(value).ok_or(CompileError::LimitExceeded {
            what: "constants in one unit",
            limit: MAX_CONSTANTS,
            span,
        })?;
        self.emit_with(OP_CONSTANT, index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::Vm;
    use crate::{lexer, parser};

    fn parse_one(source: &str) -> Node {
        parser::parse(lexer::lex(source).unwrap()).unwrap().remove(0)
    }

    fn compile_str(source: &str) -> Compiler<'static> {
        let mut c = Compiler::new();
        c.compile(&parse_one(source)).unwrap();
        c
    }

    fn run(c: Compiler<'_>) -> Value {
        let (code, consts) = c.into_parts();
        Vm::new(code, Some(consts), None).run().unwrap()
    }

    #[test]
    fn boolean_literal() {
        let c = compile_str("#t");
        assert_eq!(c.instructions().as_slice(), &[OP_CONSTANT, 0, OP_LAST]);
        assert_eq!(c.constants().as_slice(), &[Value::Boolean(true)]);
        assert_eq!(run(c), Value::Boolean(true));
    }

    #[test]
    fn number_literal_runs_back_unchanged() {
        let value = run(compile_str("3.1400"));
        assert_eq!(value, Value::Number(3.14));
        assert_eq!(value.to_string(), "3.1400");
    }

    #[test]
    fn char_literal() {
        assert_eq!(run(compile_str(r"#\newline")), Value::Char('\n'));
    }

    #[test]
    fn each_literal_gets_its_own_constant() {
        let mut c = Compiler::new();
        let literals = ["1", "#f", "1", r"#\x"];
        for src in literals {
            c.expr(&parse_one(src)).unwrap();
        }
        assert_eq!(
            c.constants().as_slice(),
            &[Value::Number(1.0), Value::Boolean(false), Value::Number(1.0), Value::Char('x')]
        );
        assert_eq!(c.instructions().as_slice(), &[OP_CONSTANT, 0, OP_CONSTANT, 1, OP_CONSTANT, 2, OP_CONSTANT, 3]);
    }

    #[test]
    fn call_emits_args_then_callee() {
        let mut symbols = SymbolTable::new();
        symbols.define("f").unwrap();
        let mut c = Compiler::with_symbols(&symbols);
        c.compile(&parse_one("(f 1 #t)")).unwrap();
        assert_eq!(
            c.instructions().as_slice(),
            &[OP_CONSTANT, 0, OP_CONSTANT, 1, OP_GET_GLOBAL, 0, OP_PROC_CALL, 2, OP_LAST]
        );
    }

    #[test]
    fn unknown_identifier_is_unbound() {
        let mut c = Compiler::new();
        let err = c.compile(&parse_one("  foo")).unwrap_err();
        match err {
            CompileError::UnboundIdentifier { ref name, span } => {
                assert_eq!(name, "foo");
                assert_eq!(span, Span::new(2, 5));
            }
            other => panic!("expected UnboundIdentifier, got {:?}", other),
        }
    }

    #[test]
    fn quote_and_list_are_unsupported() {
        for (src, form) in [("'(1 2)", "quotation"), ("`x", "quasiquotation"), ("()", "empty list")] {
            let err = Compiler::new().compile(&parse_one(src)).unwrap_err();
            assert!(
                matches!(err, CompileError::UnsupportedForm { form: f, .. } if f == form),
                "{src}: {err:?}"
            );
        }
    }

    #[test]
    fn nested_unsupported_form_reports_inner_span() {
        let mut symbols = SymbolTable::new();
        symbols.define("f").unwrap();
        let err = Compiler::with_symbols(&symbols).compile(&parse_one("(f 'x)")).unwrap_err();
        assert_eq!(err.span(), Span::new(3, 5));
    }

    #[test]
    fn constant_pool_limit() {
        let mut c = Compiler::new();
        for _ in 0..MAX_CONSTANTS {
            assert!(c.add_constant(Value::Nil).is_some());
        }
        assert!(c.add_constant(Value::Nil).is_none());
        let err = c.compile(&parse_one("1")).unwrap_err();
        assert!(matches!(err, CompileError::LimitExceeded { limit: MAX_CONSTANTS, .. }));
    }

    #[test]
    fn too_many_arguments() {
        let mut symbols = SymbolTable::new();
        symbols.define("f").unwrap();
        let src = format!("(f {})", vec!["#t"; 256].join(" "));
        let err = Compiler::with_symbols(&symbols).compile(&parse_one(&src)).unwrap_err();
        assert!(matches!(err, CompileError::LimitExceeded { what: "arguments in one call", .. }));
    }

    #[test]
    fn compiled_function_runs_through_a_call() {
        let mut symbols = SymbolTable::new();
        symbols.define("f").unwrap();
        let mut c = Compiler::with_symbols(&symbols);
        let f = c.compile_function(&parse_one("#f"), 0).unwrap();
        assert_eq!(f.instructions.as_slice(), &[OP_CONSTANT, 0, OP_RETURN]);

        c.compile(&parse_one("(f)")).unwrap();
        assert_eq!(c.instructions().as_slice(), &[OP_GET_GLOBAL, 0, OP_PROC_CALL, 0, OP_LAST]);

        let (code, consts) = c.into_parts();
        let mut vm = Vm::new(code, Some(consts), None);
        let ptr = vm.alloc_function(f);
        vm.set_global(0, ptr);
        assert_eq!(vm.run().unwrap(), Value::Boolean(false));
        assert_eq!(vm.stack_pointer(), 1);
    }

    #[test]
    fn failed_function_leaves_toplevel_buffer_alone() {
        let mut c = Compiler::new();
        c.expr(&parse_one("1")).unwrap();
        assert!(c.compile_function(&parse_one("nope"), 0).is_err());
        assert_eq!(c.instructions().as_slice(), &[OP_CONSTANT, 0]);
    }
}
