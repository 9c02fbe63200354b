use crate::ast::{Node, Program};
use crate::error::Error;
use crate::symbol::SymbolTable;
use crate::value::Value;
use crate::vm::{Compiler, ObjectsPool, Vm, disasm};
use crate::{lexer, parser};

/// Result of one unit: its value, plus the bytecode listing when
/// disassembly is on.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    pub value: Value,
    pub listing: Option<String>,
}

/// A sequence of compilation units sharing one set of globals.
///
/// Every top-level expression is compiled and run by itself in a fresh
/// [`Vm`]. The global pool moves into that VM and back out once it stops,
/// so names defined on the session stay visible to later units.
#[derive(Debug, Default)]
pub struct Session {
    symbols: SymbolTable,
    globals: ObjectsPool,
    disassemble: bool,
    units: usize,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    pub fn set_disassemble(&mut self, on: bool) {
        self.disassemble = on;
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Binds `name` to `value`, replacing any earlier binding.
    pub fn define(&mut self, name: &str, value: Value) -> Result<(), Error> {
        let slot = self.symbols.define(name)? as usize;
        while self.globals.len() <= slot {
            self.globals.append(Value::Nil);
        }
        self.globals.set(slot, value);
        log::debug!("define {} = {} (slot {})", name, value, slot);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let slot = self.symbols.resolve(name)?;
        self.globals.get(slot as usize).copied()
    }

    /// Evaluates `source` and binds the value of its last expression
    /// (`Nil` if it has none) to `name`.
    pub fn define_from_source(&mut self, name: &str, source: &str) -> Result<Value, Error> {
        let value = self.eval(source)?.last().map(|e| e.value).unwrap_or_default();
        self.define(name, value)?;
        Ok(value)
    }

    pub fn parse(&self, source: &str) -> Result<Program, Error> {
        let tokens = lexer::lex(source)?;
        Ok(parser::parse(tokens)?)
    }

    /// Runs every top-level expression of `source` in order. Stops at the
    /// first error; units before it have already run.
    pub fn eval(&mut self, source: &str) -> Result<Vec<Evaluated>, Error> {
        let program = self.parse(source)?;
        program.iter().map(|node| self.eval_node(node)).collect()
    }

    /// Compiles and runs one top-level expression as its own unit.
    pub fn eval_node(&mut self, node: &Node) -> Result<Evaluated, Error> {
        self.units += 1;
        let mut compiler = Compiler::with_symbols(&self.symbols);
        compiler.compile(node)?;
        let (code, constants) = compiler.into_parts();

        let listing = self
            .disassemble
            .then(|| disasm::disassemble(&format!("unit {}", self.units), &code, &constants));

        let globals = std::mem::take(&mut self.globals);
        let mut vm = Vm::new(code, Some(constants), Some(globals));
        let result = vm.run();
        self.globals = vm.into_globals();

        let value = result.map_err(|error| Error::Vm { error, span: node.span })?;
        log::debug!("unit {} => {}", self.units, value);
        Ok(Evaluated { value, listing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;
    use crate::error::ErrorKind;

    fn values(session: &mut Session, source: &str) -> Vec<Value> {
        session.eval(source).unwrap().into_iter().map(|e| e.value).collect()
    }

    #[test]
    fn every_top_level_expression_runs() {
        let mut s = Session::new();
        assert_eq!(
            values(&mut s, r"#t 3.1400 #\a"),
            vec![Value::Boolean(true), Value::Number(3.14), Value::Char('a')]
        );
    }

    #[test]
    fn empty_source_yields_nothing() {
        assert!(Session::new().eval("  ; nothing\n").unwrap().is_empty());
    }

    #[test]
    fn defined_globals_are_visible() {
        let mut s = Session::new();
        s.define("answer", Value::Number(42.0)).unwrap();
        assert_eq!(values(&mut s, "answer"), vec![Value::Number(42.0)]);
        assert_eq!(s.lookup("answer"), Some(Value::Number(42.0)));
        assert_eq!(s.lookup("missing"), None);
    }

    #[test]
    fn globals_survive_between_evals() {
        let mut s = Session::new();
        s.define("a", Value::Boolean(false)).unwrap();
        s.define("b", Value::Char('b')).unwrap();
        values(&mut s, "a b");
        s.define("a", Value::Boolean(true)).unwrap();
        assert_eq!(values(&mut s, "a b"), vec![Value::Boolean(true), Value::Char('b')]);
        assert_eq!(s.symbols().len(), 2);
    }

    #[test]
    fn define_from_source_takes_last_value() {
        let mut s = Session::new();
        assert_eq!(s.define_from_source("x", "1 2.5").unwrap(), Value::Number(2.5));
        assert_eq!(s.define_from_source("y", "x").unwrap(), Value::Number(2.5));
        assert_eq!(s.define_from_source("z", "").unwrap(), Value::Nil);
        assert!(s.define_from_source("w", "nope").is_err());
        assert_eq!(s.lookup("w"), None);
    }

    #[test]
    fn unbound_identifier_has_its_span() {
        let err = Session::new().eval("#t\n  foo").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnboundIdentifier);
        assert_eq!(err.span(), Some(Span::new(5, 8)));
    }

    #[test]
    fn calling_a_number_fails_at_the_call() {
        let mut s = Session::new();
        s.define("n", Value::Number(1.0)).unwrap();
        let err = s.eval("#t (n)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotCallable);
        assert_eq!(err.span(), Some(Span::new(3, 6)));
    }

    #[test]
    fn quoted_data_is_unsupported() {
        let err = Session::new().eval("'(1 2)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedForm);
    }

    #[test]
    fn incomplete_input_is_reported_as_such() {
        let err = Session::new().eval("(f").unwrap_err();
        assert!(err.is_incomplete());
    }

    #[test]
    fn deep_nesting_is_a_limit_not_a_crash() {
        let err = Session::new().eval(&"(".repeat(20_000)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitExceeded);
        assert!(!err.is_incomplete());
        let at = crate::parser::MAX_PARSE_DEPTH;
        assert_eq!(err.span(), Some(Span::new(at, at + 1)));

        let err = Session::new().eval(&("'".repeat(20_000) + "x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitExceeded);
        assert_eq!(err.span(), Some(Span::new(at, at + 1)));
    }

    #[test]
    fn calls_nested_to_the_limit_compile() {
        let depth = crate::parser::MAX_PARSE_DEPTH;
        let mut s = Session::new();
        s.define("n", Value::Number(1.0)).unwrap();
        let source = format!("{}n{}", "(".repeat(depth), ")".repeat(depth));
        // Compiles and runs until the innermost call hits a number.
        assert_eq!(s.eval(&source).unwrap_err().kind(), ErrorKind::NotCallable);
    }

    #[test]
    fn disassembly_comes_with_each_unit() {
        let mut s = Session::new();
        s.set_disassemble(true);
        let out = s.eval("#t #f").unwrap();
        assert_eq!(out.len(), 2);
        let first = out[0].listing.as_deref().unwrap();
        assert!(first.starts_with("== unit 1 ==\n"));
        assert!(first.contains("0000 OP_CONSTANT 0 (#t)"));
        assert!(first.contains("0002 OP_LAST"));
        assert!(out[1].listing.as_deref().unwrap().starts_with("== unit 2 =="));

        s.set_disassemble(false);
        assert_eq!(s.eval("#t").unwrap()[0].listing, None);
    }
}
