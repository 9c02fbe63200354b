use std::rc::Rc;

use crate::pool::Pool;
use crate::value::{Handle, Value};

pub mod compiler;
pub mod disasm;

pub use compiler::{CompileError, Compiler};

#[derive(Debug, thiserror::Error)]
pub enum VmError {
    #[error("operand stack overflow (limit {})", STACK_MAX)]
    OperandStackOverflow,
    #[error("operand stack underflow: frame has nothing left to pop")]
    OperandStackUnderflow,
    #[error("call stack overflow (limit {} frames)", FRAMES_MAX)]
    CallStackOverflow,
    #[error("invalid opcode {op:#04x} at offset {offset}")]
    InvalidOpcode { op: u8, offset: usize },
    #[error("{pool} index {index} out of range ({len} entries)")]
    InvalidOperand { pool: &'static str, index: u8, len: usize },
    #[error("instruction stream ended at offset {offset} without OP_LAST")]
    InstructionOverrun { offset: usize },
    #[error("{value} is not callable")]
    NotCallable { value: Value },
}

pub type VmResult<T> = Result<T, VmError>;

// ── Opcodes (one byte each; operands are one-byte immediates) ───────

pub const OP_CONSTANT: u8 = 0; // idx: push constants[idx]
pub const OP_PROC_CALL: u8 = 1; // argc: call the value on top of the stack
pub const OP_RETURN: u8 = 2;
pub const OP_LAST: u8 = 3;
pub const OP_GET_GLOBAL: u8 = 4; // slot: push globals[slot]

pub const STACK_MAX: usize = 256;
pub const FRAMES_MAX: usize = 256;

pub type Instructions = Pool<u8>;
pub type ObjectsPool = Pool<Value>;
pub type Heap = Pool<Object>;

/// A function body compiled to its own instruction buffer.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    pub num_locals: u8,
}

/// Anything a `Value::Pointer` can refer to.
#[derive(Debug, Clone)]
pub enum Object {
    Function(Rc<CompiledFunction>),
}

struct Frame {
    ip: usize,
    function: Rc<CompiledFunction>,
    base_pointer: usize,
}

pub struct Vm {
    stack: [Value; STACK_MAX],
    sp: usize,
    /// Innermost frame. Frame 0 is the toplevel and is never popped.
    current: Frame,
    /// Suspended frames, allocated once to hold every frame below the limit.
    callers: Vec<Frame>,
    constants: ObjectsPool,
    globals: ObjectsPool,
    heap: Heap,
}

impl Vm {
    pub fn new(instructions: Instructions, constants: Option<ObjectsPool>, globals: Option<ObjectsPool>) -> Self {
        let toplevel = CompiledFunction { instructions, num_locals: 0 };
        Vm {
            stack: [Value::Nil; STACK_MAX],
            sp: 0,
            current: Frame { ip: 0, function: Rc::new(toplevel), base_pointer: 0 },
            callers: Vec::with_capacity(FRAMES_MAX - 1),
            constants: constants.unwrap_or_default(),
            globals: globals.unwrap_or_default(),
            heap: Heap::new(),
        }
    }

    // ── Host API ────────────────────────────────────────────────────

    /// Moves a function into the heap and returns a pointer to it.
    pub fn alloc_function(&mut self, function: CompiledFunction) -> Value {
        let handle = self.heap.append(Object::Function(Rc::new(function)));
        Value::Pointer(handle as Handle)
    }

    /// Writes a global, growing the pool with `Nil` up to `slot` if needed.
    pub fn set_global(&mut self, slot: u8, value: Value) {
        let slot = slot as usize;
        while self.globals.len() <= slot {
            self.globals.append(Value::Nil);
        }
        self.globals.set(slot, value);
    }

    pub fn global(&self, slot: u8) -> Option<Value> {
        self.globals.get(slot as usize).copied()
    }

    pub fn into_globals(self) -> ObjectsPool {
        self.globals
    }

    pub fn constants(&self) -> &ObjectsPool {
        &self.constants
    }

    /// Live portion of the operand stack, bottom first.
    pub fn stack(&self) -> &[Value] {
        &self.stack[..self.sp]
    }

    pub fn stack_pointer(&self) -> usize {
        self.sp
    }

    pub fn frame_depth(&self) -> usize {
        self.callers.len() + 1
    }

    // ── Dispatch ────────────────────────────────────────────────────

    /// Runs until `OP_LAST` (or `OP_RETURN` in the toplevel frame) and
    /// returns the value on top of the stack, `Nil` if it is empty.
    pub fn run(&mut self) -> VmResult<Value> {
        loop {
            let offset = self.current.ip;
            let op = self.read_byte()?;
            match op {
                OP_CONSTANT => {
                    let index = self.read_byte()?;
                    let value = self.constants.get(index as usize).copied().ok_or(VmError::InvalidOperand {
                        pool: "constant",
                        index,
                        len: self.constants.len(),
                    })?;
                    self.push(value)?;
                }
                OP_GET_GLOBAL => {
                    let index = self.read_byte()?;
                    let value = self.global(index).ok_or(VmError::InvalidOperand {
                        pool: "global",
                        index,
                        len: self.globals.len(),
                    })?;
                    self.push(value)?;
                }
                OP_PROC_CALL => {
                    let argc = self.read_byte()?;
                    self.call(argc)?;
                }
                OP_RETURN => {
                    if self.callers.is_empty() {
                        break;
                    }
                    self.ret();
                }
                OP_LAST => break,
                _ => return Err(VmError::InvalidOpcode { op, offset }),
            }
        }
        Ok(self.sp.checked_sub(1).map(|top| self.stack[top]).unwrap_or_default())
    }

    fn read_byte(&mut self) -> VmResult<u8> {
        let ip = self.current.ip;
        let byte = self.current.function.instructions.get(ip).copied();
        let byte = byte.ok_or(VmError::InstructionOverrun { offset: ip })?;
        self.current.ip += 1;
        Ok(byte)
    }

    fn push(&mut self, value: Value) -> VmResult<()> {
        if self.sp >= STACK_MAX {
            return Err(VmError::OperandStackOverflow);
        }
        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> VmResult<Value> {
        if self.sp <= self.current.base_pointer {
            return Err(VmError::OperandStackUnderflow);
        }
        self.sp -= 1;
        Ok(self.stack[self.sp])
    }

    fn call(&mut self, argc: u8) -> VmResult<()> {
        let callee = self.pop()?;
        let function = match callee {
            Value::Pointer(handle) => match self.heap.get(handle as usize) {
                Some(Object::Function(f)) => Rc::clone(f),
                None => return Err(VmError::NotCallable { value: callee }),
            },
            _ => return Err(VmError::NotCallable { value: callee }),
        };

        let argc = argc as usize;
        if self.sp < self.current.base_pointer + argc {
            return Err(VmError::OperandStackUnderflow);
        }
        if self.frame_depth() >= FRAMES_MAX {
            return Err(VmError::CallStackOverflow);
        }

        // Arguments become the first locals; slot `base` must stay free for the result.
        let base = self.sp - argc;
        let locals = (function.num_locals as usize).max(argc);
        if base + locals.max(1) > STACK_MAX {
            return Err(VmError::OperandStackOverflow);
        }
        for slot in &mut self.stack[self.sp..base + locals] {
            *slot = Value::Nil;
        }
        self.sp = base + locals;

        let frame = Frame { ip: 0, function, base_pointer: base };
        let caller = std::mem::replace(&mut self.current, frame);
        self.callers.push(caller);
        log::trace!("call {} (argc {}), depth {}, base {}", callee, argc, self.frame_depth(), base);
        Ok(())
    }

    fn ret(&mut self) {
        let base = self.current.base_pointer;
        let result = if self.sp > base { self.stack[self.sp - 1] } else { Value::Nil };
        self.stack[base] = result;
        self.sp = base + 1;
        if let Some(caller) = self.callers.pop() {
            self.current = caller;
        }
        log::trace!("return {}, depth {}", result, self.frame_depth());
    }
}
