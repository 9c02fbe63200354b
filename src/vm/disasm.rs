use std::fmt::Write;

use super::{Instructions, ObjectsPool, OP_CONSTANT, OP_GET_GLOBAL, OP_LAST, OP_PROC_CALL, OP_RETURN};

fn opcode_name(op: u8) -> Option<&'static str> {
    Some(match op {
        OP_CONSTANT => "OP_CONSTANT",
        OP_PROC_CALL => "OP_PROC_CALL",
        OP_RETURN => "OP_RETURN",
        OP_LAST => "OP_LAST",
        OP_GET_GLOBAL => "OP_GET_GLOBAL",
        _ => return None,
    })
}

fn has_operand(op: u8) -> bool {
    matches!(op, OP_CONSTANT | OP_PROC_CALL | OP_GET_GLOBAL)
}

/// Renders a buffer as a `== name ==` header followed by one
/// `offset OPCODE [operand]` line per instruction. Constant operands are
/// annotated with the value they load.
pub fn disassemble(name: &str, code: &Instructions, constants: &ObjectsPool) -> String {
    let mut out = format!("== {} ==\n", name);
    let bytes = code.as_slice();
    let mut offset = 0;

    while offset < bytes.len() {
        offset = instruction(&mut out, bytes, offset, constants);
    }
    out
}

/// Writes one instruction and returns the offset of the next.
fn instruction(out: &mut String, bytes: &[u8], offset: usize, constants: &ObjectsPool) -> usize {
    let op = bytes[offset];
    let _ = write!(out, "{:04} ", offset);

    let Some(name) = opcode_name(op) else {
        let _ = writeln!(out, "<unknown {:#04x}>", op);
        return offset + 1;
    };
    if !has_operand(op) {
        let _ = writeln!(out, "{}", name);
        return offset + 1;
    }

    match bytes.get(offset + 1) {
        Some(&operand) if op == OP_CONSTANT => match constants.get(operand as usize) {
            Some(value) => {
                let _ = writeln!(out, "{} {} ({})", name, operand, value);
            }
            None => {
                let _ = writeln!(out, "{} {} (?)", name, operand);
            }
        },
        Some(&operand) => {
            let _ = writeln!(out, "{} {}", name, operand);
        }
        None => {
            let _ = writeln!(out, "{} <missing operand>", name);
        }
    }
    offset + 2
}
