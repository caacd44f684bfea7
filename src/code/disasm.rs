//! Textual disassembly, backing the execution trace and invalid-opcode dumps.

use std::fmt::Write;

use crate::code::ops::{self, Operand};
use crate::code::CompiledTemplate;

pub(crate) fn disassemble(ct: &CompiledTemplate) -> String {
    let mut out = String::new();
    let mut ip = 0;
    while ip < ct.code_size() {
        let (line, next) = disassemble_instruction(ct, ip);
        out.push_str(&line);
        out.push('\n');
        ip = next;
    }
    out
}

pub(crate) fn disassemble_instruction(ct: &CompiledTemplate, ip: usize) -> (String, usize) {
    let op = ct.instrs[ip];
    let Some(info) = ops::info(op) else {
        return (format!("{ip:04}:\t.byte {op}"), ip + 1);
    };
    let mut line = format!("{ip:04}:\t{}", info.name);
    let mut at = ip + 1;
    for (i, operand) in info.operands.iter().enumerate() {
        line.push(if i == 0 { ' ' } else { ',' });
        let v = ops::get_u16(&ct.instrs, at);
        at += 2;
        match operand {
            Operand::StrIndex => {
                let s = ct.strings.get(v).map(String::as_str).unwrap_or("<bad>");
                let _ = write!(line, "#{v}:{s:?}");
            }
            Operand::Addr => {
                let _ = write!(line, "@{v}");
            }
            Operand::Count => {
                let _ = write!(line, "{v}");
            }
        }
    }
    (line, at)
}
