//! Bytecode disassembler for tests and diagnostics.

use std::fmt::Write;

use crate::bytecode::compiler::ByteCode;
use crate::bytecode::instruction::{lookup, read_operands, Instructions};
use crate::bytecode::value::Value;

/// Render an instruction buffer one instruction per line, as
/// `OFFSET Name op0 op1 ...` with zero-padded byte offsets.
pub fn disassemble(instructions: &Instructions) -> String {
    let mut output = String::new();
    let mut offset = 0;

    while offset < instructions.len() {
        let byte = instructions[offset];
        let Some(def) = lookup(byte) else {
            writeln!(&mut output, "{:04} ERROR: undefined opcode {}", offset, byte).unwrap();
            offset += 1;
            continue;
        };

        let (operands, read) = read_operands(def, &instructions[offset + 1..]);

        write!(&mut output, "{:04} {}", offset, def.name).unwrap();
        for operand in &operands {
            write!(&mut output, " {}", operand).unwrap();
        }
        writeln!(&mut output).unwrap();

        offset += 1 + read;
    }

    output
}

/// Render a full compilation unit: the top-level instructions followed
/// by the body of every function constant.
pub fn disassemble_bytecode(bytecode: &ByteCode) -> String {
    let mut output = disassemble(&bytecode.instructions);

    for (index, constant) in bytecode.constants.iter().enumerate() {
        if let Value::Function(function) = constant {
            let mut body = String::new();
            writeln!(
                &mut body,
                "\n== fn constant {} ({} locals, {} params) ==",
                index, function.num_locals, function.num_parameters
            )
            .unwrap();
            body.push_str(&disassemble(&function.instructions));
            output.push_str(&body);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::instruction::{make, Opcode};

    #[test]
    fn test_disassemble_listing() {
        let instructions: Instructions = [
            make(Opcode::Add, &[]),
            make(Opcode::GetLocal, &[1]),
            make(Opcode::Constant, &[2]),
            make(Opcode::Constant, &[65535]),
            make(Opcode::Call, &[2]),
        ]
        .concat();

        let expected = "\
0000 Add
0001 GetLocal 1
0003 Constant 2
0006 Constant 65535
0009 Call 2
";
        assert_eq!(disassemble(&instructions), expected);
    }

    #[test]
    fn test_disassemble_undefined_opcode() {
        let instructions: Instructions = vec![254];
        assert!(disassemble(&instructions).contains("undefined opcode 254"));
    }
}
