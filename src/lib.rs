//! Rune: a small dynamically-typed scripting language.
//!
//! Programs are lexed and parsed into an AST, lowered by the bytecode
//! compiler into an instruction stream plus a constant pool, and
//! executed on a stack-based virtual machine.

pub mod ast;
pub mod bytecode;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod repl;

use bytecode::{ByteCode, Compiler, Value, Vm};
use error::RuneError;

/// Parse source code into an AST without executing.
pub fn parse(source: &str) -> Result<ast::Program, RuneError> {
    let tokens = lexer::Scanner::new(source).scan_tokens()?;
    let program = parser::Parser::new(tokens).parse()?;
    Ok(program)
}

/// Compile source code to bytecode without executing.
pub fn compile(source: &str) -> Result<ByteCode, RuneError> {
    let program = parse(source)?;
    let mut compiler = Compiler::new();
    compiler.compile(&program)?;
    Ok(compiler.bytecode())
}

/// Compile and run source code on a fresh VM, returning the value of
/// the last expression statement.
pub fn run(source: &str) -> Result<Value, RuneError> {
    let bytecode = compile(source)?;
    let mut vm = Vm::new(bytecode);
    vm.run()?;
    Ok(vm.last_popped().clone())
}

/// Render a compiled program as a bytecode listing.
pub fn disassemble(bytecode: &ByteCode) -> String {
    bytecode::disassemble_bytecode(bytecode)
}
