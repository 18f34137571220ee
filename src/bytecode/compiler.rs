//! Bytecode compiler: lowers the AST into instructions and constants.

use std::mem;
use std::rc::Rc;

use crate::ast::{Block, Expr, InfixOp, PrefixOp, Program, Stmt};
use crate::bytecode::instruction::{make, Instructions, Opcode};
use crate::bytecode::symbol_table::{SymbolScope, SymbolTable};
use crate::bytecode::value::{CompiledFunction, Value};
use crate::error::CompileError;

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Operand written into forward jumps before their target is known.
const PLACEHOLDER_TARGET: usize = 9999;

/// The compiled output: an instruction stream plus its constant pool.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ByteCode {
    pub instructions: Instructions,
    pub constants: Vec<Value>,
}

/// Opcode and byte position of an instruction already written to the
/// current scope's buffer.
#[derive(Debug, Clone, Copy, Default)]
struct EmittedInstruction {
    opcode: Option<Opcode>,
    position: usize,
}

/// Per-function workspace: an instruction buffer plus bookkeeping for
/// the last two emitted instructions, which enables the peephole edits
/// (dropping a trailing Pop, rewriting it into ReturnValue).
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last_instruction: EmittedInstruction,
    previous_instruction: EmittedInstruction,
}

/// The bytecode compiler.
pub struct Compiler {
    /// Stack of compilation scopes; one per function being compiled
    scopes: Vec<CompilationScope>,
    scope_index: usize,
    /// Append-only constant pool shared by all scopes
    constants: Vec<Value>,
    /// Current symbol table; enclosed when entering a function scope
    symbol_table: SymbolTable,
}

impl Compiler {
    pub fn new() -> Self {
        Self::new_with_state(SymbolTable::new(), Vec::new())
    }

    /// Create a compiler that continues from existing definitions and
    /// constants. The REPL threads its state through this.
    pub fn new_with_state(symbol_table: SymbolTable, constants: Vec<Value>) -> Self {
        Self {
            scopes: vec![CompilationScope::default()],
            scope_index: 0,
            constants,
            symbol_table,
        }
    }

    /// Tear down the compiler, handing back the symbol table and
    /// constant pool for a later `new_with_state`.
    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbol_table, self.constants)
    }

    /// Compile a program into the current scope.
    pub fn compile(&mut self, program: &Program) -> CompileResult<()> {
        for stmt in &program.statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    /// The compiled output for the top-level scope.
    pub fn bytecode(&self) -> ByteCode {
        ByteCode {
            instructions: self.scopes[self.scope_index].instructions.clone(),
            constants: self.constants.clone(),
        }
    }

    fn compile_statement(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.compile_expression(expr)?;
                self.emit(Opcode::Pop, &[]);
            }

            Stmt::Let { name, value } => {
                self.compile_expression(value)?;
                let symbol = self.symbol_table.define(name);
                match symbol.scope {
                    SymbolScope::Global => self.emit(Opcode::SetGlobal, &[symbol.index]),
                    SymbolScope::Local => self.emit(Opcode::SetLocal, &[symbol.index]),
                };
            }

            Stmt::Return(value) => {
                self.compile_expression(value)?;
                self.emit(Opcode::ReturnValue, &[]);
            }
        }

        Ok(())
    }

    fn compile_block(&mut self, block: &Block) -> CompileResult<()> {
        for stmt in &block.statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    fn compile_expression(&mut self, expr: &Expr) -> CompileResult<()> {
        match expr {
            Expr::IntLiteral(n) => {
                let idx = self.add_constant(Value::Int(*n))?;
                self.emit(Opcode::Constant, &[idx]);
            }

            Expr::StringLiteral(s) => {
                let idx = self.add_constant(Value::String(Rc::new(s.clone())))?;
                self.emit(Opcode::Constant, &[idx]);
            }

            Expr::BoolLiteral(b) => {
                if *b {
                    self.emit(Opcode::True, &[]);
                } else {
                    self.emit(Opcode::False, &[]);
                }
            }

            Expr::Identifier(name) => {
                let symbol = self
                    .symbol_table
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?
                    .clone();
                match symbol.scope {
                    SymbolScope::Global => self.emit(Opcode::GetGlobal, &[symbol.index]),
                    SymbolScope::Local => self.emit(Opcode::GetLocal, &[symbol.index]),
                };
            }

            Expr::Prefix { operator, operand } => {
                self.compile_expression(operand)?;
                match operator {
                    PrefixOp::Minus => self.emit(Opcode::Minus, &[]),
                    PrefixOp::Bang => self.emit(Opcode::Bang, &[]),
                };
            }

            Expr::Infix {
                left,
                operator,
                right,
            } => {
                // The VM only knows `>`: rewrite a < b into b > a.
                if *operator == InfixOp::Less {
                    self.compile_expression(right)?;
                    self.compile_expression(left)?;
                    self.emit(Opcode::GreaterThan, &[]);
                    return Ok(());
                }

                self.compile_expression(left)?;
                self.compile_expression(right)?;
                match operator {
                    InfixOp::Add => self.emit(Opcode::Add, &[]),
                    InfixOp::Subtract => self.emit(Opcode::Sub, &[]),
                    InfixOp::Multiply => self.emit(Opcode::Mul, &[]),
                    InfixOp::Divide => self.emit(Opcode::Div, &[]),
                    InfixOp::Equal => self.emit(Opcode::Equal, &[]),
                    InfixOp::NotEqual => self.emit(Opcode::NotEqual, &[]),
                    InfixOp::Greater => self.emit(Opcode::GreaterThan, &[]),
                    InfixOp::Less => unreachable!("rewritten above"),
                };
            }

            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                self.compile_expression(condition)?;

                // Jump over the consequence when the condition fails
                let jump_not_truthy = self.emit(Opcode::JumpNotTruthy, &[PLACEHOLDER_TARGET]);

                self.compile_block(consequence)?;
                // If-expressions yield values: keep the branch result
                if self.last_instruction_is(Opcode::Pop) {
                    self.remove_last_pop();
                }

                let jump = self.emit(Opcode::Jump, &[PLACEHOLDER_TARGET]);

                let after_consequence = self.current_instructions().len();
                self.change_operand(jump_not_truthy, after_consequence);

                match alternative {
                    Some(alt) => {
                        self.compile_block(alt)?;
                        if self.last_instruction_is(Opcode::Pop) {
                            self.remove_last_pop();
                        }
                    }
                    None => {
                        self.emit(Opcode::Null, &[]);
                    }
                }

                let after_alternative = self.current_instructions().len();
                self.change_operand(jump, after_alternative);
            }

            Expr::ArrayLiteral(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Opcode::Array, &[elements.len()]);
            }

            Expr::HashLiteral(pairs) => {
                // Sort by the key's textual form so the constant pool
                // and emission order are deterministic.
                let mut sorted: Vec<&(Expr, Expr)> = pairs.iter().collect();
                sorted.sort_by_key(|(key, _)| key.to_string());

                for (key, value) in sorted {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(Opcode::Hash, &[pairs.len() * 2]);
            }

            Expr::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Opcode::Index, &[]);
            }

            Expr::FunctionLiteral { parameters, body } => {
                self.enter_scope();

                for parameter in parameters {
                    self.symbol_table.define(parameter);
                }

                self.compile_block(body)?;

                // Functions implicitly return their last expression
                if self.last_instruction_is(Opcode::Pop) {
                    self.replace_last_pop_with_return();
                }
                if !self.last_instruction_is(Opcode::ReturnValue) {
                    self.emit(Opcode::Return, &[]);
                }

                let num_locals = self.symbol_table.num_definitions();
                let instructions = self.leave_scope();

                let function = CompiledFunction {
                    instructions,
                    num_locals,
                    num_parameters: parameters.len(),
                };
                let idx = self.add_constant(Value::Function(Rc::new(function)))?;
                self.emit(Opcode::Constant, &[idx]);
            }

            Expr::Call { callee, arguments } => {
                self.compile_expression(callee)?;
                for argument in arguments {
                    self.compile_expression(argument)?;
                }
                self.emit(Opcode::Call, &[arguments.len()]);
            }
        }

        Ok(())
    }

    // ===== Scope management =====

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        self.scope_index += 1;

        let outer = mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::enclosed(outer);
    }

    fn leave_scope(&mut self) -> Instructions {
        let scope = self.scopes.pop().unwrap_or_default();
        self.scope_index -= 1;

        let table = mem::take(&mut self.symbol_table);
        self.symbol_table = table.into_outer().unwrap_or_default();

        scope.instructions
    }

    // ===== Bytecode emission =====

    fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let instruction = make(op, operands);
        let position = self.add_instruction(&instruction);
        self.set_last_instruction(op, position);
        position
    }

    fn add_instruction(&mut self, instruction: &[u8]) -> usize {
        let scope = &mut self.scopes[self.scope_index];
        let position = scope.instructions.len();
        scope.instructions.extend_from_slice(instruction);
        position
    }

    fn set_last_instruction(&mut self, op: Opcode, position: usize) {
        let scope = &mut self.scopes[self.scope_index];
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = EmittedInstruction {
            opcode: Some(op),
            position,
        };
    }

    fn current_instructions(&self) -> &Instructions {
        &self.scopes[self.scope_index].instructions
    }

    fn last_instruction_is(&self, op: Opcode) -> bool {
        let scope = &self.scopes[self.scope_index];
        !scope.instructions.is_empty() && scope.last_instruction.opcode == Some(op)
    }

    /// Truncate the buffer past the trailing Pop and restore the
    /// previous instruction as the last one.
    fn remove_last_pop(&mut self) {
        let scope = &mut self.scopes[self.scope_index];
        scope.instructions.truncate(scope.last_instruction.position);
        scope.last_instruction = scope.previous_instruction;
    }

    /// Overwrite the trailing Pop with ReturnValue; both are a single
    /// byte, so the rewrite happens in place.
    fn replace_last_pop_with_return(&mut self) {
        let position = self.scopes[self.scope_index].last_instruction.position;
        self.replace_instruction(position, &make(Opcode::ReturnValue, &[]));
        self.scopes[self.scope_index].last_instruction.opcode = Some(Opcode::ReturnValue);
    }

    /// Rewrite the operand of the instruction at `position` in place.
    fn change_operand(&mut self, position: usize, operand: usize) {
        let scope = &self.scopes[self.scope_index];
        let op = Opcode::from_u8(scope.instructions[position])
            .unwrap_or_else(|| unreachable!("patching a position we emitted"));
        let instruction = make(op, &[operand]);
        self.replace_instruction(position, &instruction);
    }

    fn replace_instruction(&mut self, position: usize, instruction: &[u8]) {
        let scope = &mut self.scopes[self.scope_index];
        scope.instructions[position..position + instruction.len()].copy_from_slice(instruction);
    }

    fn add_constant(&mut self, value: Value) -> CompileResult<usize> {
        if self.constants.len() > u16::MAX as usize {
            return Err(CompileError::TooManyConstants);
        }
        self.constants.push(value);
        Ok(self.constants.len() - 1)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
