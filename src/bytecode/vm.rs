//! Stack-based virtual machine executing compiled bytecode.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::bytecode::compiler::ByteCode;
use crate::bytecode::instruction::{self, Opcode};
use crate::bytecode::value::{CompiledFunction, HashPair, Value};
use crate::error::RuntimeError;

/// Maximum operand stack depth, in values.
pub const STACK_SIZE: usize = 2048;
/// Number of global variable slots.
pub const GLOBAL_SIZE: usize = 65536;
/// Maximum call-frame depth.
pub const MAX_FRAMES: usize = 1024;

/// Result type for VM operations.
pub type VmResult<T> = Result<T, RuntimeError>;

/// A call frame: one active function invocation.
#[derive(Debug)]
struct Frame {
    /// The function being executed
    function: Rc<CompiledFunction>,
    /// Offset of the next byte to read in the function's instructions
    ip: usize,
    /// Stack index where this frame's locals begin
    base_pointer: usize,
}

/// The bytecode virtual machine.
pub struct Vm {
    constants: Vec<Value>,
    /// The operand stack. Slots above `sp` keep their old values so
    /// `last_popped` can read the most recently popped element.
    stack: Vec<Value>,
    /// Next free stack slot
    sp: usize,
    /// Global variable slots, indexed by symbol index
    globals: Vec<Value>,
    frames: Vec<Frame>,
}

impl Vm {
    pub fn new(bytecode: ByteCode) -> Self {
        Self::new_with_globals(bytecode, vec![Value::Null; GLOBAL_SIZE])
    }

    /// Create a VM reusing an existing globals array. The REPL threads
    /// its globals through this so definitions persist across lines.
    pub fn new_with_globals(bytecode: ByteCode, globals: Vec<Value>) -> Self {
        let main_function = Rc::new(CompiledFunction {
            instructions: bytecode.instructions,
            num_locals: 0,
            num_parameters: 0,
        });
        let main_frame = Frame {
            function: main_function,
            ip: 0,
            base_pointer: 0,
        };

        Self {
            constants: bytecode.constants,
            stack: vec![Value::Null; STACK_SIZE],
            sp: 0,
            globals,
            frames: vec![main_frame],
        }
    }

    /// Tear down the VM and hand back its globals array.
    pub fn into_globals(self) -> Vec<Value> {
        self.globals
    }

    /// The element most recently popped off the stack. After a program
    /// whose last statement is an expression, this is that
    /// expression's value.
    pub fn last_popped(&self) -> &Value {
        &self.stack[self.sp]
    }

    /// Execute until the top-level frame runs off the end of its
    /// instructions.
    pub fn run(&mut self) -> VmResult<()> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(());
            };
            if frame.ip >= frame.function.instructions.len() {
                return Ok(());
            }

            let byte = frame.function.instructions[frame.ip];
            frame.ip += 1;
            let op = Opcode::from_u8(byte).ok_or(RuntimeError::UndefinedOpcode(byte))?;

            match op {
                Opcode::Constant => {
                    let idx = self.read_u16();
                    // Constant indices are compiler-produced and in range
                    let value = self.constants[idx].clone();
                    self.push(value)?;
                }

                Opcode::Pop => {
                    self.pop()?;
                }

                Opcode::True => self.push(Value::Bool(true))?,
                Opcode::False => self.push(Value::Bool(false))?,
                Opcode::Null => self.push(Value::Null)?,

                Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Equal
                | Opcode::NotEqual
                | Opcode::GreaterThan => self.execute_binary_operation(op)?,

                Opcode::Bang => {
                    let value = self.pop()?;
                    // Non-boolean operands negate to true (`!5 == true`)
                    let result = match value {
                        Value::Bool(b) => !b,
                        _ => true,
                    };
                    self.push(Value::Bool(result))?;
                }

                Opcode::Minus => {
                    let value = self.pop()?;
                    match value {
                        Value::Int(n) => self.push(Value::Int(-n))?,
                        other => {
                            return Err(RuntimeError::UnsupportedNegation(other.type_name()))
                        }
                    }
                }

                Opcode::Jump => {
                    let target = self.read_u16();
                    self.current_frame().ip = target;
                }

                Opcode::JumpNotTruthy => {
                    let target = self.read_u16();
                    let condition = self.pop()?;
                    if !condition.is_truthy() {
                        self.current_frame().ip = target;
                    }
                }

                Opcode::SetGlobal => {
                    let idx = self.read_u16();
                    self.globals[idx] = self.pop()?;
                }

                Opcode::GetGlobal => {
                    let idx = self.read_u16();
                    let value = self.globals[idx].clone();
                    self.push(value)?;
                }

                Opcode::SetLocal => {
                    let idx = self.read_u8();
                    let base_pointer = self.current_frame().base_pointer;
                    self.stack[base_pointer + idx] = self.pop()?;
                }

                Opcode::GetLocal => {
                    let idx = self.read_u8();
                    let base_pointer = self.current_frame().base_pointer;
                    let value = self.stack[base_pointer + idx].clone();
                    self.push(value)?;
                }

                Opcode::Array => {
                    let count = self.read_u16();
                    let elements = self.stack[self.sp - count..self.sp].to_vec();
                    self.sp -= count;
                    self.push(Value::Array(Rc::new(elements)))?;
                }

                Opcode::Hash => {
                    let count = self.read_u16();
                    let hash = self.build_hash(self.sp - count, self.sp)?;
                    self.sp -= count;
                    self.push(hash)?;
                }

                Opcode::Index => {
                    let index = self.pop()?;
                    let left = self.pop()?;
                    self.execute_index(left, index)?;
                }

                Opcode::Call => {
                    let num_args = self.read_u8();
                    self.call_function(num_args)?;
                }

                Opcode::ReturnValue => {
                    let value = self.pop()?;
                    let frame = self.pop_frame();
                    self.sp = frame.base_pointer.saturating_sub(1);
                    self.push(value)?;
                    if self.frames.is_empty() {
                        return Ok(());
                    }
                }

                Opcode::Return => {
                    let frame = self.pop_frame();
                    self.sp = frame.base_pointer.saturating_sub(1);
                    self.push(Value::Null)?;
                    if self.frames.is_empty() {
                        return Ok(());
                    }
                }
            }
        }
    }

    // ===== Operations =====

    fn execute_binary_operation(&mut self, op: Opcode) -> VmResult<()> {
        let right = self.pop()?;
        let left = self.pop()?;

        match (&left, &right) {
            (Value::Int(l), Value::Int(r)) => self.execute_integer_operation(*l, op, *r),

            (Value::Bool(l), Value::Bool(r)) => match op {
                Opcode::Equal => self.push(Value::Bool(l == r)),
                Opcode::NotEqual => self.push(Value::Bool(l != r)),
                _ => Err(RuntimeError::UnknownOperator {
                    op: operator_symbol(op).to_string(),
                    type_name: "Bool",
                }),
            },

            (Value::String(l), Value::String(r)) => match op {
                Opcode::Add => {
                    let joined = format!("{}{}", l, r);
                    self.push(Value::String(Rc::new(joined)))
                }
                _ => Err(RuntimeError::UnknownOperator {
                    op: operator_symbol(op).to_string(),
                    type_name: "String",
                }),
            },

            _ => Err(RuntimeError::TypeMismatch {
                left: left.type_name(),
                op: operator_symbol(op).to_string(),
                right: right.type_name(),
            }),
        }
    }

    fn execute_integer_operation(&mut self, left: i64, op: Opcode, right: i64) -> VmResult<()> {
        let result = match op {
            Opcode::Add => Value::Int(left + right),
            Opcode::Sub => Value::Int(left - right),
            Opcode::Mul => Value::Int(left * right),
            Opcode::Div => {
                if right == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                Value::Int(left / right)
            }
            Opcode::Equal => Value::Bool(left == right),
            Opcode::NotEqual => Value::Bool(left != right),
            Opcode::GreaterThan => Value::Bool(left > right),
            _ => unreachable!("non-binary opcode {:?}", op),
        };
        self.push(result)
    }

    fn build_hash(&self, start: usize, end: usize) -> VmResult<Value> {
        let mut pairs = IndexMap::new();

        let mut i = start;
        while i < end {
            let key = self.stack[i].clone();
            let value = self.stack[i + 1].clone();
            let hash_key = key
                .hash_key()
                .ok_or(RuntimeError::NotHashable(key.type_name()))?;
            pairs.insert(hash_key, HashPair { key, value });
            i += 2;
        }

        Ok(Value::Hash(Rc::new(pairs)))
    }

    fn execute_index(&mut self, left: Value, index: Value) -> VmResult<()> {
        match (&left, &index) {
            (Value::Array(elements), Value::Int(i)) => {
                // Out-of-range access yields null, not an error
                let value = if *i < 0 || *i as usize >= elements.len() {
                    Value::Null
                } else {
                    elements[*i as usize].clone()
                };
                self.push(value)
            }

            (Value::Hash(pairs), _) => {
                let hash_key = index
                    .hash_key()
                    .ok_or(RuntimeError::NotHashable(index.type_name()))?;
                let value = pairs
                    .get(&hash_key)
                    .map(|pair| pair.value.clone())
                    .unwrap_or(Value::Null);
                self.push(value)
            }

            _ => Err(RuntimeError::IndexUnsupported(left.type_name())),
        }
    }

    fn call_function(&mut self, num_args: usize) -> VmResult<()> {
        let callee = self.stack[self.sp - 1 - num_args].clone();
        let Value::Function(function) = callee else {
            return Err(RuntimeError::CallNonFunction(callee.type_name()));
        };

        if num_args != function.num_parameters {
            return Err(RuntimeError::WrongArity {
                expected: function.num_parameters,
                got: num_args,
            });
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err(RuntimeError::StackOverflow);
        }

        // Arguments already occupy the first local slots
        let base_pointer = self.sp - num_args;
        if base_pointer + function.num_locals > STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }
        self.sp = base_pointer + function.num_locals;

        self.frames.push(Frame {
            function,
            ip: 0,
            base_pointer,
        });

        Ok(())
    }

    // ===== Stack & frame plumbing =====

    fn push(&mut self, value: Value) -> VmResult<()> {
        if self.sp >= STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> VmResult<Value> {
        if self.sp == 0 {
            return Err(RuntimeError::StackUnderflow);
        }
        self.sp -= 1;
        // The slot is left intact for `last_popped`
        Ok(self.stack[self.sp].clone())
    }

    fn current_frame(&mut self) -> &mut Frame {
        // A frame is always active while `run` dispatches
        self.frames.last_mut().expect("no active frame")
    }

    fn pop_frame(&mut self) -> Frame {
        self.frames.pop().expect("no active frame")
    }

    fn read_u8(&mut self) -> usize {
        let frame = self.current_frame();
        let byte = frame.function.instructions[frame.ip];
        frame.ip += 1;
        byte as usize
    }

    fn read_u16(&mut self) -> usize {
        let frame = self.current_frame();
        let value = instruction::read_u16(&frame.function.instructions[frame.ip..]);
        frame.ip += 2;
        value as usize
    }
}

/// The source-level symbol for a binary opcode, used in error messages.
fn operator_symbol(op: Opcode) -> &'static str {
    match op {
        Opcode::Add => "+",
        Opcode::Sub => "-",
        Opcode::Mul => "*",
        Opcode::Div => "/",
        Opcode::Equal => "==",
        Opcode::NotEqual => "!=",
        Opcode::GreaterThan => ">",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::compiler::Compiler;
    use crate::bytecode::instruction::make;
    use crate::lexer::Scanner;
    use crate::parser::Parser;

    fn run_source(input: &str) -> VmResult<Value> {
        let tokens = Scanner::new(input).scan_tokens().expect("lexer error");
        let program = Parser::new(tokens).parse().expect("parser error");
        let mut compiler = Compiler::new();
        compiler.compile(&program).expect("compile error");

        let mut vm = Vm::new(compiler.bytecode());
        vm.run()?;
        Ok(vm.last_popped().clone())
    }

    fn expect_value(input: &str, expected: Value) {
        match run_source(input) {
            Ok(value) => assert_eq!(value, expected, "wrong value for {:?}", input),
            Err(err) => panic!("runtime error for {:?}: {}", input, err),
        }
    }

    fn expect_error(input: &str, expected: RuntimeError) {
        match run_source(input) {
            Ok(value) => panic!("expected error for {:?}, got {}", input, value),
            Err(err) => assert_eq!(err, expected, "wrong error for {:?}", input),
        }
    }

    fn int(n: i64) -> Value {
        Value::Int(n)
    }

    fn boolean(b: bool) -> Value {
        Value::Bool(b)
    }

    fn string(s: &str) -> Value {
        Value::String(Rc::new(s.to_string()))
    }

    fn array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(elements))
    }

    fn hash(pairs: Vec<(Value, Value)>) -> Value {
        let mut map = IndexMap::new();
        for (key, value) in pairs {
            map.insert(key.hash_key().unwrap(), HashPair { key, value });
        }
        Value::Hash(Rc::new(map))
    }

    #[test]
    fn test_integer_arithmetic() {
        expect_value("1", int(1));
        expect_value("2", int(2));
        expect_value("1 + 2", int(3));
        expect_value("1 - 2", int(-1));
        expect_value("1 * 2", int(2));
        expect_value("4 / 2", int(2));
        expect_value("50 / 2 * 2 + 10 - 5", int(55));
        expect_value("5 * (2 + 10)", int(60));
        expect_value("-5", int(-5));
        expect_value("-50 + 100 + -50", int(0));
        expect_value("(5 + 10 * 2 + 15 / 3) * 2 + -10", int(50));
        expect_value("1 + 2 * 3", int(7));
    }

    #[test]
    fn test_boolean_expressions() {
        expect_value("true", boolean(true));
        expect_value("false", boolean(false));
        expect_value("1 < 2", boolean(true));
        expect_value("1 > 2", boolean(false));
        expect_value("1 == 1", boolean(true));
        expect_value("1 != 1", boolean(false));
        expect_value("1 == 2", boolean(false));
        expect_value("1 != 2", boolean(true));
        expect_value("true == true", boolean(true));
        expect_value("false == false", boolean(true));
        expect_value("true == false", boolean(false));
        expect_value("true != false", boolean(true));
        expect_value("(1 < 2) == true", boolean(true));
        expect_value("(1 > 2) == false", boolean(true));
    }

    #[test]
    fn test_bang_operator() {
        expect_value("!true", boolean(false));
        expect_value("!false", boolean(true));
        expect_value("!!true", boolean(true));
        expect_value("!!false", boolean(false));
        // Non-boolean operands negate to true
        expect_value("!5", boolean(true));
        expect_value("!(if (false) { 5; })", boolean(true));
    }

    #[test]
    fn test_conditionals() {
        expect_value("if (true) { 10 }", int(10));
        expect_value("if (true) { 10 } else { 20 }", int(10));
        expect_value("if (false) { 10 } else { 20 }", int(20));
        expect_value("if (1) { 10 }", int(10));
        expect_value("if (1 < 2) { 10 }", int(10));
        expect_value("if (1 < 2) { 10 } else { 20 }", int(10));
        expect_value("if (1 > 2) { 10 } else { 20 }", int(20));
        // Missing alternatives produce null
        expect_value("if (1 > 2) { 10 }", Value::Null);
        expect_value("if (false) { 10 }", Value::Null);
        expect_value("if ((if (false) { 10 })) { 10 } else { 20 }", int(20));
    }

    #[test]
    fn test_global_let_statements() {
        expect_value("let one = 1; one", int(1));
        expect_value("let one = 1; let two = 2; one + two", int(3));
        expect_value("let one = 1; let two = one + one; one + two", int(3));
        expect_value("let a = 1; let b = 2; a + b;", int(3));
    }

    #[test]
    fn test_string_expressions() {
        expect_value("\"rune\"", string("rune"));
        expect_value("\"ru\" + \"ne\"", string("rune"));
        expect_value("\"ru\" + \"ne\" + \" lang\"", string("rune lang"));
    }

    #[test]
    fn test_array_literals() {
        expect_value("[]", array(vec![]));
        expect_value("[1, 2, 3]", array(vec![int(1), int(2), int(3)]));
        expect_value(
            "[1 + 2, 3 * 4, 5 + 6]",
            array(vec![int(3), int(12), int(11)]),
        );
    }

    #[test]
    fn test_hash_literals() {
        expect_value("{}", hash(vec![]));
        expect_value(
            "{1: 2, 2: 3}",
            hash(vec![(int(1), int(2)), (int(2), int(3))]),
        );
        expect_value(
            "{1 + 1: 2 * 2, 3 + 3: 4 * 4}",
            hash(vec![(int(2), int(4)), (int(6), int(16))]),
        );
    }

    #[test]
    fn test_index_expressions() {
        expect_value("[1, 2, 3][1]", int(2));
        expect_value("[1, 2, 3][0 + 2]", int(3));
        expect_value("[[1, 1, 1]][0][0]", int(1));
        expect_value("[][0]", Value::Null);
        expect_value("[1, 2, 3][99]", Value::Null);
        expect_value("[1][-1]", Value::Null);
        expect_value("{1: 1, 2: 2}[1]", int(1));
        expect_value("{1: 1, 2: 2}[2]", int(2));
        expect_value("{1: 1}[0]", Value::Null);
        expect_value("{}[0]", Value::Null);
        expect_value("{\"one\": 1, \"two\": 2}[\"one\"]", int(1));
        expect_value("{true: 5}[true]", int(5));
    }

    #[test]
    fn test_calling_functions() {
        expect_value("let f = fn() { 15 + 10 }; f();", int(25));
        expect_value(
            "let one = fn() { 1 }; let two = fn() { 2 }; one() + two()",
            int(3),
        );
        expect_value(
            "let a = fn() { 1 }; let b = fn() { a() + 1 }; let c = fn() { b() + 1 }; c();",
            int(3),
        );
        expect_value("fn() { 24 }();", int(24));
    }

    #[test]
    fn test_functions_with_return_statements() {
        expect_value("let f = fn() { return 99; 100; }; f();", int(99));
        expect_value("let f = fn() { return 99; return 100; }; f();", int(99));
    }

    #[test]
    fn test_functions_without_return_value() {
        expect_value("let f = fn() { }; f();", Value::Null);
        expect_value(
            "let f = fn() { }; let g = fn() { f(); }; f(); g();",
            Value::Null,
        );
    }

    #[test]
    fn test_first_class_functions() {
        expect_value(
            "let retOne = fn() { 1 }; let retRetOne = fn() { retOne }; retRetOne()();",
            int(1),
        );
    }

    #[test]
    fn test_calling_functions_with_bindings() {
        expect_value("let one = fn() { let one = 1; one }; one();", int(1));
        expect_value(
            "let oneAndTwo = fn() { let one = 1; let two = 2; one + two; }; oneAndTwo();",
            int(3),
        );
        expect_value(
            "let oneAndTwo = fn() { let one = 1; let two = 2; one + two; } \
             let threeAndFour = fn() { let three = 3; let four = 4; three + four; } \
             oneAndTwo() + threeAndFour();",
            int(10),
        );
        expect_value(
            "let firstFoobar = fn() { let foobar = 50; foobar; } \
             let secondFoobar = fn() { let foobar = 100; foobar; } \
             firstFoobar() + secondFoobar();",
            int(150),
        );
        expect_value(
            "let globalSeed = 50; \
             let minusOne = fn() { let num = 1; globalSeed - num; } \
             let minusTwo = fn() { let num = 2; globalSeed - num; } \
             minusOne() + minusTwo();",
            int(97),
        );
    }

    #[test]
    fn test_calling_functions_with_arguments() {
        expect_value("let identity = fn(a) { a; }; identity(4);", int(4));
        expect_value("let sum = fn(a, b) { a + b; }; sum(1, 2);", int(3));
        expect_value("let sum = fn(a, b) { let c = a + b; c; }; sum(1, 2);", int(3));
        expect_value(
            "let sum = fn(a, b) { let c = a + b; c; }; sum(1, 2) + sum(3, 4);",
            int(10),
        );
        expect_value(
            "let sum = fn(a, b) { let c = a + b; c; } \
             let outer = fn() { sum(1, 2) + sum(3, 4); } \
             outer();",
            int(10),
        );
        expect_value(
            "let globalNum = 10; \
             let sum = fn(a, b) { let c = a + b; c + globalNum; } \
             let outer = fn() { sum(1, 2) + sum(3, 4) + globalNum; } \
             outer() + globalNum;",
            int(50),
        );
    }

    #[test]
    fn test_wrong_arity() {
        expect_error(
            "fn() { 1; }(1);",
            RuntimeError::WrongArity {
                expected: 0,
                got: 1,
            },
        );
        expect_error(
            "fn(a) { a; }();",
            RuntimeError::WrongArity {
                expected: 1,
                got: 0,
            },
        );
        expect_error(
            "fn(a, b) { a + b; }(1);",
            RuntimeError::WrongArity {
                expected: 2,
                got: 1,
            },
        );
    }

    #[test]
    fn test_type_errors() {
        expect_error(
            "5 + true",
            RuntimeError::TypeMismatch {
                left: "Int",
                op: "+".to_string(),
                right: "Bool",
            },
        );
        expect_error(
            "5 + true; 5;",
            RuntimeError::TypeMismatch {
                left: "Int",
                op: "+".to_string(),
                right: "Bool",
            },
        );
        expect_error("-true", RuntimeError::UnsupportedNegation("Bool"));
        expect_error(
            "true + false",
            RuntimeError::UnknownOperator {
                op: "+".to_string(),
                type_name: "Bool",
            },
        );
        expect_error(
            "if (10 > 1) { true + false; }",
            RuntimeError::UnknownOperator {
                op: "+".to_string(),
                type_name: "Bool",
            },
        );
        expect_error(
            "\"a\" - \"b\"",
            RuntimeError::UnknownOperator {
                op: "-".to_string(),
                type_name: "String",
            },
        );
    }

    #[test]
    fn test_division_by_zero() {
        expect_error("5 / 0", RuntimeError::DivisionByZero);
        expect_error("let x = 10; x / (5 - 5)", RuntimeError::DivisionByZero);
    }

    #[test]
    fn test_calling_non_functions() {
        expect_error("1();", RuntimeError::CallNonFunction("Int"));
        expect_error("let x = 5; x();", RuntimeError::CallNonFunction("Int"));
        expect_error("\"s\"();", RuntimeError::CallNonFunction("String"));
    }

    #[test]
    fn test_unhashable_keys() {
        expect_error(
            "{[1, 2]: \"value\"}",
            RuntimeError::NotHashable("Array"),
        );
        expect_error(
            "{\"name\": \"Rune\"}[fn(x) { x }];",
            RuntimeError::NotHashable("Function"),
        );
    }

    #[test]
    fn test_unsupported_index() {
        expect_error("5[0]", RuntimeError::IndexUnsupported("Int"));
        expect_error("true[0]", RuntimeError::IndexUnsupported("Bool"));
        expect_error("[1][\"a\"]", RuntimeError::IndexUnsupported("Array"));
    }

    #[test]
    fn test_stack_overflow_on_push() {
        let mut vm = Vm::new(ByteCode::default());
        for _ in 0..STACK_SIZE {
            vm.push(Value::Int(1)).unwrap();
        }
        assert_eq!(vm.push(Value::Int(1)), Err(RuntimeError::StackOverflow));
    }

    #[test]
    fn test_stack_underflow_on_pop() {
        let mut vm = Vm::new(ByteCode::default());
        assert_eq!(vm.pop(), Err(RuntimeError::StackUnderflow));
    }

    #[test]
    fn test_frame_overflow() {
        // A function that calls itself through its global slot; each
        // call pushes a frame and none ever returns.
        let body: Vec<u8> = [
            make(Opcode::GetGlobal, &[0]),
            make(Opcode::Call, &[0]),
            make(Opcode::ReturnValue, &[]),
        ]
        .concat();
        let function = Value::Function(Rc::new(CompiledFunction {
            instructions: body,
            num_locals: 0,
            num_parameters: 0,
        }));
        let bytecode = ByteCode {
            instructions: [
                make(Opcode::Constant, &[0]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::Call, &[0]),
                make(Opcode::Pop, &[]),
            ]
            .concat(),
            constants: vec![function],
        };

        let mut vm = Vm::new(bytecode);
        assert_eq!(vm.run(), Err(RuntimeError::StackOverflow));
    }

    #[test]
    fn test_undefined_opcode() {
        let bytecode = ByteCode {
            instructions: vec![254],
            constants: vec![],
        };
        let mut vm = Vm::new(bytecode);
        assert_eq!(vm.run(), Err(RuntimeError::UndefinedOpcode(254)));
    }

    #[test]
    fn test_globals_survive_across_runs() {
        let compile = |source: &str, state: Option<(crate::bytecode::SymbolTable, Vec<Value>)>| {
            let tokens = Scanner::new(source).scan_tokens().unwrap();
            let program = Parser::new(tokens).parse().unwrap();
            let mut compiler = match state {
                Some((symbols, constants)) => Compiler::new_with_state(symbols, constants),
                None => Compiler::new(),
            };
            compiler.compile(&program).unwrap();
            let bytecode = compiler.bytecode();
            (bytecode, compiler.into_state())
        };

        let (first, state) = compile("let x = 40;", None);
        let mut vm = Vm::new(first);
        vm.run().unwrap();
        let globals = vm.into_globals();

        let (second, _) = compile("x + 2;", Some(state));
        let mut vm = Vm::new_with_globals(second, globals);
        vm.run().unwrap();
        assert_eq!(*vm.last_popped(), Value::Int(42));
    }
}
