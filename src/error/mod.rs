//! Error types for all compilation and execution phases.

use thiserror::Error;

/// Lexer errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexerError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

/// Parser errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParserError {
    #[error("unexpected token '{found}', expected {expected}")]
    UnexpectedToken { expected: String, found: String },

    #[error("unexpected end of input")]
    UnexpectedEof,
}

impl ParserError {
    pub fn unexpected_token(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Bytecode compilation errors.
///
/// Unsupported operators never reach the compiler: the AST's operator
/// enums only admit the supported set, so malformed operators are
/// rejected while parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("variable '{0}' not defined")]
    UndefinedVariable(String),

    #[error("too many constants in one compilation unit")]
    TooManyConstants,
}

/// Runtime errors raised by the virtual machine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("stack overflow")]
    StackOverflow,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("type mismatch: {left} {op} {right}")]
    TypeMismatch {
        left: &'static str,
        op: String,
        right: &'static str,
    },

    #[error("unknown operator '{op}' for {type_name} operands")]
    UnknownOperator {
        op: String,
        type_name: &'static str,
    },

    #[error("unsupported type for negation: {0}")]
    UnsupportedNegation(&'static str),

    #[error("division by zero")]
    DivisionByZero,

    #[error("type {0} is not hashable")]
    NotHashable(&'static str),

    #[error("index operator not supported: {0}")]
    IndexUnsupported(&'static str),

    #[error("calling non-function: {0}")]
    CallNonFunction(&'static str),

    #[error("wrong number of arguments: expected {expected}, got {got}")]
    WrongArity { expected: usize, got: usize },

    #[error("undefined opcode {0}")]
    UndefinedOpcode(u8),
}

/// A unified error type for the whole pipeline.
#[derive(Debug, Error)]
pub enum RuneError {
    #[error("lex error: {0}")]
    Lexer(#[from] LexerError),

    #[error("parse error: {0}")]
    Parser(#[from] ParserError),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
