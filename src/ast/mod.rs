//! Abstract syntax tree for Rune programs.

pub mod expr;
pub mod stmt;

pub use expr::{Expr, InfixOp, PrefixOp};
pub use stmt::{Block, Program, Stmt};
