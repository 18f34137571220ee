//! Interactive REPL for Rune.

use std::path::PathBuf;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::bytecode::{Compiler, Value, Vm};
use crate::lexer::Scanner;
use crate::parser::Parser;

const HISTORY_FILE: &str = ".rune_history";
const PROMPT: &str = ">> ";

/// The REPL threads the symbol table, constant pool, and globals
/// through every line so definitions persist across inputs.
pub struct Repl {
    state: Option<ReplState>,
}

struct ReplState {
    symbols: crate::bytecode::SymbolTable,
    constants: Vec<Value>,
    globals: Vec<Value>,
}

impl Repl {
    pub fn new() -> Self {
        Self { state: None }
    }

    fn history_path() -> PathBuf {
        match dirs::home_dir() {
            Some(home) => home.join(HISTORY_FILE),
            None => PathBuf::from(HISTORY_FILE),
        }
    }

    /// Run the interactive loop until EOF or interrupt.
    pub fn run(&mut self) -> rustyline::Result<()> {
        println!("Rune {} - type an expression, Ctrl-D to exit", env!("CARGO_PKG_VERSION"));

        let mut editor = DefaultEditor::new()?;
        let history_path = Self::history_path();
        let _ = editor.load_history(&history_path);

        loop {
            match editor.readline(PROMPT) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let _ = editor.add_history_entry(&line);
                    self.execute_line(&line);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("{} {}", "error:".red(), err);
                    break;
                }
            }
        }

        let _ = editor.save_history(&history_path);
        Ok(())
    }

    /// Compile and run one input line against the accumulated state.
    fn execute_line(&mut self, line: &str) {
        let state = self.state.take().unwrap_or_else(|| ReplState {
            symbols: crate::bytecode::SymbolTable::new(),
            constants: Vec::new(),
            globals: vec![Value::Null; crate::bytecode::vm::GLOBAL_SIZE],
        });

        let ReplState {
            symbols,
            constants,
            globals,
        } = state;

        let program = match Scanner::new(line)
            .scan_tokens()
            .map_err(|e| e.to_string())
            .and_then(|tokens| Parser::new(tokens).parse().map_err(|e| e.to_string()))
        {
            Ok(program) => program,
            Err(message) => {
                eprintln!("{} {}", "parse error:".red(), message);
                self.state = Some(ReplState {
                    symbols,
                    constants,
                    globals,
                });
                return;
            }
        };

        let mut compiler = Compiler::new_with_state(symbols, constants);
        let compile_result = compiler.compile(&program);
        let bytecode = compiler.bytecode();
        let (symbols, constants) = compiler.into_state();

        if let Err(err) = compile_result {
            eprintln!("{} {}", "compile error:".red(), err);
            self.state = Some(ReplState {
                symbols,
                constants,
                globals,
            });
            return;
        }

        let mut vm = Vm::new_with_globals(bytecode, globals);
        let run_result = vm.run();
        let last = vm.last_popped().clone();
        let globals = vm.into_globals();

        match run_result {
            Ok(()) => println!("{}", last),
            Err(err) => eprintln!("{} {}", "runtime error:".red(), err),
        }

        self.state = Some(ReplState {
            symbols,
            constants,
            globals,
        });
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}
