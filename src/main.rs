//! Rune CLI: execute files, evaluate snippets, or run the REPL.

use std::env;
use std::fs;
use std::process;

use colored::Colorize;

use runelang::error::RuneError;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI command to execute.
enum Command {
    /// Run a script file
    Run { file: String },
    /// Evaluate a string and print the result
    Eval { code: String },
    /// Start the REPL
    Repl,
}

/// CLI options parsed from arguments.
struct Options {
    command: Command,
    disassemble: bool,
}

fn print_usage() {
    eprintln!("Rune {} - a small scripting language", VERSION);
    eprintln!();
    eprintln!("Usage: rune [options] [script.rn]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  rune                 Start the interactive REPL");
    eprintln!("  rune script.rn       Run a script file");
    eprintln!("  rune -e '<code>'     Evaluate code and print the result");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --disassemble, -d    Print the bytecode listing before running");
    eprintln!("  --help, -h           Show this help message");
}

fn parse_args() -> Options {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut options = Options {
        command: Command::Repl,
        disassemble: false,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            "--disassemble" | "-d" => {
                options.disassemble = true;
            }
            "-e" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("-e requires a code argument");
                    print_usage();
                    process::exit(64);
                }
                options.command = Command::Eval {
                    code: args[i].clone(),
                };
            }
            arg if arg.starts_with('-') => {
                eprintln!("unknown option: {}", arg);
                print_usage();
                process::exit(64);
            }
            file => {
                options.command = Command::Run {
                    file: file.to_string(),
                };
            }
        }
        i += 1;
    }

    options
}

fn exit_code(err: &RuneError) -> i32 {
    match err {
        RuneError::Runtime(_) => 70,
        RuneError::Io(_) => 66,
        _ => 65,
    }
}

fn execute(source: &str, disassemble: bool, print_result: bool) -> Result<(), RuneError> {
    let bytecode = runelang::compile(source)?;

    if disassemble {
        print!("{}", runelang::disassemble(&bytecode));
        println!("---");
    }

    let mut vm = runelang::bytecode::Vm::new(bytecode);
    vm.run()?;

    if print_result {
        println!("{}", vm.last_popped());
    }

    Ok(())
}

fn main() {
    let options = parse_args();

    match options.command {
        Command::Repl => {
            let mut repl = runelang::repl::Repl::new();
            if let Err(err) = repl.run() {
                eprintln!("{} {}", "error:".red(), err);
                process::exit(74);
            }
        }
        Command::Eval { code } => {
            if let Err(err) = execute(&code, options.disassemble, true) {
                eprintln!("{} {}", "error:".red(), err);
                process::exit(exit_code(&err));
            }
        }
        Command::Run { file } => {
            let source = match fs::read_to_string(&file) {
                Ok(source) => source,
                Err(err) => {
                    eprintln!("{} could not read '{}': {}", "error:".red(), file, err);
                    process::exit(66);
                }
            };
            if let Err(err) = execute(&source, options.disassemble, false) {
                eprintln!("{} {}", "error:".red(), err);
                process::exit(exit_code(&err));
            }
        }
    }
}
