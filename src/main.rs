use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;

use rlox as lox;

use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Lox script to run; starts the REPL when omitted
    script: Option<PathBuf>,
}

enum Outcome {
    Success,
    StaticError,
    RuntimeError,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = Cli::parse();

    match args.script {
        Some(path) => run_file(path),
        None => run_prompt(),
    }
}

fn run_file(path: PathBuf) -> anyhow::Result<()> {
    let source: String = fs::read_to_string(path)?;

    let mut interpreter = Interpreter::new();

    match run(&source, &mut interpreter) {
        Outcome::Success => Ok(()),
        Outcome::StaticError => process::exit(65),
        Outcome::RuntimeError => process::exit(70),
    }
}

fn run_prompt() -> anyhow::Result<()> {
    // One interpreter for the whole session: definitions persist across
    // lines, while error state is per line by construction.
    let mut interpreter = Interpreter::new();

    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        run(&line, &mut interpreter);
    }

    Ok(())
}

/// Run one source unit through the full pipeline.  All diagnostics are
/// printed here; any static error suppresses evaluation.
fn run(source: &str, interpreter: &mut Interpreter) -> Outcome {
    let mut had_error = false;

    let mut tokens = Vec::new();
    for item in Scanner::new(source) {
        match item {
            Ok(token) => tokens.push(token),

            Err(err) => {
                println!("{}", err);
                had_error = true;
            }
        }
    }

    let (statements, parse_errors) = Parser::new(tokens).parse();
    for err in &parse_errors {
        println!("{}", err);
    }
    had_error |= !parse_errors.is_empty();

    if !had_error {
        let resolve_errors = Resolver::new(interpreter).resolve(&statements);
        for err in &resolve_errors {
            println!("{}", err);
        }
        had_error |= !resolve_errors.is_empty();
    }

    if had_error {
        return Outcome::StaticError;
    }

    match interpreter.interpret(&statements) {
        Ok(()) => Outcome::Success,

        Err(err) => {
            println!("{}", err);
            Outcome::RuntimeError
        }
    }
}
