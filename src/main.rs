//! Driver: run a source file, or start an interactive session.

use std::env;
use std::process;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use tisp::Error;
use tisp::ast::Value;
use tisp::evaluator::Interpreter;
use tisp::lexer::Tokenizer;
use tisp::parser;
use tisp::source::TextSource;

fn main() {
    let mut args = env::args().skip(1);
    match args.next() {
        Some(path) => {
            if args.next().is_some() {
                eprintln!("usage: tisp [file]");
                process::exit(2);
            }
            run_file(&path);
        }
        None => run_repl(),
    }
}

/// Parse and evaluate every top-level form of a file, printing each
/// non-null result. The first error aborts the run.
fn run_file(path: &str) {
    let source = match TextSource::open(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{path}: {e}");
            process::exit(1);
        }
    };

    let mut interp = Interpreter::new();
    if let Err(e) = run_source(source, &mut interp) {
        eprintln!("{e}");
        process::exit(1);
    }
}

/// Evaluate all forms in a source against the given interpreter.
fn run_source(source: TextSource, interp: &mut Interpreter) -> Result<(), Error> {
    let mut tokenizer = Tokenizer::new(source);
    while tokenizer.peek()?.is_some() {
        let tree = parser::read(&mut tokenizer)?;
        let value = interp.execute(&tree)?;
        if !matches!(value, Value::Null) {
            println!("{value}");
        }
    }
    Ok(())
}

/// Interactive session with a persistent interpreter. Errors are printed
/// and the session continues.
fn run_repl() {
    println!("tisp interpreter");
    println!("Enter S-expressions like: (+ 1 2)");
    println!("Press Ctrl+C or Ctrl+D to exit.");
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("could not initialize the line editor: {e}");
            process::exit(1);
        }
    };
    let mut interp = Interpreter::new();

    loop {
        match rl.readline("tisp> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);
                if let Err(e) = run_source(TextSource::new(&line), &mut interp) {
                    eprintln!("{e}");
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("input error: {e}");
                break;
            }
        }
    }
}
