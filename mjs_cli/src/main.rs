//! Command-line driver and REPL for the mjs ECMAScript interpreter
//! (spec.md §6): `mjs [-e N] [file.js]` runs a file and prints its
//! completion value's `ToInt32`; with no file it reads standard input a
//! line at a time.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use mjs_ast::Version;
use mjs_vm::{Interpreter, InterpreterConfig};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::filter::EnvFilter;

/// A JavaScript engine
#[derive(Debug, ClapParser)]
#[command(name = "mjs")]
#[command(about = "An embeddable ES1/ES3/ES5 interpreter", long_about = None)]
struct Cli {
    /// ECMAScript conformance level: 1, 3, or 5
    #[arg(short = 'e', long = "es", value_name = "N", default_value_t = 5)]
    es: u8,

    /// Trace every statement as it executes
    #[arg(short, long)]
    verbose: bool,

    /// Script to run; omit to start a REPL over standard input
    file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let version = match cli.es {
        1 => Version::Es1,
        3 => Version::Es3,
        _ => Version::Es5,
    };

    let config = InterpreterConfig {
        version,
        trace_statements: if cli.verbose {
            Some(Box::new(|extend| tracing::trace!(%extend, "executing statement")))
        } else {
            None
        },
        ..Default::default()
    };
    let mut interpreter = Interpreter::new(config);

    match cli.file {
        Some(path) => run_file(&mut interpreter, &path),
        None => run_repl(&mut interpreter),
    }
}

/// Runs a single file: loads it as UTF-8, evaluates it at the configured
/// conformance level, and prints the completion value's `ToInt32` (spec.md
/// §6's CLI contract). Exits 1 on any uncaught error, 0 otherwise. Parses
/// separately (rather than through `Agent::evaluate`) so a syntax error can
/// be rendered as a full `miette` diagnostic with a source-span pointer,
/// per spec.md §7's "formatted position prefix" rule for top-level code.
fn run_file(interpreter: &mut Interpreter, path: &PathBuf) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("mjs: cannot read {}: {err}", path.display());
            return ExitCode::FAILURE;
        }
    };
    let filename = path.display().to_string();
    let (ast, program) = match mjs_parser::parse_program(&source, &filename, interpreter.version()) {
        Ok(parsed) => parsed,
        Err(err) => {
            let report = miette::Report::new(err).with_source_code(source);
            eprintln!("{report:?}");
            return ExitCode::FAILURE;
        }
    };
    let result = interpreter.evaluate_parsed(std::rc::Rc::new(ast), program).and_then(|value| interpreter.to_int32(value));
    match result {
        Ok(n) => {
            println!("{n}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", describe_error(interpreter, err));
            ExitCode::FAILURE
        }
    }
}

/// Reads standard input a line at a time, evaluating each line as its own
/// program (spec.md §6). Every line shares the interpreter's global
/// object, so declarations from earlier lines stay visible.
fn run_repl(interpreter: &mut Interpreter) -> ExitCode {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("mjs: cannot start REPL: {err}");
            return ExitCode::FAILURE;
        }
    };
    loop {
        match editor.readline("mjs> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                match interpreter.evaluate(&line, "<stdin>") {
                    Ok(value) => println!("{}", interpreter.to_js_string(value).unwrap_or_else(|_| "undefined".to_string())),
                    Err(err) => eprintln!("{}", describe_error(interpreter, err)),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("mjs: {err}");
                break;
            }
        }
    }
    ExitCode::SUCCESS
}

fn describe_error(interpreter: &mut Interpreter, err: mjs_vm::JsError) -> String {
    interpreter
        .to_js_string(err.value())
        .unwrap_or_else(|_| "uncaught exception".to_string())
}
