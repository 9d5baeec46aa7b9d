// ayc - Interpreter and bytecode compiler for the ayc programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use structopt::StructOpt;
use tracing::debug;

use ayc_parser::Parser;
use ayc_vm::compiler::{Emitter, Folder};
use ayc_vm::{bytecode, Program, Vm};

const HELP: &str = "\
ayc interpreter and bytecode compiler
  --repl     (-e)                start the REPL
  --input    (-i) <file.ayc>     compile and run a source file
  --debug    (-d)                enable verbose diagnostics
  --optimize (-O)                enable constant folding
  --output   (-o) <file.aycb>    write bytecode instead of executing
  --run      (-r) <file.aycb>    run a compiled bytecode file";

/// Interpreter and bytecode compiler for the ayc programming language.
#[derive(Debug, StructOpt)]
#[structopt(name = "ayc")]
struct Opt {
    /// Source file to compile and run
    #[structopt(short = "i", long = "input", parse(from_os_str))]
    input: Option<PathBuf>,

    /// With -i, serialize bytecode to this path instead of executing
    #[structopt(short = "o", long = "output", parse(from_os_str))]
    output: Option<PathBuf>,

    /// Load and execute a compiled bytecode file
    #[structopt(short = "r", long = "run", parse(from_os_str))]
    run: Option<PathBuf>,

    /// Enable the constant-folding pass
    #[structopt(short = "O", long = "optimize")]
    optimize: bool,

    /// Enable verbose internal diagnostics
    #[structopt(short = "d", long = "debug")]
    debug: bool,

    /// Start the interactive REPL
    #[structopt(short = "e", long = "repl")]
    repl: bool,
}

fn main() {
    let opt = Opt::from_args();

    let level = if opt.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(&opt) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(opt: &Opt) -> Result<(), String> {
    if opt.repl {
        return run_repl(opt);
    }
    if let Some(path) = &opt.run {
        return run_bytecode(path, opt.debug);
    }
    if let Some(input) = &opt.input {
        let source = fs::read_to_string(input)
            .map_err(|e| format!("IOError: reading '{}': {}", input.display(), e))?;
        let program = compile(&source, opt)?;
        if let Some(output) = &opt.output {
            let written =
                bytecode::write_file(output, &program).map_err(|e| e.to_string())?;
            debug!(path = %written.display(), "wrote bytecode");
            return Ok(());
        }
        return Vm::new(program).run().map_err(|e| e.to_string());
    }
    println!("{}", HELP);
    Ok(())
}

/// Compile source text through the parse / fold / emit pipeline.
fn compile(source: &str, opt: &Opt) -> Result<Program, String> {
    let mut parser = Parser::new(source).map_err(|e| e.render(source))?;
    let mut ast = parser.parse_program().map_err(|e| e.render(source))?;
    if opt.optimize {
        ast = Folder::new()
            .fold_program(ast)
            .map_err(|e| e.to_string())?;
    }
    let program = Emitter::new().emit_program(&ast).map_err(|e| e.to_string())?;
    dump_listing(&program, opt.debug);
    Ok(program)
}

fn run_bytecode(path: &Path, debug: bool) -> Result<(), String> {
    println!("Running bytecode file: {}", path.display());
    let program = bytecode::read_file(path).map_err(|e| e.to_string())?;
    dump_listing(&program, debug);
    Vm::new(program).run().map_err(|e| e.to_string())
}

fn dump_listing(program: &Program, debug: bool) {
    if debug {
        for line in program.listing().lines() {
            debug!(target: "ayc::bytecode", "{}", line);
        }
    }
}

/// The interactive REPL. Lines accumulate in a buffer; `exec!` evaluates
/// the buffer, clears it, and keeps prompting.
fn run_repl(opt: &Opt) -> Result<(), String> {
    println!("ayc REPL. Type 'exit' to quit, 'exec!' to run the buffered code");
    let stdin = io::stdin();
    let mut buffer = String::new();

    loop {
        print!(">> ");
        io::stdout().flush().map_err(|e| e.to_string())?;

        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => {
                println!();
                return Ok(());
            }
            Ok(_) => {}
            Err(e) => return Err(format!("IOError: {}", e)),
        }

        match line.trim() {
            "exit" => return Ok(()),
            "help" => println!("{}", HELP),
            "exec!" => {
                // A failed compile discards the buffer and re-prompts.
                match compile(&buffer, opt) {
                    Ok(program) => {
                        if let Err(e) = Vm::new(program).run() {
                            eprintln!("{}", e);
                        }
                    }
                    Err(e) => eprintln!("{}", e),
                }
                buffer.clear();
            }
            _ => {
                buffer.push_str(&line);
            }
        }
    }
}
