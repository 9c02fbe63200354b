use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use rocket::diagnostic::{Diagnostic, ansi::AnsiRenderer, json, registry};
use rocket::{Error, Session, lexer, parser};

/// Compile and run Scheme expressions on a bytecode VM.
#[derive(Parser, Debug)]
#[command(name = "rocket", version)]
struct Cli {
    /// Script to run. Starts a REPL when omitted.
    script: Option<PathBuf>,

    /// Write the token stream to FILE, or to stdout when no FILE is given.
    #[arg(long, value_name = "FILE", num_args = 0..=1, require_equals = true, default_missing_value = "-")]
    dump_tokens: Option<String>,

    /// Print the parsed program as JSON.
    #[arg(long)]
    dump_ast: bool,

    /// Print each unit's bytecode before its result.
    #[arg(long)]
    disassemble: bool,

    /// Bind a global before running, e.g. `--define answer=42`. Repeatable.
    #[arg(long = "define", value_name = "NAME=VALUE", value_parser = parse_binding)]
    defines: Vec<(String, String)>,

    /// Report errors as JSON lines.
    #[arg(long)]
    json: bool,

    /// Explain a diagnostic code (e.g. RKT-C002) and exit.
    #[arg(long, value_name = "CODE")]
    explain: Option<String>,

    /// More log output: -v info, -vv debug, -vvv trace.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_binding(arg: &str) -> Result<(String, String), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{arg}'"))?;
    if name.is_empty() {
        return Err("binding has no name".to_string());
    }
    Ok((name.to_string(), value.to_string()))
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Rocket(#[from] Error),
    #[error("cannot write {path}: {source}")]
    Io { path: String, source: io::Error },
}

/// Where `--dump-tokens` output goes. Opened once so REPL entries accumulate.
struct TokenDump {
    path: String,
    out: Box<dyn Write>,
}

impl TokenDump {
    fn open(target: &str) -> Result<TokenDump, RunError> {
        let out: Box<dyn Write> = if target == "-" {
            Box::new(io::stdout())
        } else {
            let file = File::create(target).map_err(|source| RunError::Io { path: target.to_string(), source })?;
            Box::new(file)
        };
        Ok(TokenDump { path: target.to_string(), out })
    }

    fn write(&mut self, text: &str) -> Result<(), RunError> {
        self.out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(|source| RunError::Io { path: self.path.clone(), source })
    }
}

struct Reporter {
    json: bool,
    color: bool,
}

impl Reporter {
    fn emit(&self, d: &Diagnostic) {
        if self.json {
            eprintln!("{}", json::render(d));
        } else {
            eprint!("{}", AnsiRenderer { use_color: self.color }.render(d));
        }
    }

    fn report(&self, e: &RunError, source: &str) {
        let d = match e {
            RunError::Rocket(e) => Diagnostic::from(e).with_source(source),
            RunError::Io { .. } => Diagnostic::error(e.to_string()),
        };
        self.emit(&d);
    }
}

struct Runner {
    session: Session,
    tokens: Option<TokenDump>,
    dump_ast: bool,
}

impl Runner {
    /// Runs every top-level expression in `source`, printing each result.
    fn run(&mut self, source: &str) -> Result<(), RunError> {
        let tokens = lexer::lex(source).map_err(Error::from)?;
        if let Some(dump) = &mut self.tokens {
            dump.write(&lexer::dump(&tokens))?;
        }

        let program = parser::parse(tokens).map_err(Error::from)?;
        if self.dump_ast {
            match serde_json::to_string_pretty(&program) {
                Ok(json) => println!("{}", json),
                Err(e) => log::warn!("cannot serialize AST: {}", e),
            }
        }

        for node in &program {
            let evaluated = self.session.eval_node(node)?;
            if let Some(listing) = &evaluated.listing {
                print!("{}", listing);
            }
            println!("{}", evaluated.value);
        }
        Ok(())
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // RUST_LOG, when set, overrides the flag.
    if let Err(e) = simple_logger::SimpleLogger::new().with_level(level).env().init() {
        eprintln!("warning: logging disabled: {}", e);
    }
}

fn explain(code: &str) -> ExitCode {
    match registry::lookup(code) {
        Some(entry) => {
            print!("{}", entry.long);
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("error: unknown diagnostic code '{}'", code);
            ExitCode::FAILURE
        }
    }
}

fn run_script(runner: &mut Runner, path: &Path, reporter: &Reporter) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            reporter.emit(&Diagnostic::error(format!("cannot read {}: {}", path.display(), e)));
            return ExitCode::FAILURE;
        }
    };
    log::info!("running {} ({} bytes)", path.display(), source.len());

    match runner.run(&source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            reporter.report(&e, &source);
            ExitCode::FAILURE
        }
    }
}

fn repl(runner: &mut Runner, reporter: &Reporter) -> ExitCode {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("error: cannot start the REPL: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut pending = String::new();
    loop {
        let prompt = if pending.is_empty() { "> " } else { "... " };
        match editor.readline(prompt) {
            Ok(line) => {
                pending.push_str(&line);
                pending.push('\n');
                if pending.trim().is_empty() {
                    pending.clear();
                    continue;
                }
                // An open form waits for the next line.
                if matches!(runner.session.parse(&pending), Err(e) if e.is_incomplete()) {
                    continue;
                }
                let _ = editor.add_history_entry(pending.trim_end());
                if let Err(e) = runner.run(&pending) {
                    reporter.report(&e, &pending);
                }
                pending.clear();
            }
            // Ctrl-C drops the form being typed.
            Err(ReadlineError::Interrupted) => pending.clear(),
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(code) = &cli.explain {
        return explain(code);
    }

    let reporter = Reporter { json: cli.json, color: io::stderr().is_terminal() };

    let tokens = match cli.dump_tokens.as_deref().map(TokenDump::open).transpose() {
        Ok(tokens) => tokens,
        Err(e) => {
            reporter.report(&e, "");
            return ExitCode::FAILURE;
        }
    };

    let mut session = Session::new();
    session.set_disassemble(cli.disassemble);
    for (name, source) in &cli.defines {
        if let Err(e) = session.define_from_source(name, source) {
            reporter.report(&RunError::from(e), source);
            return ExitCode::FAILURE;
        }
    }

    let mut runner = Runner { session, tokens, dump_ast: cli.dump_ast };
    match &cli.script {
        Some(path) => run_script(&mut runner, path, &reporter),
        None => repl(&mut runner, &reporter),
    }
}
