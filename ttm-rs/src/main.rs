use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::thread;

use clap::Parser;
use thiserror::Error;

use ttm::cli::{self, Cli, DebugFlags};
use ttm::config::{ConfigError, LimitSettings, Limits};
use ttm::console::{read_balanced, StdConsole};
use ttm::{logging, Interpreter, TtmError};

#[derive(Debug, Error)]
enum Fatal {
    #[error(transparent)]
    Ttm(#[from] TtmError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("evaluator thread panicked")]
    Panicked,
}

fn main() {
    let args = Cli::parse();
    let flags = args.debug_flags();
    logging::init(flags.log);

    match resolve_limits(&args).and_then(|limits| spawn_run(args, flags, limits)) {
        Ok(code) => std::process::exit(code),
        Err(Fatal::Ttm(e)) => {
            eprint!("{}", e.report());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("ttm: {e}");
            std::process::exit(1);
        }
    }
}

/// Limits from `-X` first, then the rc file.
fn resolve_limits(args: &Cli) -> Result<Limits, Fatal> {
    let rc = cli::load_user_config().unwrap_or_else(|e| {
        tracing::warn!("{e}");
        LimitSettings::new()
    });
    Ok(args.limit_settings()?.or(rc).resolve())
}

/// Evaluation nests on the native stack; give it room for `stacksize` frames.
fn spawn_run(args: Cli, flags: DebugFlags, limits: Limits) -> Result<i32, Fatal> {
    let stack = limits.native_stack_bytes();
    tracing::debug!(stack, frames = limits.stacksize, "starting evaluator");
    thread::Builder::new()
        .name("ttm-eval".into())
        .stack_size(stack)
        .spawn(move || run(&args, flags, limits))?
        .join()
        .map_err(|_| Fatal::Panicked)?
}

fn run(args: &Cli, flags: DebugFlags, limits: Limits) -> Result<i32, Fatal> {
    let mut interp = if flags.bare { Interpreter::bare(limits) } else { Interpreter::with_limits(limits) };
    interp.set_trace(flags.trace);
    interp.set_program_args(args.program_args());
    for dir in &args.include {
        interp.add_include_dir(dir);
    }

    // ── Console redirection ───────────────────────────────────────────────────
    let mut console = StdConsole::new();
    if let Some(path) = &args.output {
        console = console.with_output(Box::new(BufWriter::new(File::create(path)?)));
    }
    if let Some(path) = &args.input {
        console = console.with_input(Box::new(BufReader::new(File::open(path)?)));
    }
    interp.set_console(Box::new(console));

    // ── -D and -e strings ─────────────────────────────────────────────────────
    for src in args.define_calls() {
        interp.eval(&src)?;
        if interp.exiting() {
            return Ok(interp.exit_code());
        }
    }
    for src in &args.eval {
        let out = interp.eval(src)?;
        interp.emit(&out)?;
        if interp.exiting() {
            return Ok(interp.exit_code());
        }
    }

    // ── Program file ──────────────────────────────────────────────────────────
    if let Some(path) = &args.program {
        let text = cli::load_program(path, interp.syntax().escape)?;
        tracing::debug!(path = %path.display(), chars = text.chars().count(), "program loaded");
        let out = interp.eval(&text)?;
        if !args.quiet {
            interp.emit(&out)?;
        }
        if interp.exiting() {
            return Ok(interp.exit_code());
        }
    }

    // ── Interactive loop ──────────────────────────────────────────────────────
    if args.interactive {
        loop {
            let syn = *interp.syntax();
            // lock per read: #<rs> shares stdin
            let Some(line) = read_balanced(&mut io::stdin().lock(), syn.open, syn.close, syn.escape)? else {
                break;
            };
            let out = interp.eval(&line)?;
            interp.emit(&out)?;
            if interp.exiting() {
                break;
            }
        }
    }

    Ok(interp.exit_code())
}
