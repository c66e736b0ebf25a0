//! Command-line arguments and user configuration.
//!
//! Usage:
//!   ttm [-d FLAGS] [-D NAME=VALUE]... [-e TEXT]... [-p FILE] [-f FILE]
//!       [-I DIR]... [-o FILE] [-i] [-q] [-X TAG=VALUE]... [ARGS]...

use std::path::{Path, PathBuf};

use clap::Parser;
use directories::{BaseDirs, ProjectDirs};

use crate::config::{self, ConfigError, LimitSettings};

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Parser, Debug, Default)]
#[command(name = "ttm", version, about = "TTM macro processor", long_about = None)]
pub struct Cli {
    /// Debug flags: t = trace calls, b = bare (no predefined macros),
    /// l = debug logging
    #[arg(short = 'd', value_name = "FLAGS")]
    pub debug: Vec<String>,

    /// Define NAME as VALUE before anything else runs
    #[arg(short = 'D', value_name = "NAME=VALUE", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,

    /// Evaluate TEXT (repeatable, in order)
    #[arg(short = 'e', value_name = "TEXT")]
    pub eval: Vec<String>,

    /// Program file to evaluate
    #[arg(short = 'p', value_name = "FILE")]
    pub program: Option<PathBuf>,

    /// Input file for #<rs>
    #[arg(short = 'f', short_alias = 'r', value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Directory searched by #<include> (repeatable)
    #[arg(short = 'I', value_name = "DIR")]
    pub include: Vec<PathBuf>,

    /// Write output to FILE instead of stdout
    #[arg(short = 'o', value_name = "FILE", conflicts_with = "interactive")]
    pub output: Option<PathBuf>,

    /// Read and evaluate balanced expressions from stdin
    #[arg(short = 'i')]
    pub interactive: bool,

    /// Do not print the result of the program file
    #[arg(short = 'q')]
    pub quiet: bool,

    /// Resource limit: b=buffer size, s=stack depth, x=execution count
    #[arg(short = 'X', value_name = "TAG=VALUE")]
    pub limits: Vec<String>,

    /// Arguments exposed through #<argv> and #<argc>
    #[arg(trailing_var_arg = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

/// Letters given to `-d`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugFlags {
    pub trace: bool,
    pub bare: bool,
    pub log: bool,
}

impl Cli {
    /// All `-d` letters combined; unknown letters are ignored.
    pub fn debug_flags(&self) -> DebugFlags {
        let mut flags = DebugFlags::default();
        for c in self.debug.iter().flat_map(|s| s.chars()) {
            match c {
                't' => flags.trace = true,
                'b' => flags.bare = true,
                'l' => flags.log = true,
                other => tracing::warn!(flag = %other, "unknown debug flag"),
            }
        }
        flags
    }

    /// `-X` tags; the first occurrence of each tag wins.
    pub fn limit_settings(&self) -> Result<LimitSettings, ConfigError> {
        let mut settings = LimitSettings::new();
        for spec in &self.limits {
            settings.apply_tag(spec)?;
        }
        Ok(settings)
    }

    /// `-D` definitions as passive `ds` calls.
    pub fn define_calls(&self) -> Vec<String> {
        self.defines.iter().map(|(name, value)| format!("##<ds;{name};{value}>")).collect()
    }

    /// The `argv` vector: program name then the trailing arguments.
    pub fn program_args(&self) -> Vec<String> {
        std::iter::once(env!("CARGO_PKG_NAME").to_owned()).chain(self.args.iter().cloned()).collect()
    }
}

fn parse_define(s: &str) -> Result<(String, String), String> {
    let (name, value) = s.split_once('=').unwrap_or((s, ""));
    if name.is_empty() {
        return Err(format!("missing name in '{s}'"));
    }
    Ok((name.to_owned(), value.to_owned()))
}

// ── Files ─────────────────────────────────────────────────────────────────────

/// Search for the user rc file: `$TTMRC`, then `ttm/ttmrc` in the platform
/// config directory, then `~/.ttmrc`.  Returns the first path that exists.
pub fn find_user_config() -> Option<PathBuf> {
    if let Some(p) = std::env::var_os("TTMRC") {
        return Some(PathBuf::from(p));
    }
    let project = ProjectDirs::from("", "", "ttm").map(|d| d.config_dir().join("ttmrc"));
    let home = BaseDirs::new().map(|d| d.home_dir().join(".ttmrc"));
    project.into_iter().chain(home).find(|p| p.exists())
}

/// Limits from the user rc file, if there is one.  Bad lines are logged and
/// skipped; an unreadable file is an error.
pub fn load_user_config() -> Result<LimitSettings, ConfigError> {
    let Some(path) = find_user_config() else {
        return Ok(LimitSettings::new());
    };
    let (settings, problems) = config::load_file(&path)?;
    for p in problems {
        tracing::warn!(path = %path.display(), "{p}");
    }
    tracing::debug!(path = %path.display(), ?settings, "loaded rc file");
    Ok(settings)
}

/// Read a program file, joining lines that end in `escape`.
pub fn load_program(path: &Path, escape: char) -> Result<String, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_owned(), source })?;
    Ok(join_continued_lines(&text, escape))
}

fn join_continued_lines(text: &str, escape: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == escape && chars.peek() == Some(&'\n') {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
