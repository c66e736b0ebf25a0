//! Builtin operations.
//!
//! Every builtin is a row in [`BUILTINS`]: a name, an operation tag, an
//! arity and an effect.  The interpreter registers the whole table at start
//! up and dispatches by matching on [`BuiltinOp`] in
//! [`Interpreter::call_builtin`].
//!
//! | Family | Builtins |
//! |--------|----------|
//! | dictionary | `ap cf cr ds es sc ss` |
//! | name scanning | `cc cn cp cs eos isc rrp scn sn` |
//! | strings | `flip gn norm zlc zlcp` |
//! | classes | `ccl classes dcl dncl ecl scl tcl` |
//! | arithmetic | `abs ad dv dvr mu su` |
//! | comparison | `eq gt lt eq? gt? lt?` |
//! | peripheral | `cm pf ps psr rs` |
//! | utility | `argc argv ctime exit include lf names ndf tf time tn ttm uf xtime` |
//!
//! Arguments are passed as the frame's full argument vector, so `args[0]`
//! is the builtin's own name.  Arguments past an operation's maximum are
//! ignored; missing optional arguments read as empty strings.

use std::io;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::chars::{check_input, is_mark};
use crate::console::Stream;
use crate::error::{ErrorKind, Result, TtmError};
use crate::render::{render_output, show_marks};
use crate::script::dict::{EntryKind, NameEntry};
use crate::script::expand::{find, mark_creations, mark_segments};
use crate::script::frame::MAX_ARGS;
use crate::script::interp::Interpreter;
use crate::script::number::parse_int;

// ── Catalog ───────────────────────────────────────────────────────────────────

/// What a builtin may do to the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Mutates state only; never produces text.
    SideEffect,
    /// Produces text without side effects.
    Value,
    /// Both.
    Both,
}

impl Effect {
    pub fn side_effect_only(self) -> bool {
        self == Effect::SideEffect
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinOp {
    // dictionary
    Ap,
    Cf,
    Cr,
    Ds,
    Es,
    Sc,
    Ss,
    // name scanning
    Cc,
    Cn,
    Sn,
    Cp,
    Cs,
    Isc,
    Rrp,
    Scn,
    Eos,
    // strings
    Gn,
    Zlc,
    Zlcp,
    Flip,
    Norm,
    // classes
    Ccl,
    Dcl,
    Dncl,
    Ecl,
    Scl,
    Tcl,
    Classes,
    // arithmetic
    Abs,
    Ad,
    Dv,
    Dvr,
    Mu,
    Su,
    // comparison
    Eq,
    Gt,
    Lt,
    EqStr,
    GtStr,
    LtStr,
    // peripheral
    Cm,
    Ps,
    Psr,
    Rs,
    Pf,
    // utility
    Names,
    Exit,
    Ndf,
    Time,
    Xtime,
    Ctime,
    Tn,
    Tf,
    Argv,
    Argc,
    Include,
    Lf,
    Uf,
    Ttm,
}

/// One catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtin {
    pub name: &'static str,
    pub op: BuiltinOp,
    pub min_args: usize,
    /// [`MAX_ARGS`] stands for "any number".
    pub max_args: usize,
    pub effect: Effect,
}

const fn entry(name: &'static str, op: BuiltinOp, min_args: usize, max_args: usize, effect: Effect) -> Builtin {
    Builtin { name, op, min_args, max_args, effect }
}

const ANY: usize = MAX_ARGS;

use BuiltinOp as O;
use Effect::{Both as SV, SideEffect as S, Value as V};

pub static BUILTINS: &[Builtin] = &[
    // ── Dictionary ──
    entry("ap", O::Ap, 2, 2, S),
    entry("cf", O::Cf, 2, 2, S),
    entry("cr", O::Cr, 2, 2, S),
    entry("ds", O::Ds, 2, 2, S),
    entry("es", O::Es, 1, ANY, S),
    entry("sc", O::Sc, 2, ANY, SV),
    entry("ss", O::Ss, 2, ANY, S),
    // ── Name scanning ──
    entry("cc", O::Cc, 1, 1, SV),
    entry("cn", O::Cn, 2, 2, SV),
    entry("sn", O::Sn, 2, 2, S),
    entry("cp", O::Cp, 1, 1, SV),
    entry("cs", O::Cs, 1, 1, SV),
    entry("isc", O::Isc, 4, 4, SV),
    entry("rrp", O::Rrp, 1, 1, S),
    entry("scn", O::Scn, 3, 3, SV),
    entry("eos", O::Eos, 3, 3, V),
    // ── Strings ──
    entry("gn", O::Gn, 2, 2, V),
    entry("zlc", O::Zlc, 1, 1, V),
    entry("zlcp", O::Zlcp, 1, 1, V),
    entry("flip", O::Flip, 1, 1, V),
    entry("norm", O::Norm, 1, 1, V),
    // ── Classes ──
    entry("ccl", O::Ccl, 2, 2, SV),
    entry("dcl", O::Dcl, 2, 2, S),
    entry("dncl", O::Dncl, 2, 2, S),
    entry("ecl", O::Ecl, 1, ANY, S),
    entry("scl", O::Scl, 2, 2, S),
    entry("tcl", O::Tcl, 4, 4, V),
    entry("classes", O::Classes, 0, 0, V),
    // ── Arithmetic ──
    entry("abs", O::Abs, 1, 1, V),
    entry("ad", O::Ad, 2, ANY, V),
    entry("dv", O::Dv, 2, 2, V),
    entry("dvr", O::Dvr, 2, 2, V),
    entry("mu", O::Mu, 2, ANY, V),
    entry("su", O::Su, 2, 2, V),
    // ── Comparison ──
    entry("eq", O::Eq, 4, 4, V),
    entry("gt", O::Gt, 4, 4, V),
    entry("lt", O::Lt, 4, 4, V),
    entry("eq?", O::EqStr, 4, 4, V),
    entry("gt?", O::GtStr, 4, 4, V),
    entry("lt?", O::LtStr, 4, 4, V),
    // ── Peripheral ──
    entry("cm", O::Cm, 1, 1, S),
    entry("ps", O::Ps, 1, 2, S),
    entry("psr", O::Psr, 1, 1, SV),
    entry("rs", O::Rs, 0, 0, V),
    entry("pf", O::Pf, 0, 1, S),
    // ── Utility ──
    entry("names", O::Names, 0, 1, V),
    entry("exit", O::Exit, 0, 1, S),
    entry("ndf", O::Ndf, 3, 3, V),
    entry("time", O::Time, 0, 0, V),
    entry("xtime", O::Xtime, 0, 0, V),
    entry("ctime", O::Ctime, 1, 1, V),
    entry("tn", O::Tn, 0, ANY, S),
    entry("tf", O::Tf, 0, ANY, S),
    entry("argv", O::Argv, 1, 1, V),
    entry("argc", O::Argc, 0, 0, V),
    entry("include", O::Include, 1, 1, V),
    entry("lf", O::Lf, 0, ANY, S),
    entry("uf", O::Uf, 0, ANY, S),
    entry("ttm", O::Ttm, 1, ANY, SV),
];

pub fn lookup_builtin(name: &str) -> Option<Builtin> {
    BUILTINS.iter().find(|b| b.name == name).copied()
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

impl Interpreter {
    /// Run builtin `b` against a frame's argument vector.
    ///
    /// Side-effect-only builtins return an empty string, which the caller
    /// discards.
    pub(crate) fn call_builtin(&mut self, b: Builtin, args: &[String]) -> Result<String> {
        tracing::trace!(builtin = b.name, argc = args.len(), "dispatch");
        let mut out = String::new();
        match b.op {
            // ── Dictionary ───────────────────────────────────────────────────
            O::Ds => self.dict.define(arg(args, 1), arg(args, 2)),
            O::Ap => {
                let name = arg(args, 1);
                if self.dict.contains(name) {
                    let body = self.dict.macro_mut(name)?;
                    body.text.extend(arg(args, 2).chars());
                    body.residual = body.text.len();
                } else {
                    self.dict.define(name, arg(args, 2));
                }
            }
            O::Cf => {
                let kind = self.dict.get(arg(args, 2)).ok_or(ErrorKind::NoName)?.kind.clone();
                match self.dict.get_mut(arg(args, 1)) {
                    Some(existing) => existing.kind = kind,
                    None => self.dict.insert(arg(args, 1), NameEntry { kind, locked: false, trace: false }),
                }
            }
            O::Es => {
                for name in &args[1..] {
                    if !self.dict.erase(name) {
                        tracing::debug!(name = %name, "es: not erased");
                    }
                }
            }
            O::Ss | O::Sc => {
                let body = self.dict.macro_mut(arg(args, 1))?;
                let count = mark_segments(body, &args[2..])?;
                if b.op == O::Sc {
                    out = count.to_string();
                }
            }
            O::Cr => mark_creations(self.dict.macro_mut(arg(args, 1))?, arg(args, 2)),

            // ── Name scanning ────────────────────────────────────────────────
            O::Cc => out = self.dict.macro_mut(arg(args, 1))?.take(1),
            O::Cn => {
                let n = parse_int(arg(args, 1))?;
                let body = self.dict.macro_mut(arg(args, 2))?;
                if n >= 0 {
                    out = body.take(to_count(n));
                } else {
                    // count back from the end of the body
                    let m = to_count(n).min(body.rest().len());
                    let end = body.text.len();
                    out = body.text[end - m..].iter().collect();
                    body.advance(m);
                }
            }
            O::Sn => {
                let n = parse_int(arg(args, 1))?;
                if n < 0 {
                    return Err(ErrorKind::NotNegative.into());
                }
                self.dict.macro_mut(arg(args, 2))?.advance(to_count(n));
            }
            O::Cp => {
                let syn = self.syntax;
                let body = self.dict.macro_mut(arg(args, 1))?;
                let mut depth = 0i64;
                let mut end = body.residual;
                while let Some(&c) = body.text.get(end) {
                    if c == syn.semi && depth == 0 {
                        break;
                    } else if c == syn.open {
                        depth += 1;
                    } else if c == syn.close {
                        depth -= 1;
                    }
                    end += 1;
                }
                out = body.take(end - body.residual);
                body.advance(1);
            }
            O::Cs => {
                let body = self.dict.macro_mut(arg(args, 1))?;
                let n = body.rest().iter().take_while(|&&c| !is_mark(c)).count();
                out = body.take(n);
                body.advance(1);
            }
            O::Isc => {
                let prefix: Vec<char> = arg(args, 1).chars().collect();
                let body = self.dict.macro_mut(arg(args, 2))?;
                if body.rest().starts_with(&prefix) {
                    body.advance(prefix.len());
                    out = arg(args, 3).to_owned();
                } else {
                    out = arg(args, 4).to_owned();
                }
            }
            O::Rrp => self.dict.macro_mut(arg(args, 1))?.residual = 0,
            O::Scn => {
                let needle: Vec<char> = arg(args, 1).chars().collect();
                let body = self.dict.macro_mut(arg(args, 2))?;
                if needle.is_empty() {
                    return Ok(out);
                }
                match find(&body.text, &needle, body.residual) {
                    Some(pos) => {
                        out = body.take(pos - body.residual);
                        body.advance(needle.len());
                    }
                    None => out = arg(args, 3).to_owned(),
                }
            }
            O::Eos => {
                let body = self.dict.macro_mut(arg(args, 1))?;
                out = pick(body.at_end(), args, 2).to_owned();
            }

            // ── Strings ──────────────────────────────────────────────────────
            O::Gn => {
                let n = parse_int(arg(args, 1))?;
                let s = arg(args, 2).chars();
                out = if n >= 0 { s.take(to_count(n)).collect() } else { s.skip(to_count(n)).collect() };
            }
            O::Zlc => out = zero_level_commas(arg(args, 1), self.syntax.escape, self.syntax.semi),
            O::Zlcp => out = zero_level_parens(arg(args, 1), self.syntax.escape, self.syntax.semi),
            O::Flip => out = arg(args, 1).chars().rev().collect(),
            O::Norm => out = arg(args, 1).chars().count().to_string(),

            // ── Classes ──────────────────────────────────────────────────────
            O::Dcl => self.classes.define(arg(args, 1), arg(args, 2), false),
            O::Dncl => self.classes.define(arg(args, 1), arg(args, 2), true),
            O::Ecl => {
                for name in &args[1..] {
                    self.classes.erase(name);
                }
            }
            O::Ccl | O::Scl => {
                let class = self.classes.get(arg(args, 1)).ok_or(ErrorKind::NoName)?;
                let body = self.dict.macro_mut(arg(args, 2))?;
                let run = body.take(class.span(body.rest()));
                if b.op == O::Ccl {
                    out = run;
                }
            }
            O::Tcl => {
                let class = self.classes.get(arg(args, 1)).ok_or(ErrorKind::NoName)?;
                let hit = match self.dict.get(arg(args, 2)) {
                    None => false,
                    Some(NameEntry { kind: EntryKind::Builtin(_), .. }) => {
                        return Err(ErrorKind::NoPrimitive.into());
                    }
                    Some(NameEntry { kind: EntryKind::Macro(body), .. }) => {
                        body.rest().first().is_some_and(|&c| class.matches(c))
                    }
                };
                out = pick(hit, args, 3).to_owned();
            }
            O::Classes => out = self.classes.names().join(","),

            // ── Arithmetic ───────────────────────────────────────────────────
            O::Abs => out = parse_int(arg(args, 1))?.checked_abs().ok_or(ErrorKind::Arithmetic)?.to_string(),
            O::Ad => out = fold_ints(&args[1..], i64::checked_add)?.to_string(),
            O::Mu => out = fold_ints(&args[1..], i64::checked_mul)?.to_string(),
            O::Su => out = fold_ints(&args[1..3], i64::checked_sub)?.to_string(),
            O::Dv => out = fold_ints(&args[1..3], i64::checked_div)?.to_string(),
            O::Dvr => out = fold_ints(&args[1..3], i64::checked_rem)?.to_string(),

            // ── Comparison ───────────────────────────────────────────────────
            O::Eq | O::Gt | O::Lt => {
                let (l, r) = (parse_int(arg(args, 1))?, parse_int(arg(args, 2))?);
                let hit = match b.op {
                    O::Eq => l == r,
                    O::Gt => l > r,
                    _ => l < r,
                };
                out = pick(hit, args, 3).to_owned();
            }
            O::EqStr | O::GtStr | O::LtStr => {
                // byte order of UTF-8 is code point order
                let (l, r) = (arg(args, 1), arg(args, 2));
                let hit = match b.op {
                    O::EqStr => l == r,
                    O::GtStr => l > r,
                    _ => l < r,
                };
                out = pick(hit, args, 3).to_owned();
            }

            // ── Peripheral ───────────────────────────────────────────────────
            O::Cm => {
                if let Some(c) = arg(args, 1).chars().next() {
                    if !c.is_ascii() {
                        return Err(ErrorKind::Ascii.into());
                    }
                    self.syntax.meta = c;
                }
            }
            O::Ps => {
                let stream = if arg(args, 2) == "stderr" { Stream::Stderr } else { Stream::Stdout };
                self.print(stream, arg(args, 1))?;
            }
            O::Rs => out = self.read_string()?,
            O::Psr => {
                self.print(Stream::Stdout, arg(args, 1))?;
                out = self.read_string()?;
            }
            O::Pf => {
                let streams: &[Stream] = match arg(args, 1) {
                    "stdout" => &[Stream::Stdout],
                    "stderr" => &[Stream::Stderr],
                    _ => &[Stream::Stdout, Stream::Stderr],
                };
                for &s in streams {
                    self.console.flush(s).map_err(io_error)?;
                }
            }

            // ── Utility ──────────────────────────────────────────────────────
            O::Names => out = self.dict.names(args.len() > 1).join(","),
            O::Ndf => out = pick(self.dict.contains(arg(args, 1)), args, 2).to_owned(),
            O::Exit => {
                let code = match args.get(1) {
                    None => 0,
                    Some(s) => parse_int(s).map_or(1, |n| i32::try_from(n.unsigned_abs()).unwrap_or(i32::MAX)),
                };
                tracing::debug!(code, "exit requested");
                self.exiting = true;
                self.exit_code = code;
            }
            O::Time => {
                let since = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|_| ErrorKind::Time)?;
                out = (since.as_millis() / 10).to_string();
            }
            O::Xtime => out = (self.started.elapsed().as_millis() / 10).to_string(),
            O::Ctime => out = format_ctime(parse_int(arg(args, 1))? / 100)?,
            O::Tn | O::Tf => {
                let on = b.op == O::Tn;
                if args.len() <= 1 {
                    self.trace_all = on;
                    if !on {
                        for (_, e) in self.dict.iter_mut() {
                            e.trace = false;
                        }
                    }
                } else {
                    for name in &args[1..] {
                        self.dict.entry_mut(name)?.trace = on;
                    }
                }
            }
            O::Lf | O::Uf => {
                for name in &args[1..] {
                    self.dict.entry_mut(name)?.locked = b.op == O::Lf;
                }
            }
            O::Argv => {
                let i = parse_int(arg(args, 1))?;
                let value = usize::try_from(i).ok().and_then(|i| self.program_args.get(i));
                out = value.ok_or(ErrorKind::Range)?.clone();
            }
            O::Argc => out = self.program_args.len().to_string(),
            O::Include => out = self.include(arg(args, 1))?,
            O::Ttm => out = self.ttm_command(args)?,
        }
        Ok(out)
    }

    fn print(&mut self, stream: Stream, text: &str) -> Result<()> {
        let rendered = render_output(text, self.syntax.escape, false);
        self.console.write(stream, &rendered).map_err(io_error)
    }

    fn read_string(&mut self) -> Result<String> {
        let s = self.console.read_until(self.syntax.meta).map_err(io_error)?;
        check_input(&s)?;
        Ok(s)
    }

    fn include(&mut self, path: &str) -> Result<String> {
        if path.is_empty() {
            return Err(ErrorKind::Include.into());
        }
        let candidates = std::iter::once(PathBuf::from(path))
            .chain(self.include_dirs.iter().map(|d| d.join(path.trim_start_matches('/'))));
        for candidate in candidates {
            match std::fs::read_to_string(&candidate) {
                Ok(text) => {
                    tracing::debug!(path = %candidate.display(), "include");
                    check_input(&text)?;
                    return Ok(text);
                }
                Err(e) => tracing::trace!(path = %candidate.display(), error = %e, "include candidate"),
            }
        }
        Err(ErrorKind::Include.into())
    }

    /// `#<ttm;meta;...>`, `#<ttm;info;name;...>`, `#<ttm;info;class;...>`.
    fn ttm_command(&mut self, args: &[String]) -> Result<String> {
        match (arg(args, 1), arg(args, 2)) {
            ("meta", spec) => {
                if !self.syntax.set_meta(spec) {
                    return Err(ErrorKind::TtmCommand.into());
                }
                Ok(String::new())
            }
            ("info", "name") => Ok(args.get(3..).unwrap_or_default().iter().map(|n| self.describe_name(n)).collect()),
            ("info", "class") => {
                let mut out = String::new();
                for name in args.get(3..).unwrap_or_default() {
                    let class = self.classes.get(name).ok_or(ErrorKind::NoName)?;
                    out.push_str(name);
                    out.push_str(" [");
                    if class.negative {
                        out.push('^');
                    }
                    for c in class.characters.chars() {
                        if c == '[' || c == ']' {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                    out.push_str("]\n");
                }
                Ok(out)
            }
            _ => Err(ErrorKind::TtmCommand.into()),
        }
    }

    fn describe_name(&self, name: &str) -> String {
        match self.dict.get(name).map(|e| &e.kind) {
            None => format!("{name}-,-,-\n"),
            Some(EntryKind::Builtin(b)) => {
                let max = if b.max_args == ANY { "*".to_owned() } else { b.max_args.to_string() };
                let kind = if b.effect.side_effect_only() { 'S' } else { 'V' };
                format!("{name},{},{max},{kind}\n", b.min_args)
            }
            Some(EntryKind::Macro(body)) => {
                let text = show_marks(&body.text_string());
                format!("{name},0,{},V residual={} body=|{text}|\n", body.maxsegmark, body.residual)
            }
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn arg(args: &[String], i: usize) -> &str {
    args.get(i).map_or("", String::as_str)
}

/// `args[i]` when `cond` holds, `args[i + 1]` otherwise.
fn pick(cond: bool, args: &[String], i: usize) -> &str {
    arg(args, if cond { i } else { i + 1 })
}

/// `|n|` as a count, saturating on targets where it does not fit.
fn to_count(n: i64) -> usize {
    usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX)
}

fn fold_ints(args: &[String], op: fn(i64, i64) -> Option<i64>) -> Result<i64> {
    let mut values = args.iter().map(|s| parse_int(s));
    let first = values.next().ok_or(ErrorKind::FewParameters)??;
    values.try_fold(first, |acc, v| op(acc, v?).ok_or_else(|| ErrorKind::Arithmetic.into()))
}

fn io_error(e: io::Error) -> TtmError {
    tracing::debug!(error = %e, "console i/o failed");
    ErrorKind::Io.into()
}

/// Commas at parenthesis depth 0 become `semi`.
fn zero_level_commas(s: &str, escape: char, semi: char) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0i64;
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == escape {
            out.push(c);
            out.extend(chars.next());
        } else if c == ',' && depth == 0 {
            out.push(semi);
        } else {
            if c == '(' {
                depth += 1;
            } else if c == ')' {
                depth -= 1;
            }
            out.push(c);
        }
    }
    out
}

/// Like [`zero_level_commas`], and depth-0 parentheses act as separators:
/// `A(B)` and `A,B` both give `A;B`, `(A),(B),C` gives `A;B;C`.
fn zero_level_parens(s: &str, escape: char, semi: char) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut depth = 0i64;
    let mut p = 0;
    while p < chars.len() {
        let c = chars[p];
        let next = chars.get(p + 1).copied();
        if c == escape {
            out.push(c);
            out.extend(next);
            p += 1;
        } else if c == ',' && depth == 0 {
            if next != Some('(') {
                out.push(semi);
            }
        } else if c == '(' {
            if depth == 0 && p > 0 {
                out.push(semi);
            }
            if depth > 0 {
                out.push(c);
            }
            depth += 1;
        } else if c == ')' {
            depth -= 1;
            if depth == 0 {
                if next.is_some() && next != Some(',') {
                    out.push(semi);
                }
            } else {
                out.push(c);
            }
        } else {
            out.push(c);
        }
        p += 1;
    }
    out
}

/// `ctime(3)` rendering of `secs` in local time, without the newline.
fn format_ctime(secs: i64) -> Result<String> {
    let t = libc::time_t::try_from(secs).map_err(|_| ErrorKind::Time)?;
    let mut buf = [0 as libc::c_char; 64];
    // SAFETY: ctime_r writes at most 26 bytes plus NUL into `buf`.
    let p = unsafe { libc::ctime_r(&t, buf.as_mut_ptr()) };
    if p.is_null() {
        return Err(ErrorKind::Time.into());
    }
    // SAFETY: on success `buf` holds a NUL-terminated string.
    let s = unsafe { std::ffi::CStr::from_ptr(buf.as_ptr()) };
    Ok(s.to_string_lossy().trim_end_matches('\n').to_owned())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
