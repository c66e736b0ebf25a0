//! The evaluator.
//!
//! [`Interpreter`] owns every piece of mutable state (dictionary, classes,
//! frame stack, active buffer, limits, syntax characters) and evaluates
//! text by scanning it left to right:
//!
//! | Input at the cursor | Action |
//! |---------------------|--------|
//! | escape *x* | copy *x* |
//! | `#<` / `##<` | parse and execute a call |
//! | `<` | copy a literal span, outer brackets removed |
//! | anything else | copy |
//!
//! An active call's result is inserted at the cursor and rescanned; a
//! passive call's result is copied straight to the output.  Calls nested in
//! an argument are executed while the argument is being collected.

use std::path::PathBuf;
use std::time::Instant;

use crate::chars::check_input;
use crate::config::Limits;
use crate::console::{Console, StdConsole, Stream};
use crate::error::{ErrorKind, Result};
use crate::render::{debug_string, render_output};
use crate::script::buffer::ActiveBuffer;
use crate::script::builtins::BUILTINS;
use crate::script::charclass::ClassTable;
use crate::script::dict::{Dictionary, EntryKind, NameEntry};
use crate::script::expand::substitute;
use crate::script::frame::{Frame, FrameStack, MAX_ARGS};
use crate::script::syntax::Syntax;

/// Definitions evaluated at start-up unless the interpreter is bare.
const PRELUDE: &[&str] = &[
    "#<ds;comment;>",
    "#<ds;def;<##<ds;name;<text>>##<ss;name;subs>>>#<ss;def;name;subs;text>",
];

pub struct Interpreter {
    pub(crate) dict: Dictionary,
    pub(crate) classes: ClassTable,
    pub(crate) syntax: Syntax,
    pub(crate) console: Box<dyn Console>,
    pub(crate) program_args: Vec<String>,
    pub(crate) include_dirs: Vec<PathBuf>,
    pub(crate) trace_all: bool,
    pub(crate) exiting: bool,
    pub(crate) exit_code: i32,
    pub(crate) started: Instant,
    stack: FrameStack,
    buffer: ActiveBuffer,
    limits: Limits,
    /// Calls still allowed in this interpreter's lifetime.
    exec_budget: u64,
    /// Last creation token handed out.
    crcounter: u64,
}

impl Interpreter {
    /// An interpreter with default limits and the prelude loaded.
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    /// Evaluation recurses once per nested frame, so the calling thread
    /// should have [`Limits::native_stack_bytes`] of stack.
    pub fn with_limits(limits: Limits) -> Self {
        let mut interp = Self::unlocked(limits);
        for src in PRELUDE {
            if let Err(e) = interp.run(src) {
                // only reachable with a broken prelude
                tracing::error!(error = %e, "prelude failed");
            }
        }
        interp.dict.lock_all();
        interp
    }

    /// An interpreter with only the builtins defined.
    pub fn bare(limits: Limits) -> Self {
        let mut interp = Self::unlocked(limits);
        interp.dict.lock_all();
        interp
    }

    fn unlocked(limits: Limits) -> Self {
        let limits = limits.clamped();
        let mut dict = Dictionary::new();
        for b in BUILTINS {
            dict.insert(b.name, NameEntry::builtin(*b));
        }
        tracing::debug!(builtins = dict.len(), ?limits, "interpreter created");
        Self {
            dict,
            classes: ClassTable::new(),
            syntax: Syntax::new(),
            console: Box::new(StdConsole::new()),
            program_args: Vec::new(),
            include_dirs: Vec::new(),
            trace_all: false,
            exiting: false,
            exit_code: 0,
            started: Instant::now(),
            stack: FrameStack::new(limits.stacksize),
            buffer: ActiveBuffer::new(limits.buffersize),
            exec_budget: limits.execcount,
            crcounter: 0,
            limits,
        }
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    pub fn set_console(&mut self, console: Box<dyn Console>) {
        self.console = console;
    }

    /// The vector exposed by `argv`/`argc`; element 0 is the program name.
    pub fn set_program_args(&mut self, args: Vec<String>) {
        self.program_args = args;
    }

    pub fn add_include_dir(&mut self, dir: impl Into<PathBuf>) {
        self.include_dirs.push(dir.into());
    }

    pub fn set_trace(&mut self, on: bool) {
        self.trace_all = on;
    }

    /// Print a top-level result on the console's output stream.  Marks
    /// and escapes are rendered; control characters are kept.
    pub fn emit(&mut self, text: &str) -> Result<()> {
        let rendered = render_output(text, self.syntax.escape, true);
        self.console
            .write(Stream::Stdout, &rendered)
            .and_then(|()| self.console.flush(Stream::Stdout))
            .map_err(|e| {
                tracing::debug!(error = %e, "output failed");
                ErrorKind::Io.into()
            })
    }

    // ── State ─────────────────────────────────────────────────────────────────

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    pub fn lookup(&self, name: &str) -> Option<&NameEntry> {
        self.dict.get(name)
    }

    /// Set once `#<exit>` has run; stays set.
    pub fn exiting(&self) -> bool {
        self.exiting
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Current frame-stack depth (zero between evaluations).
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    // ── Evaluation ────────────────────────────────────────────────────────────

    /// Evaluate `text` and return its passive output.
    ///
    /// On failure the error carries a dump of the frames that were live,
    /// and the interpreter is left ready for the next evaluation.
    pub fn eval(&mut self, text: &str) -> Result<String> {
        check_input(text)?;
        self.run(text)
    }

    fn run(&mut self, text: &str) -> Result<String> {
        self.buffer.load(text)?;
        let result = self.scan();
        self.buffer.clear();
        result.map_err(|e| {
            let e = e.with_stack(self.stack.dump(&self.syntax));
            tracing::debug!(error = %e, depth = self.stack.depth(), "evaluation failed");
            self.stack.clear();
            e
        })
    }

    /// `#<` or `##<` at the cursor.
    fn at_call(&self) -> bool {
        let syn = &self.syntax;
        let b = &self.buffer;
        b.peek() == Some(syn.sharp)
            && (b.peek_at(1) == Some(syn.open)
                || (b.peek_at(1) == Some(syn.sharp) && b.peek_at(2) == Some(syn.open)))
    }

    fn scan(&mut self) -> Result<String> {
        let mut passive = String::new();
        while let Some(c) = self.buffer.peek() {
            let syn = self.syntax;
            if c == syn.escape {
                self.buffer.skip(1);
                passive.extend(self.buffer.next_char());
            } else if c == syn.sharp && self.at_call() {
                self.exec(&mut passive)?;
                if self.exiting {
                    break;
                }
            } else if c == syn.open {
                self.buffer.skip(1);
                self.copy_literal(&mut passive)?;
            } else {
                passive.push(c);
                self.buffer.skip(1);
            }
        }
        Ok(passive)
    }

    /// Copy a literal span whose opener has been consumed.  Inner brackets
    /// and escapes are kept; the closing bracket is dropped.
    fn copy_literal(&mut self, out: &mut String) -> Result<()> {
        let mut depth = 1usize;
        loop {
            let c = self.buffer.next_char().ok_or(ErrorKind::Eos)?;
            let syn = self.syntax;
            if c == syn.escape {
                out.push(c);
                out.push(self.buffer.next_char().ok_or(ErrorKind::Eos)?);
            } else if c == syn.open {
                depth += 1;
                out.push(c);
            } else if c == syn.close {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
                out.push(c);
            } else {
                out.push(c);
            }
        }
    }

    /// Collect the arguments of the call in frame `idx`, up to and
    /// including its closing bracket.
    fn parse_call(&mut self, idx: usize) -> Result<()> {
        let mut arg = String::new();
        loop {
            let c = self.buffer.peek().ok_or(ErrorKind::Eos)?;
            let syn = self.syntax;
            if c == syn.escape {
                self.buffer.skip(1);
                arg.push(self.buffer.next_char().ok_or(ErrorKind::Eos)?);
            } else if c == syn.semi || c == syn.close {
                self.buffer.skip(1);
                let frame = self.stack.at_mut(idx)?;
                frame.args.push(std::mem::take(&mut arg));
                if c == syn.close {
                    return Ok(());
                }
                if frame.argc() >= MAX_ARGS {
                    return Err(ErrorKind::ManyParameters.into());
                }
            } else if c == syn.sharp && self.at_call() {
                self.exec(&mut arg)?;
                if self.exiting {
                    return Ok(());
                }
            } else if c == syn.open {
                self.buffer.skip(1);
                self.copy_literal(&mut arg)?;
            } else {
                arg.push(c);
                self.buffer.skip(1);
            }
        }
    }

    /// Execute the call at the cursor.  A passive result is appended to
    /// `passive`; an active one is inserted into the buffer.
    fn exec(&mut self, passive: &mut String) -> Result<()> {
        if self.exec_budget == 0 {
            return Err(ErrorKind::ExecCount.into());
        }
        self.exec_budget -= 1;

        let active = self.buffer.peek_at(1) == Some(self.syntax.open);
        let idx = self.stack.push(Frame::new(active))?;
        self.buffer.skip(if active { 2 } else { 3 });

        self.parse_call(idx)?;
        if self.exiting {
            self.stack.pop()?;
            return Ok(());
        }

        let frame = self.stack.at_mut(idx)?;
        let name = frame.name().to_owned();
        if name.is_empty() {
            return Err(ErrorKind::NoName.into());
        }
        let entry = self.dict.get(&name).ok_or(ErrorKind::NoName)?;
        if entry.min_args() + 1 > frame.argc() {
            return Err(ErrorKind::FewParameters.into());
        }
        let side_effect_only = entry.is_side_effect_only();
        let traced = self.trace_all || entry.trace;
        let builtin = match &entry.kind {
            EntryKind::Builtin(b) => Some(*b),
            EntryKind::Macro(_) => None,
        };
        tracing::trace!(depth = idx, name = %name, active, "exec");

        if traced {
            self.trace_line(idx, true)?;
        }

        let result = match builtin {
            Some(b) => {
                let args = std::mem::take(&mut self.stack.at_mut(idx)?.args);
                let r = self.call_builtin(b, &args);
                self.stack.at_mut(idx)?.args = args;
                r?
            }
            None => self.call_macro(idx, &name)?,
        };
        if self.exiting {
            self.stack.pop()?;
            return Ok(());
        }

        if !side_effect_only {
            self.stack.at_mut(idx)?.result = Some(result);
        }
        if traced {
            self.trace_line(idx, false)?;
        }

        let frame = self.stack.pop()?;
        if let Some(result) = frame.result {
            self.check_room(passive, &result)?;
            if frame.active {
                self.buffer.insert(&result)?;
            } else {
                passive.push_str(&result);
            }
        }
        Ok(())
    }

    /// Text held in an accumulator shares `buffersize` with the unread
    /// buffer.
    fn check_room(&self, held: &str, adding: &str) -> Result<()> {
        let limit = self.limits.buffersize;
        let live = self.buffer.live();
        // byte lengths bound character counts from above
        if held.len() + adding.len() + live <= limit {
            return Ok(());
        }
        if held.chars().count() + adding.chars().count() + live > limit {
            tracing::debug!(limit, live, "buffer overflow");
            return Err(ErrorKind::BufferSize.into());
        }
        Ok(())
    }

    fn call_macro(&mut self, idx: usize, name: &str) -> Result<String> {
        let Some(NameEntry { kind: EntryKind::Macro(body), .. }) = self.dict.get(name) else {
            return Err(ErrorKind::NoName.into());
        };
        let frame = self.stack.get(idx).ok_or(ErrorKind::StackUnderflow)?;
        let crcounter = &mut self.crcounter;
        Ok(substitute(&body.text, &frame.args, || {
            *crcounter += 1;
            *crcounter
        }))
    }

    /// `[NN] begin: #<name;args>` or `[NN] end: #<name> => "result"` on the
    /// console's diagnostic stream.
    fn trace_line(&mut self, idx: usize, entering: bool) -> Result<()> {
        let frame = self.stack.get(idx).ok_or(ErrorKind::StackUnderflow)?;
        let line = if entering {
            format!("[{idx:02}] begin: {}", frame.describe(&self.syntax, true))
        } else {
            let mut s = format!("[{idx:02}] end: {}", frame.describe(&self.syntax, false));
            if let Some(result) = &frame.result {
                s.push_str(&format!(" => \"{}\"", debug_string(result, self.syntax.escape, Some('"'))));
            }
            s
        };
        tracing::trace!(target: "ttm::trace", "{line}");
        self.console.write(Stream::Stderr, &format!("{line}\n")).map_err(|e| {
            tracing::debug!(error = %e, "trace write failed");
            ErrorKind::Io.into()
        })
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
