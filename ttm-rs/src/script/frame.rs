//! Call frames and the bounded frame stack.

use crate::error::{ErrorKind, Result};
use crate::render::debug_string;
use crate::script::syntax::Syntax;

/// Highest number of arguments (including the name) a call may carry.
pub const MAX_ARGS: usize = 63;

/// One in-flight call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// `args[0]` is the function name.
    pub args: Vec<String>,
    /// `#<...>` (rescan the result) versus `##<...>` (append it passively).
    pub active: bool,
    /// Result accumulator; absent for side-effect-only calls.
    pub result: Option<String>,
}

impl Frame {
    pub fn new(active: bool) -> Self {
        Self { args: Vec::new(), active, result: None }
    }

    pub fn argc(&self) -> usize {
        self.args.len()
    }

    pub fn name(&self) -> &str {
        self.args.first().map_or("", String::as_str)
    }

    /// `#<name;arg;...>`, or just `#<name>` when `with_args` is unset.
    pub fn describe(&self, syntax: &Syntax, with_args: bool) -> String {
        if self.args.is_empty() {
            return format!("{}<empty frame>", syntax.sharp);
        }
        let mut s = String::new();
        s.push(syntax.sharp);
        if !self.active {
            s.push(syntax.sharp);
        }
        s.push(syntax.open);
        s.push_str(&debug_string(&self.args[0], syntax.escape, None));
        if with_args {
            for a in &self.args[1..] {
                s.push(syntax.semi);
                s.push_str(&debug_string(a, syntax.escape, None));
            }
        }
        s.push(syntax.close);
        s
    }
}

/// LIFO of frames with a depth limit.
#[derive(Debug, Default)]
pub struct FrameStack {
    frames: Vec<Frame>,
    limit: usize,
}

impl FrameStack {
    pub fn new(limit: usize) -> Self {
        Self { frames: Vec::new(), limit }
    }

    /// Push a frame and return its index.
    pub fn push(&mut self, frame: Frame) -> Result<usize> {
        if self.frames.len() >= self.limit {
            return Err(ErrorKind::StackOverflow.into());
        }
        self.frames.push(frame);
        Ok(self.frames.len() - 1)
    }

    pub fn pop(&mut self) -> Result<Frame> {
        self.frames.pop().ok_or_else(|| ErrorKind::StackUnderflow.into())
    }

    pub fn get(&self, idx: usize) -> Option<&Frame> {
        self.frames.get(idx)
    }

    /// Frame at `idx`, which must have been returned by [`FrameStack::push`]
    /// and not yet popped.
    pub fn at_mut(&mut self, idx: usize) -> Result<&mut Frame> {
        self.frames.get_mut(idx).ok_or_else(|| ErrorKind::StackUnderflow.into())
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// One `[NN] #<name;args>` line per frame, outermost first.
    pub fn dump(&self, syntax: &Syntax) -> Vec<String> {
        self.frames
            .iter()
            .enumerate()
            .map(|(i, f)| format!("[{i:02}] {}", f.describe(syntax, true)))
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
