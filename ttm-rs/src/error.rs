//! The single fatal error raised by evaluation.
//!
//! Every failure unwinds the whole evaluation; there is no recovery inside
//! the language.  A [`TtmError`] carries the [`ErrorKind`] plus the frame
//! stack as it stood when the failure was raised, rendered one line per
//! frame, outermost first.

use thiserror::Error;

/// Fixed enumeration of failure kinds.
///
/// The numeric codes are stable and appear in fatal-error reports.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    #[error("Dictionary Name or Character Class Name Not Found")]
    NoName,
    #[error("Primitives Not Allowed")]
    NoPrimitive,
    #[error("Too Few Parameters Given")]
    FewParameters,
    #[error("Incorrect Format")]
    Format,
    #[error("Quotient Is Too Large")]
    Quotient,
    #[error("Decimal Integer Required")]
    Decimal,
    #[error("Too Many Digits")]
    ManyDigits,
    #[error("Too Many Segment Marks")]
    ManySegmentMarks,
    #[error("Dynamic Storage Overflow")]
    Memory,
    #[error("An I/O Error Occurred")]
    Io,
    #[error("Only unsigned decimal integers")]
    NotNegative,
    #[error("Stack overflow")]
    StackOverflow,
    #[error("Stack Underflow")]
    StackUnderflow,
    #[error("Buffer overflow")]
    BufferSize,
    #[error("Cannot read Include file")]
    Include,
    #[error("index out of legal range")]
    Range,
    #[error("Number of parameters greater than MAXARGS")]
    ManyParameters,
    #[error("Unexpected end of string")]
    Eos,
    #[error("ASCII characters only")]
    Ascii,
    #[error("Illegal utf-32 character set")]
    IllegalChar,
    #[error("Illegal #<ttm> command")]
    TtmCommand,
    #[error("Gettimeofday() failed")]
    Time,
    #[error("Too many executions")]
    ExecCount,
    #[error("Arithmetic error")]
    Arithmetic,
    #[error("Unknown Error")]
    Other,
}

impl ErrorKind {
    /// Numeric error code used in reports.
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::NoName => 1,
            ErrorKind::NoPrimitive => 2,
            ErrorKind::FewParameters => 3,
            ErrorKind::Format => 4,
            ErrorKind::Quotient => 5,
            ErrorKind::Decimal => 6,
            ErrorKind::ManyDigits => 7,
            ErrorKind::ManySegmentMarks => 8,
            ErrorKind::Memory => 9,
            ErrorKind::Io => 17,
            ErrorKind::NotNegative => 20,
            ErrorKind::StackOverflow => 30,
            ErrorKind::StackUnderflow => 31,
            ErrorKind::BufferSize => 32,
            ErrorKind::Include => 34,
            ErrorKind::Range => 35,
            ErrorKind::ManyParameters => 36,
            ErrorKind::Eos => 37,
            ErrorKind::Ascii => 38,
            ErrorKind::IllegalChar => 40,
            ErrorKind::TtmCommand => 41,
            ErrorKind::Time => 42,
            ErrorKind::ExecCount => 43,
            ErrorKind::Arithmetic => 44,
            ErrorKind::Other => 99,
        }
    }
}

/// A fatal evaluation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("({code}) {kind}", code = .kind.code())]
pub struct TtmError {
    pub kind: ErrorKind,
    /// Frame stack at the point of failure, outermost frame first.
    pub stack: Vec<String>,
}

impl TtmError {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, stack: Vec::new() }
    }

    /// Attach a stack dump (only the first one sticks).
    pub fn with_stack(mut self, stack: Vec<String>) -> Self {
        if self.stack.is_empty() {
            self.stack = stack;
        }
        self
    }

    /// Full multi-line report: the message followed by the stack dump.
    pub fn report(&self) -> String {
        let mut out = format!("Fatal error: {self}\n");
        out.push_str("begin stack trace:\n");
        for line in &self.stack {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("end stack trace:\n");
        out
    }
}

impl From<ErrorKind> for TtmError {
    fn from(kind: ErrorKind) -> Self {
        TtmError::new(kind)
    }
}

/// Shorthand for results in the evaluator.
pub type Result<T, E = TtmError> = std::result::Result<T, E>;

// ── Tests ─────────────────────────────────────────────────────────────────────
