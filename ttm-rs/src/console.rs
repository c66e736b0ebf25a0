//! I/O collaborator used by the peripheral builtins.
//!
//! The interpreter never touches stdin/stdout directly; `ps`, `rs`, `pf`
//! and execution traces go through a [`Console`].  [`StdConsole`] is the
//! process console (optionally redirected to files); [`MemoryConsole`]
//! captures everything in memory and is what embedders and tests use.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// Output stream selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

pub trait Console {
    fn write(&mut self, stream: Stream, text: &str) -> io::Result<()>;

    fn flush(&mut self, stream: Stream) -> io::Result<()>;

    /// Next input character for `rs`, `None` at end of input.
    fn read_char(&mut self) -> io::Result<Option<char>>;

    /// Read up to (not including) `meta`, or to end of input.
    fn read_until(&mut self, meta: char) -> io::Result<String> {
        let mut s = String::new();
        while let Some(c) = self.read_char()? {
            if c == meta {
                break;
            }
            s.push(c);
        }
        Ok(s)
    }
}

// ── Character input ───────────────────────────────────────────────────────────

/// Decode one UTF-8 character from a buffered reader.
pub fn read_char<R: BufRead + ?Sized>(r: &mut R) -> io::Result<Option<char>> {
    let mut first = [0u8; 1];
    if r.read(&mut first)? == 0 {
        return Ok(None);
    }
    let width = match first[0] {
        b if b < 0x80 => 1,
        b if b >> 5 == 0b110 => 2,
        b if b >> 4 == 0b1110 => 3,
        b if b >> 3 == 0b11110 => 4,
        _ => return Err(io::Error::new(io::ErrorKind::InvalidData, "invalid utf-8 lead byte")),
    };
    let mut bytes = [first[0], 0, 0, 0];
    r.read_exact(&mut bytes[1..width])?;
    std::str::from_utf8(&bytes[..width])
        .map(|s| s.chars().next())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Read one top-level expression for interactive evaluation.
///
/// Characters are collected until bracket nesting (`open`/`close`) returns
/// to zero, or until a newline arrives with nothing open.  An `escape` takes
/// the following character with it.  The rest of the current line is then
/// discarded.  Returns `None` once input is exhausted with nothing read.
pub fn read_balanced<R: BufRead + ?Sized>(
    r: &mut R,
    open: char,
    close: char,
    escape: char,
) -> io::Result<Option<String>> {
    let mut text = String::new();
    let mut depth = 0usize;
    let mut last = None;

    while let Some(c) = read_char(r)? {
        last = Some(c);
        if c == escape {
            text.push(c);
            if let Some(next) = read_char(r)? {
                text.push(next);
                last = Some(next);
            }
            continue;
        }
        if c == '\n' && depth == 0 {
            break;
        }
        text.push(c);
        if c == open {
            depth += 1;
        } else if c == close && depth > 0 {
            depth -= 1;
            if depth == 0 {
                // discard the rest of the line
                while let Some(c) = read_char(r)? {
                    last = Some(c);
                    if c == '\n' {
                        break;
                    }
                }
                break;
            }
        }
    }

    if text.is_empty() && last.is_none() {
        return Ok(None);
    }
    Ok(Some(text))
}

// ── Process console ───────────────────────────────────────────────────────────

/// Console backed by the process streams.
///
/// Output goes to stdout unless redirected with [`StdConsole::with_output`];
/// `rs` reads stdin unless given a reader with [`StdConsole::with_input`].
pub struct StdConsole {
    output: Option<Box<dyn Write>>,
    input: Option<Box<dyn BufRead>>,
}

impl StdConsole {
    pub fn new() -> Self {
        Self { output: None, input: None }
    }

    pub fn with_output(mut self, w: Box<dyn Write>) -> Self {
        self.output = Some(w);
        self
    }

    pub fn with_input(mut self, r: Box<dyn BufRead>) -> Self {
        self.input = Some(r);
        self
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for StdConsole {
    fn write(&mut self, stream: Stream, text: &str) -> io::Result<()> {
        match (stream, self.output.as_mut()) {
            (Stream::Stdout, Some(w)) => w.write_all(text.as_bytes()),
            (Stream::Stdout, None) => io::stdout().lock().write_all(text.as_bytes()),
            (Stream::Stderr, _) => io::stderr().lock().write_all(text.as_bytes()),
        }
    }

    fn flush(&mut self, stream: Stream) -> io::Result<()> {
        match (stream, self.output.as_mut()) {
            (Stream::Stdout, Some(w)) => w.flush(),
            (Stream::Stdout, None) => io::stdout().flush(),
            (Stream::Stderr, _) => io::stderr().flush(),
        }
    }

    fn read_char(&mut self) -> io::Result<Option<char>> {
        match self.input.as_mut() {
            Some(r) => read_char(r.as_mut()),
            None => read_char(&mut io::stdin().lock()),
        }
    }
}

// ── In-memory console ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemoryInner {
    stdout: String,
    stderr: String,
    input: VecDeque<char>,
}

/// Console that records output and serves input from memory.
///
/// Clones share the same buffers, so a caller can hand one clone to an
/// interpreter and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryConsole {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Console whose `rs` input is `text`.
    pub fn with_input(text: &str) -> Self {
        let c = Self::new();
        c.push_input(text);
        c
    }

    pub fn push_input(&self, text: &str) {
        self.inner.borrow_mut().input.extend(text.chars());
    }

    pub fn stdout(&self) -> String {
        self.inner.borrow().stdout.clone()
    }

    pub fn stderr(&self) -> String {
        self.inner.borrow().stderr.clone()
    }

    /// Take and clear captured stdout.
    pub fn take_stdout(&self) -> String {
        std::mem::take(&mut self.inner.borrow_mut().stdout)
    }
}

impl Console for MemoryConsole {
    fn write(&mut self, stream: Stream, text: &str) -> io::Result<()> {
        let mut inner = self.inner.borrow_mut();
        match stream {
            Stream::Stdout => inner.stdout.push_str(text),
            Stream::Stderr => inner.stderr.push_str(text),
        }
        Ok(())
    }

    fn flush(&mut self, _stream: Stream) -> io::Result<()> {
        Ok(())
    }

    fn read_char(&mut self) -> io::Result<Option<char>> {
        Ok(self.inner.borrow_mut().input.pop_front())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn balanced(src: &str) -> Vec<String> {
        let mut r = Cursor::new(src.as_bytes().to_vec());
        let mut out = Vec::new();
        while let Some(s) = read_balanced(&mut r, '<', '>', '\\').unwrap() {
            out.push(s);
        }
        out
    }

    #[test]
    fn read_char_decodes_utf8() {
        let mut r = Cursor::new("aé€😀".as_bytes().to_vec());
        let mut got = String::new();
        while let Some(c) = read_char(&mut r).unwrap() {
            got.push(c);
        }
        assert_eq!(got, "aé€😀");
    }

    #[test]
    fn read_char_rejects_bad_lead_byte() {
        let mut r = Cursor::new(vec![0xff, 0x41]);
        assert!(read_char(&mut r).is_err());
    }

    #[test]
    fn balanced_single_lines() {
        assert_eq!(balanced("#<ad;1;2>\n#<su;5;1>\n"), vec!["#<ad;1;2>", "#<su;5;1>"]);
    }

    #[test]
    fn balanced_spans_lines_and_drops_tail() {
        let got = balanced("#<ds;x;<a\nb>> trailing junk\nnext\n");
        assert_eq!(got, vec!["#<ds;x;<a\nb>>", "next"]);
    }

    #[test]
    fn balanced_respects_escapes() {
        assert_eq!(balanced("#<ps;\\>>\n"), vec!["#<ps;\\>>"]);
    }

    #[test]
    fn balanced_eof_without_newline() {
        assert_eq!(balanced("plain"), vec!["plain"]);
        assert!(balanced("").is_empty());
    }

    #[test]
    fn memory_console_shares_buffers() {
        let c = MemoryConsole::with_input("abc;def");
        let mut handle: Box<dyn Console> = Box::new(c.clone());
        handle.write(Stream::Stdout, "out").unwrap();
        handle.write(Stream::Stderr, "err").unwrap();
        assert_eq!(handle.read_until(';').unwrap(), "abc");
        assert_eq!(handle.read_until(';').unwrap(), "def");
        assert_eq!(handle.read_until(';').unwrap(), "");
        assert_eq!(c.stdout(), "out");
        assert_eq!(c.stderr(), "err");
        assert_eq!(c.take_stdout(), "out");
        assert_eq!(c.stdout(), "");
    }
}
