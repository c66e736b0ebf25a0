//! Active buffer: the text being scanned plus a read cursor.
//!
//! ## Design
//!
//! The buffer is a `Vec<char>` so that the cursor counts characters, not
//! bytes, and so that marks (single reserved code points) stay atomic.
//! [`ActiveBuffer::pos`] is always a valid index (`0..=len`).
//!
//! The cursor only moves forward, except for [`ActiveBuffer::load`] which
//! replaces the contents and rewinds.  [`ActiveBuffer::insert`] splices text
//! in *at* the cursor without advancing past it, so an active call's result
//! is the next thing the scanner reads.

use crate::error::{ErrorKind, Result};

#[derive(Debug, Clone)]
pub struct ActiveBuffer {
    text: Vec<char>,
    pos: usize,
    /// Maximum number of characters the buffer may hold.
    limit: usize,
}

impl ActiveBuffer {
    pub fn new(limit: usize) -> Self {
        Self { text: Vec::new(), pos: 0, limit }
    }

    /// Replace the contents with `src` and rewind the cursor.
    pub fn load(&mut self, src: &str) -> Result<()> {
        let chars: Vec<char> = src.chars().collect();
        if chars.len() > self.limit {
            return Err(ErrorKind::BufferSize.into());
        }
        self.text = chars;
        self.pos = 0;
        Ok(())
    }

    /// Drop everything and rewind.
    pub fn clear(&mut self) {
        self.text.clear();
        self.pos = 0;
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Characters not yet scanned.
    pub fn live(&self) -> usize {
        self.text.len() - self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Character `ahead` positions past the cursor.
    pub fn peek_at(&self, ahead: usize) -> Option<char> {
        self.text.get(self.pos + ahead).copied()
    }

    /// Character at the cursor.
    pub fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    /// Return the character at the cursor and step past it.
    pub fn next_char(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// Move the cursor forward by `n`, stopping at the end.
    pub fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.text.len());
    }

    /// Splice `src` in at the cursor so that it is read next.
    ///
    /// Already-scanned text is discarded first; it can never be read again
    /// and must not count against the limit.
    pub fn insert(&mut self, src: &str) -> Result<()> {
        let chars: Vec<char> = src.chars().collect();
        self.text.drain(..self.pos);
        self.pos = 0;
        if self.text.len() + chars.len() > self.limit {
            return Err(ErrorKind::BufferSize.into());
        }
        self.text.splice(0..0, chars);
        Ok(())
    }

    /// Unread text from the cursor onward.
    pub fn remaining(&self) -> String {
        self.text[self.pos..].iter().collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
