//! Character classification and in-band marks.
//!
//! Macro bodies carry two kinds of sentinel characters alongside ordinary
//! text.  Both live in a reserved block at the top of plane 16, which no
//! input is allowed to contain (see [`check_input`]):
//!
//! | Code point            | Meaning                          |
//! |-----------------------|----------------------------------|
//! | `U+10FF01..=U+10FF3E` | segment mark 1..=62              |
//! | `U+10FFC0`            | creation mark                    |
//! | rest of `U+10FF00..=U+10FFFF` | reserved, never produced |

use crate::error::{ErrorKind, TtmError};

/// Highest segment-mark index a body may carry.
pub const MAX_SEGMARKS: u32 = 62;

/// First code point of the reserved block.
pub const RESERVED_BASE: u32 = 0x10FF00;
/// Last code point of the reserved block.
pub const RESERVED_END: u32 = 0x10FFFF;

/// The creation mark.
pub const CREATE_MARK: char = '\u{10FFC0}';

// ── Marks ─────────────────────────────────────────────────────────────────────

/// Segment mark for argument `index` (1..=62), or `None` if out of range.
pub fn segmark(index: u32) -> Option<char> {
    if index == 0 || index > MAX_SEGMARKS {
        return None;
    }
    char::from_u32(RESERVED_BASE + index)
}

/// Argument index encoded by a segment mark.
pub fn segmark_index(c: char) -> Option<usize> {
    let cp = c as u32;
    if (RESERVED_BASE + 1..=RESERVED_BASE + MAX_SEGMARKS).contains(&cp) {
        Some((cp - RESERVED_BASE) as usize)
    } else {
        None
    }
}

pub fn is_segmark(c: char) -> bool {
    segmark_index(c).is_some()
}

pub fn is_create(c: char) -> bool {
    c == CREATE_MARK
}

/// Either kind of mark.
pub fn is_mark(c: char) -> bool {
    is_segmark(c) || is_create(c)
}

/// Any code point in the reserved block, whether or not it is a live mark.
pub fn is_reserved(c: char) -> bool {
    (RESERVED_BASE..=RESERVED_END).contains(&(c as u32))
}

// ── Classes ───────────────────────────────────────────────────────────────────

pub fn is_control(c: char) -> bool {
    (c as u32) < 0x20 || c as u32 == 0x7f
}

pub fn is_dec(c: char) -> bool {
    c.is_ascii_digit()
}

/// Value of a hex digit.
pub fn from_hex(c: char) -> Option<u32> {
    c.to_digit(16)
}

/// Reject text that smuggles reserved code points in from outside.
pub fn check_input(text: &str) -> Result<(), TtmError> {
    if text.chars().any(is_reserved) {
        return Err(TtmError::new(ErrorKind::IllegalChar));
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
