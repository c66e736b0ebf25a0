//! Macro body marking and substitution.
//!
//! Marking rewrites a stored body, replacing occurrences of chosen strings
//! with in-band marks:
//!
//! | Builtin | Replacement |
//! |---------|-------------|
//! | `ss`/`sc` | segment mark *n*, one index per search string |
//! | `cr` | creation mark |
//!
//! Substitution runs when a macro is called and turns the marks back into
//! text: segment mark *n* becomes argument *n* (empty if not supplied) and
//! every creation mark becomes the same freshly allocated 4-digit token.

use crate::chars::{segmark, segmark_index, is_create, MAX_SEGMARKS, CREATE_MARK};
use crate::error::{ErrorKind, Result};
use crate::script::dict::MacroBody;

/// Minimum width of a creation token.
pub const CREATE_WIDTH: usize = 4;

/// Position of the first occurrence of `needle` in `hay` at or after `from`.
pub fn find(hay: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || from > hay.len() {
        return None;
    }
    hay[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Replace every occurrence of `needle` in `text` with `mark`.
/// Returns the rewritten text and the number of replacements.
fn replace_all(text: &[char], needle: &[char], mark: char) -> (Vec<char>, usize) {
    let mut out = Vec::with_capacity(text.len());
    let mut count = 0;
    let mut offset = 0;
    while let Some(pos) = find(text, needle, offset) {
        out.extend_from_slice(&text[offset..pos]);
        out.push(mark);
        count += 1;
        offset = pos + needle.len();
    }
    out.extend_from_slice(&text[offset..]);
    (out, count)
}

/// Segment the unconsumed part of `body` by each of `patterns` in turn.
///
/// The first pattern that matches anywhere gets index `maxsegmark + 1`, the
/// next matching pattern the following index, and so on; patterns that do
/// not occur use up no index.  Empty patterns match nothing.  Returns the
/// total number of marks placed.  On failure the body is left untouched.
pub fn mark_segments(body: &mut MacroBody, patterns: &[String]) -> Result<usize> {
    let mut rest: Vec<char> = body.rest().to_vec();
    let mut next_index = body.maxsegmark;
    let mut total = 0;

    for pattern in patterns {
        let needle: Vec<char> = pattern.chars().collect();
        if find(&rest, &needle, 0).is_none() {
            continue;
        }
        next_index += 1;
        if next_index > MAX_SEGMARKS {
            return Err(ErrorKind::ManySegmentMarks.into());
        }
        let mark = segmark(next_index).ok_or(ErrorKind::ManySegmentMarks)?;
        let (replaced, count) = replace_all(&rest, &needle, mark);
        rest = replaced;
        total += count;
    }

    body.text.truncate(body.residual);
    body.text.extend(rest);
    body.maxsegmark = next_index;
    Ok(total)
}

/// Replace each occurrence of `pattern` after the residual with a creation
/// mark.
pub fn mark_creations(body: &mut MacroBody, pattern: &str) {
    let needle: Vec<char> = pattern.chars().collect();
    if needle.is_empty() {
        return;
    }
    let (rest, _) = replace_all(body.rest(), &needle, CREATE_MARK);
    body.text.truncate(body.residual);
    body.text.extend(rest);
}

/// Expand a macro body against the caller's arguments (`args[0]` is the
/// macro name, so segment mark *n* picks `args[n]`).
///
/// `next_token` is called at most once, on the first creation mark.
pub fn substitute(body: &[char], args: &[String], mut next_token: impl FnMut() -> u64) -> String {
    let mut out = String::with_capacity(body.len());
    let mut token: Option<String> = None;
    for &c in body {
        if let Some(i) = segmark_index(c) {
            if let Some(arg) = args.get(i) {
                out.push_str(arg);
            }
        } else if is_create(c) {
            let t = token.get_or_insert_with(|| format!("{:0width$}", next_token(), width = CREATE_WIDTH));
            out.push_str(t);
        } else {
            out.push(c);
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
