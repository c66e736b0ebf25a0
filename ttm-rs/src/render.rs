//! Turning evaluated text into something fit for a terminal.
//!
//! - [`render_output`] is what `ps` and the top-level driver print.  Escape
//!   sequences become the characters they stand for and marks become `^NN`.
//! - [`show_marks`] only relabels marks; used by `#<ttm;info;name;...>`.
//! - [`debug_string`] serves traces and stack dumps.  Control characters and
//!   the escape character are written back in escaped form.

use crate::chars::{is_control, is_create, segmark_index};

/// `^NN` for a mark, `None` for any other character.
pub fn mark_label(c: char) -> Option<String> {
    if is_create(c) {
        Some("^00".to_owned())
    } else {
        segmark_index(c).map(|i| format!("^{i:02}"))
    }
}

/// Character an escape sequence `escape c` stands for on output.
pub fn unescape_char(c: char) -> char {
    match c {
        'r' => '\r',
        'n' => '\n',
        't' => '\t',
        'b' => '\u{8}',
        'f' => '\u{c}',
        other => other,
    }
}

/// Render text for printing.
///
/// With `print_all` unset, control characters other than newline are
/// dropped.  Non-empty output always ends with a newline.
pub fn render_output(text: &str, escape: char, print_all: bool) -> String {
    let mut out = String::with_capacity(text.len() + 1);
    let mut chars = text.chars();
    while let Some(mut c) = chars.next() {
        if c == escape {
            match chars.next() {
                Some(next) => c = unescape_char(next),
                None => break,
            }
        }
        if !(print_all || c == '\n' || !is_control(c)) {
            continue;
        }
        match mark_label(c) {
            Some(label) => out.push_str(&label),
            None => out.push(c),
        }
    }
    if !text.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Replace marks with their `^NN` labels, leaving everything else alone.
pub fn show_marks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match mark_label(c) {
            Some(label) => out.push_str(&label),
            None => out.push(c),
        }
    }
    out
}

/// Escaped form used in traces; `quote`, when given, is also escaped.
pub fn debug_string(text: &str, escape: char, quote: Option<char>) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if let Some(label) = mark_label(c) {
            out.push_str(&label);
        } else if c == escape || Some(c) == quote {
            out.push(escape);
            out.push(c);
        } else if is_control(c) {
            out.push(escape);
            match c {
                '\n' => out.push('n'),
                '\r' => out.push('r'),
                '\t' => out.push('t'),
                '\u{8}' => out.push('b'),
                '\u{c}' => out.push('f'),
                other => out.push_str(&(other as u32).to_string()),
            }
        } else {
            out.push(c);
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chars::{segmark, CREATE_MARK};

    #[test]
    fn output_converts_escapes() {
        assert_eq!(render_output("a\\tb", '\\', false), "a\tb\n");
        assert_eq!(render_output("x\\>y", '\\', false), "x>y\n");
        assert_eq!(render_output("line\\n", '\\', false), "line\n");
    }

    #[test]
    fn output_drops_controls_unless_print_all() {
        assert_eq!(render_output("a\u{7}b", '\\', false), "ab\n");
        assert_eq!(render_output("a\u{7}b", '\\', true), "a\u{7}b\n");
    }

    #[test]
    fn output_empty_prints_nothing() {
        assert_eq!(render_output("", '\\', true), "");
    }

    #[test]
    fn output_renders_marks() {
        let s = format!("{}-{}", segmark(4).unwrap(), CREATE_MARK);
        assert_eq!(render_output(&s, '\\', false), "^04-^00\n");
        assert_eq!(show_marks(&s), "^04-^00");
    }

    #[test]
    fn debug_escapes_controls() {
        assert_eq!(debug_string("a\nb\\c", '\\', None), "a\\nb\\\\c");
        assert_eq!(debug_string("say \"hi\"", '\\', Some('"')), "say \\\"hi\\\"");
        assert_eq!(debug_string("\u{1}", '\\', None), "\\1");
    }
}
