//! The dictionary: every name the interpreter knows.
//!
//! A [`NameEntry`] is either a builtin (fixed identity, arity and
//! side-effect contract) or a macro (mutable body with a residual cursor and
//! a segment-mark counter).  Locked entries survive `#<es>`; builtins are
//! locked as soon as start-up finishes.

use std::collections::HashMap;

use crate::error::{ErrorKind, Result};
use crate::script::builtins::Builtin;

// ── Macro bodies ──────────────────────────────────────────────────────────────

/// A user-defined body plus its scanning state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroBody {
    pub text: Vec<char>,
    /// How much of `text` the name-scanning builtins have consumed.
    /// Always `<= text.len()`.
    pub residual: usize,
    /// Highest segment-mark index present in `text`.
    pub maxsegmark: u32,
}

impl MacroBody {
    pub fn new(text: &str) -> Self {
        Self { text: text.chars().collect(), residual: 0, maxsegmark: 0 }
    }

    /// Unconsumed part of the body.
    pub fn rest(&self) -> &[char] {
        &self.text[self.residual..]
    }

    pub fn at_end(&self) -> bool {
        self.residual >= self.text.len()
    }

    /// Advance the residual by `n`, clamped to the end of the body.
    pub fn advance(&mut self, n: usize) {
        self.residual = self.residual.saturating_add(n).min(self.text.len());
    }

    /// Take the next `n` characters (fewer at the end) and advance past them.
    pub fn take(&mut self, n: usize) -> String {
        let end = self.residual.saturating_add(n).min(self.text.len());
        let s: String = self.text[self.residual..end].iter().collect();
        self.residual = end;
        s
    }

    pub fn text_string(&self) -> String {
        self.text.iter().collect()
    }
}

// ── Entries ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Builtin(Builtin),
    Macro(MacroBody),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    pub kind: EntryKind,
    pub locked: bool,
    pub trace: bool,
}

impl NameEntry {
    pub fn builtin(b: Builtin) -> Self {
        Self { kind: EntryKind::Builtin(b), locked: false, trace: false }
    }

    pub fn macro_body(text: &str) -> Self {
        Self { kind: EntryKind::Macro(MacroBody::new(text)), locked: false, trace: false }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.kind, EntryKind::Builtin(_))
    }

    /// `true` when invoking this entry can never produce text.
    pub fn is_side_effect_only(&self) -> bool {
        match &self.kind {
            EntryKind::Builtin(b) => b.effect.side_effect_only(),
            EntryKind::Macro(_) => false,
        }
    }

    pub fn min_args(&self) -> usize {
        match &self.kind {
            EntryKind::Builtin(b) => b.min_args,
            EntryKind::Macro(_) => 0,
        }
    }
}

// ── Dictionary ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Dictionary {
    entries: HashMap<String, NameEntry>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&NameEntry> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut NameEntry> {
        self.entries.get_mut(name)
    }

    /// Look up an existing entry, failing with NoName.
    pub fn entry_mut(&mut self, name: &str) -> Result<&mut NameEntry> {
        self.entries.get_mut(name).ok_or_else(|| ErrorKind::NoName.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: NameEntry) {
        self.entries.insert(name.into(), entry);
    }

    /// The macro body of `name`, for the residual-cursor operations.
    ///
    /// Fails with NoName if undefined and NoPrimitive for a builtin.
    pub fn macro_mut(&mut self, name: &str) -> Result<&mut MacroBody> {
        match self.entries.get_mut(name) {
            None => Err(ErrorKind::NoName.into()),
            Some(NameEntry { kind: EntryKind::Builtin(_), .. }) => Err(ErrorKind::NoPrimitive.into()),
            Some(NameEntry { kind: EntryKind::Macro(body), .. }) => Ok(body),
        }
    }

    /// Define or redefine `name` as a macro with a fresh cursor.
    ///
    /// An existing entry keeps its lock and trace flags.
    pub fn define(&mut self, name: &str, text: &str) {
        match self.entries.get_mut(name) {
            Some(entry) => entry.kind = EntryKind::Macro(MacroBody::new(text)),
            None => self.insert(name, NameEntry::macro_body(text)),
        }
    }

    /// Remove `name` unless it is locked.  Returns `true` if removed.
    pub fn erase(&mut self, name: &str) -> bool {
        match self.entries.get(name) {
            Some(e) if !e.locked => self.entries.remove(name).is_some(),
            _ => false,
        }
    }

    pub fn lock_all(&mut self) {
        for e in self.entries.values_mut() {
            e.locked = true;
        }
    }

    /// Sorted names, optionally including builtins.
    pub fn names(&self, include_builtins: bool) -> Vec<&str> {
        let mut v: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, e)| include_builtins || !e.is_builtin())
            .map(|(k, _)| k.as_str())
            .collect();
        v.sort_unstable();
        v
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut NameEntry)> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::builtins::lookup_builtin;

    #[test]
    fn define_and_redefine_resets_cursor() {
        let mut d = Dictionary::new();
        d.define("x", "hello");
        d.macro_mut("x").unwrap().advance(3);
        d.define("x", "bye");
        let body = d.macro_mut("x").unwrap();
        assert_eq!(body.residual, 0);
        assert_eq!(body.text_string(), "bye");
    }

    #[test]
    fn macro_mut_errors() {
        let mut d = Dictionary::new();
        d.insert("ad", NameEntry::builtin(lookup_builtin("ad").unwrap()));
        assert_eq!(d.macro_mut("nope").unwrap_err().kind, ErrorKind::NoName);
        assert_eq!(d.macro_mut("ad").unwrap_err().kind, ErrorKind::NoPrimitive);
    }

    #[test]
    fn erase_respects_lock() {
        let mut d = Dictionary::new();
        d.define("a", "1");
        d.define("b", "2");
        d.get_mut("a").unwrap().locked = true;
        assert!(!d.erase("a"));
        assert!(d.erase("b"));
        assert!(!d.erase("b"));
        assert!(d.contains("a"));
    }

    #[test]
    fn names_sorted_and_filtered() {
        let mut d = Dictionary::new();
        d.define("zeta", "");
        d.define("alpha", "");
        d.insert("ad", NameEntry::builtin(lookup_builtin("ad").unwrap()));
        assert_eq!(d.names(false), vec!["alpha", "zeta"]);
        assert_eq!(d.names(true), vec!["ad", "alpha", "zeta"]);
    }

    #[test]
    fn take_clamps_at_end() {
        let mut b = MacroBody::new("abcde");
        assert_eq!(b.take(2), "ab");
        assert_eq!(b.take(10), "cde");
        assert!(b.at_end());
        assert_eq!(b.take(1), "");
        assert_eq!(b.residual, 5);
    }

    #[test]
    fn redefine_keeps_lock() {
        let mut d = Dictionary::new();
        d.define("k", "v1");
        d.lock_all();
        d.define("k", "v2");
        assert!(d.get("k").unwrap().locked);
    }
}
