//! Character classes used by `ccl`, `scl` and `tcl`.

use std::collections::HashMap;

/// A named set of characters, optionally negated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    pub characters: String,
    /// When set, the class matches every character *not* in `characters`.
    pub negative: bool,
}

impl CharClass {
    pub fn new(characters: impl Into<String>, negative: bool) -> Self {
        Self { characters: characters.into(), negative }
    }

    pub fn matches(&self, c: char) -> bool {
        self.characters.contains(c) != self.negative
    }

    /// Length of the longest prefix of `text` whose characters all match.
    pub fn span(&self, text: &[char]) -> usize {
        text.iter().take_while(|&&c| self.matches(c)).count()
    }
}

/// Class name → class.
#[derive(Debug, Default)]
pub struct ClassTable {
    classes: HashMap<String, CharClass>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a class.
    pub fn define(&mut self, name: impl Into<String>, characters: &str, negative: bool) {
        self.classes.insert(name.into(), CharClass::new(characters, negative));
    }

    pub fn get(&self, name: &str) -> Option<&CharClass> {
        self.classes.get(name)
    }

    /// Remove a class.  Returns `true` if it existed.
    pub fn erase(&mut self, name: &str) -> bool {
        self.classes.remove(name).is_some()
    }

    /// Sorted class names.
    pub fn names(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        v.sort_unstable();
        v
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
