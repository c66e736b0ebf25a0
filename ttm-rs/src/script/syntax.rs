//! Runtime-configurable syntax characters.

/// The characters that drive scanning.  All of them can be changed while a
/// program runs (`#<ttm;meta;...>`, `#<cm;...>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Syntax {
    /// Call introducer, `#`.
    pub sharp: char,
    /// Call/literal opener, `<`.
    pub open: char,
    /// Argument separator, `;`.
    pub semi: char,
    /// Call/literal closer, `>`.
    pub close: char,
    /// Escape, `\`.
    pub escape: char,
    /// Terminator for `#<rs>`, newline.
    pub meta: char,
}

impl Syntax {
    pub fn new() -> Self {
        Self { sharp: '#', open: '<', semi: ';', close: '>', escape: '\\', meta: '\n' }
    }

    /// Install sharp, open, semi, close and escape from exactly five
    /// characters, in that order.  Returns `false` (and changes nothing)
    /// for any other length.
    pub fn set_meta(&mut self, spec: &str) -> bool {
        let c: Vec<char> = spec.chars().collect();
        let &[sharp, open, semi, close, escape] = c.as_slice() else {
            return false;
        };
        self.sharp = sharp;
        self.open = open;
        self.semi = semi;
        self.close = close;
        self.escape = escape;
        true
    }
}

impl Default for Syntax {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_meta_needs_five() {
        let mut s = Syntax::new();
        assert!(!s.set_meta("#<;>"));
        assert_eq!(s, Syntax::new());
        assert!(s.set_meta("$[,]!"));
        assert_eq!((s.sharp, s.open, s.semi, s.close, s.escape), ('$', '[', ',', ']', '!'));
        assert_eq!(s.meta, '\n');
    }
}
