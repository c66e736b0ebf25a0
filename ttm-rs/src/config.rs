//! Resource limits and the `ttmrc` settings file.
//!
//! Three limits bound every run:
//!
//! | Tag | Field | Minimum |
//! |-----|-------|---------|
//! | `b` | [`Limits::buffersize`] | 2^20 characters |
//! | `s` | [`Limits::stacksize`]  | 64 frames (at most 2^16) |
//! | `x` | [`Limits::execcount`]  | 2^16 calls |
//!
//! Evaluation recurses on the native stack, so a thread running an
//! interpreter needs [`Limits::native_stack_bytes`] of stack.
//!
//! Values may carry a `k`/`K` (x1024) or `m`/`M` (x1048576) suffix.  The
//! same `tag=value` form is used by `-X` on the command line and by lines of
//! the rc file, where `;` and `#` start comment lines.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub const MIN_BUFFERSIZE: usize = 1 << 20;
pub const MIN_STACKSIZE: usize = 64;
pub const MIN_EXECCOUNT: u64 = 1 << 16;
pub const MAX_STACKSIZE: usize = 1 << 16;

/// Native stack allowed per frame of nesting, plus a fixed base.
const FRAME_STACK_BYTES: usize = 16 << 10;
const BASE_STACK_BYTES: usize = 8 << 20;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("illegal tag value: {0:?}")]
    BadValue(String),

    #[error("illegal -X option: {0:?}")]
    UnknownTag(String),

    #[error("missing -X tag value in {0:?}")]
    MissingValue(String),

    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Limits ────────────────────────────────────────────────────────────────────

/// Limits on buffer growth, recursion depth and total work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub buffersize: usize,
    pub stacksize: usize,
    pub execcount: u64,
}

impl Limits {
    pub fn new() -> Self {
        Self {
            buffersize: MIN_BUFFERSIZE,
            stacksize: MIN_STACKSIZE,
            execcount: MIN_EXECCOUNT,
        }
    }

    /// Raise any value below its minimum up to the minimum, and cap the
    /// stack depth at [`MAX_STACKSIZE`].
    pub fn clamped(self) -> Self {
        Self {
            buffersize: self.buffersize.max(MIN_BUFFERSIZE),
            stacksize: self.stacksize.clamp(MIN_STACKSIZE, MAX_STACKSIZE),
            execcount: self.execcount.max(MIN_EXECCOUNT),
        }
    }

    /// Thread stack size that lets `stacksize` frames nest without
    /// exhausting the native stack.
    pub fn native_stack_bytes(&self) -> usize {
        let frames = self.stacksize.min(MAX_STACKSIZE);
        BASE_STACK_BYTES + frames * FRAME_STACK_BYTES
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::new()
    }
}

/// Which limit a tag names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitTag {
    Buffer,
    Stack,
    Exec,
}

/// Requested limits; `None` means "not given".  Earlier sources win when
/// merged, mirroring the first-`-X`-wins rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitSettings {
    pub buffersize: Option<u64>,
    pub stacksize: Option<u64>,
    pub execcount: Option<u64>,
}

impl LimitSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value for `tag` unless one is already present.
    pub fn set_if_unset(&mut self, tag: LimitTag, value: u64) {
        let slot = match tag {
            LimitTag::Buffer => &mut self.buffersize,
            LimitTag::Stack => &mut self.stacksize,
            LimitTag::Exec => &mut self.execcount,
        };
        slot.get_or_insert(value);
    }

    /// Parse and record one `tag=value` assignment.
    pub fn apply_tag(&mut self, spec: &str) -> Result<(), ConfigError> {
        let (tag, value) = parse_tag(spec)?;
        self.set_if_unset(tag, value);
        Ok(())
    }

    /// Fill unset values from `other`.
    pub fn or(self, other: LimitSettings) -> Self {
        Self {
            buffersize: self.buffersize.or(other.buffersize),
            stacksize: self.stacksize.or(other.stacksize),
            execcount: self.execcount.or(other.execcount),
        }
    }

    /// Resolve into concrete limits, enforcing the minimums.
    pub fn resolve(self) -> Limits {
        let d = Limits::new();
        Limits {
            buffersize: self.buffersize.map_or(d.buffersize, saturate_usize),
            stacksize: self.stacksize.map_or(d.stacksize, saturate_usize),
            execcount: self.execcount.unwrap_or(d.execcount),
        }
        .clamped()
    }
}

fn saturate_usize(v: u64) -> usize {
    usize::try_from(v).unwrap_or(usize::MAX)
}

// ── Tag parsing ───────────────────────────────────────────────────────────────

/// Parse a size value with an optional `k`/`m` suffix.
pub fn parse_tag_value(s: &str) -> Result<u64, ConfigError> {
    let s = s.trim();
    let bad = || ConfigError::BadValue(s.to_owned());
    let (digits, scale) = match s.chars().last() {
        Some('k' | 'K') => (&s[..s.len() - 1], 1u64 << 10),
        Some('m' | 'M') => (&s[..s.len() - 1], 1u64 << 20),
        Some(_) => (s, 1),
        None => return Err(bad()),
    };
    let n: u64 = digits.parse().map_err(|_| bad())?;
    n.checked_mul(scale).ok_or_else(bad)
}

/// Parse `b=N`, `s=N` or `x=N`.
pub fn parse_tag(spec: &str) -> Result<(LimitTag, u64), ConfigError> {
    let mut chars = spec.chars();
    let tag = match chars.next() {
        Some('b') => LimitTag::Buffer,
        Some('s') => LimitTag::Stack,
        Some('x') => LimitTag::Exec,
        _ => return Err(ConfigError::UnknownTag(spec.to_owned())),
    };
    let rest = chars.as_str();
    let Some(value) = rest.strip_prefix('=') else {
        return Err(ConfigError::MissingValue(spec.to_owned()));
    };
    Ok((tag, parse_tag_value(value)?))
}

// ── rc file ───────────────────────────────────────────────────────────────────

/// Parse rc-file text.  Returns the settings plus any per-line errors; bad
/// lines are skipped rather than aborting the load.
pub fn load_str(s: &str) -> (LimitSettings, Vec<ConfigError>) {
    let mut settings = LimitSettings::new();
    let mut errors = Vec::new();

    for (i, raw) in s.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        // Later lines override earlier ones inside a single file.
        match parse_tag(line) {
            Ok((tag, value)) => match tag {
                LimitTag::Buffer => settings.buffersize = Some(value),
                LimitTag::Stack => settings.stacksize = Some(value),
                LimitTag::Exec => settings.execcount = Some(value),
            },
            Err(e) => errors.push(ConfigError::Line { line: i + 1, source: Box::new(e) }),
        }
    }

    (settings, errors)
}

/// Read and parse an rc file.
pub fn load_file(path: &Path) -> Result<(LimitSettings, Vec<ConfigError>), ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_owned(), source })?;
    Ok(load_str(&text))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_values_with_suffix() {
        assert_eq!(parse_tag_value("12").unwrap(), 12);
        assert_eq!(parse_tag_value("2k").unwrap(), 2048);
        assert_eq!(parse_tag_value("3M").unwrap(), 3 << 20);
        assert!(parse_tag_value("").is_err());
        assert!(parse_tag_value("k").is_err());
        assert!(parse_tag_value("-5").is_err());
    }

    #[test]
    fn parse_tags() {
        assert_eq!(parse_tag("b=1m").unwrap(), (LimitTag::Buffer, 1 << 20));
        assert_eq!(parse_tag("s=100").unwrap(), (LimitTag::Stack, 100));
        assert_eq!(parse_tag("x=64K").unwrap(), (LimitTag::Exec, 64 << 10));
        assert!(matches!(parse_tag("q=1"), Err(ConfigError::UnknownTag(_))));
        assert!(matches!(parse_tag("b1"), Err(ConfigError::MissingValue(_))));
    }

    #[test]
    fn first_tag_wins() {
        let mut s = LimitSettings::new();
        s.apply_tag("s=200").unwrap();
        s.apply_tag("s=300").unwrap();
        assert_eq!(s.stacksize, Some(200));
    }

    #[test]
    fn resolve_enforces_minimums() {
        let mut s = LimitSettings::new();
        s.apply_tag("s=3").unwrap();
        s.apply_tag("x=4m").unwrap();
        let l = s.resolve();
        assert_eq!(l.stacksize, MIN_STACKSIZE);
        assert_eq!(l.execcount, 4 << 20);
        assert_eq!(l.buffersize, MIN_BUFFERSIZE);
    }

    #[test]
    fn stack_depth_is_capped() {
        let mut s = LimitSettings::new();
        s.apply_tag("s=1m").unwrap();
        assert_eq!(s.resolve().stacksize, MAX_STACKSIZE);
        let small = Limits::new();
        let large = Limits { stacksize: 20 << 10, ..Limits::new() };
        assert!(large.native_stack_bytes() > small.native_stack_bytes());
        assert!(large.native_stack_bytes() >= large.stacksize * (16 << 10));
    }

    #[test]
    fn cli_overrides_rc() {
        let mut cli = LimitSettings::new();
        cli.apply_tag("s=500").unwrap();
        let (rc, errs) = load_str("s=100\nx=1m\n");
        assert!(errs.is_empty());
        let merged = cli.or(rc);
        assert_eq!(merged.stacksize, Some(500));
        assert_eq!(merged.execcount, Some(1 << 20));
    }

    #[test]
    fn rc_comments_and_errors() {
        let (s, errs) = load_str("; limits\n# more\n\nb=2m\nbogus\ns=12q\n");
        assert_eq!(s.buffersize, Some(2 << 20));
        assert_eq!(errs.len(), 2);
        assert!(errs[0].to_string().starts_with("line 5:"));
    }

    #[test]
    fn load_file_missing() {
        let err = load_file(Path::new("/nonexistent/ttmrc")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
