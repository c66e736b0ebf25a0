//! Integer arguments.
//!
//! Accepted form: optional blanks/tabs, an optional `+`/`-`, then either
//! decimal digits or `0x` followed by up to 16 hex digits, then optional
//! trailing blanks/tabs.  Anything else is [`ErrorKind::Decimal`]; a value
//! that does not fit in an `i64` is [`ErrorKind::ManyDigits`].

use crate::chars::{from_hex, is_dec};
use crate::error::{ErrorKind, Result};

const MAX_HEX_DIGITS: usize = 16;

pub fn parse_int(s: &str) -> Result<i64> {
    let s = s.trim_matches(|c| c == ' ' || c == '\t');
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if body.is_empty() {
        return Err(ErrorKind::Decimal.into());
    }

    let magnitude = match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        Some(hex) => parse_hex(hex)?,
        None => parse_dec(body)?,
    };
    Ok(if negative { magnitude.wrapping_neg() } else { magnitude })
}

fn parse_dec(digits: &str) -> Result<i64> {
    let mut value: i64 = 0;
    for c in digits.chars() {
        if !is_dec(c) {
            return Err(ErrorKind::Decimal.into());
        }
        let d = i64::from(c as u8 - b'0');
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(d))
            .ok_or(ErrorKind::ManyDigits)?;
    }
    Ok(value)
}

fn parse_hex(digits: &str) -> Result<i64> {
    if digits.is_empty() {
        return Err(ErrorKind::Decimal.into());
    }
    if digits.chars().count() > MAX_HEX_DIGITS {
        return Err(ErrorKind::ManyDigits.into());
    }
    let mut bits: u64 = 0;
    for c in digits.chars() {
        let d = from_hex(c).ok_or(ErrorKind::Decimal)?;
        bits = (bits << 4) | u64::from(d);
    }
    // all 64 bits are significant; reinterpret as signed
    Ok(bits as i64)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(s: &str) -> ErrorKind {
        parse_int(s).unwrap_err().kind
    }

    #[test]
    fn decimal() {
        assert_eq!(parse_int("0").unwrap(), 0);
        assert_eq!(parse_int("42").unwrap(), 42);
        assert_eq!(parse_int("-17").unwrap(), -17);
        assert_eq!(parse_int("+5").unwrap(), 5);
        assert_eq!(parse_int("  \t12 ").unwrap(), 12);
        assert_eq!(parse_int("007").unwrap(), 7);
    }

    #[test]
    fn hexadecimal() {
        assert_eq!(parse_int("0x1f").unwrap(), 31);
        assert_eq!(parse_int("0XFF").unwrap(), 255);
        assert_eq!(parse_int("-0x10").unwrap(), -16);
        assert_eq!(parse_int("0xffffffffffffffff").unwrap(), -1);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(kind(""), ErrorKind::Decimal);
        assert_eq!(kind("-"), ErrorKind::Decimal);
        assert_eq!(kind("abc"), ErrorKind::Decimal);
        assert_eq!(kind("12abc"), ErrorKind::Decimal);
        assert_eq!(kind("0x"), ErrorKind::Decimal);
        assert_eq!(kind("0xfg"), ErrorKind::Decimal);
        assert_eq!(kind("1 2"), ErrorKind::Decimal);
    }

    #[test]
    fn overflow() {
        assert_eq!(parse_int("9223372036854775807").unwrap(), i64::MAX);
        assert_eq!(kind("9223372036854775808"), ErrorKind::ManyDigits);
        assert_eq!(kind("0x1ffffffffffffffff"), ErrorKind::ManyDigits);
    }
}
