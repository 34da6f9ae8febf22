//! Numeric literal grammar.
//!
//! Bases carry either a prefix or a suffix: `0b1010`/`1010B` binary,
//! `0123`/`123Q` octal, plain decimal with an optional sign, `0x2A`/`2Ah`
//! hex (the suffix form must start with a digit so labels like `Fh` stay
//! symbols), `'c'` character. Matching order decides ambiguous spellings,
//! so `1010B` is binary and `0123` is octal.

use crate::error::Error;
use crate::expr::Evaluator;
use obj::symbol::SymbolTable;

/// Resolve a standalone literal.
pub fn resolve(literal: &str) -> Result<i32, Error> {
    let lit = literal.trim();
    let invalid = || Error::InvalidLiteral(lit.to_string());

    let digits = |s: &str, radix: u32| i32::from_str_radix(s, radix).map_err(|_| invalid());

    if let Some(rest) = lit.strip_prefix("0b").or_else(|| lit.strip_prefix("0B")) {
        if !rest.is_empty() && rest.bytes().all(|b| b == b'0' || b == b'1') {
            return digits(rest, 2);
        }
    }
    if let Some(rest) = lit
        .strip_suffix('b')
        .or_else(|| lit.strip_suffix('B'))
        .filter(|r| !r.is_empty() && r.bytes().all(|b| b == b'0' || b == b'1'))
    {
        return digits(rest, 2);
    }

    if let Some(rest) = lit.strip_prefix('0') {
        if !rest.is_empty() && rest.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
            return digits(rest, 8);
        }
    }
    if let Some(rest) = lit
        .strip_suffix('q')
        .or_else(|| lit.strip_suffix('Q'))
        .filter(|r| !r.is_empty() && r.bytes().all(|b| (b'0'..=b'7').contains(&b)))
    {
        return digits(rest, 8);
    }

    {
        let body = lit.strip_prefix(['-', '+']).unwrap_or(lit);
        if !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit()) {
            return lit.parse::<i32>().map_err(|_| invalid());
        }
    }

    if let Some(rest) = lit.strip_prefix("0x").or_else(|| lit.strip_prefix("0X")) {
        if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return digits(rest, 16);
        }
    }
    if let Some(rest) = lit
        .strip_suffix('h')
        .or_else(|| lit.strip_suffix('H'))
        .filter(|r| {
            r.bytes().next().map_or(false, |b| b.is_ascii_digit())
                && r.bytes().all(|b| b.is_ascii_hexdigit())
        })
    {
        return digits(rest, 16);
    }

    let chars: Vec<char> = lit.chars().collect();
    if chars.len() == 3 && chars[0] == '\'' && chars[2] == '\'' {
        return Ok(chars[1] as i32);
    }

    Err(invalid())
}

/// Resolve a literal, falling back to symbolic expression evaluation.
pub fn resolve_with(expr: &str, symbols: &SymbolTable) -> Result<i32, Error> {
    match resolve(expr) {
        Ok(value) => Ok(value),
        Err(_) => Evaluator::new(symbols).evaluate(expr),
    }
}
