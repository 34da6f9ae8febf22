//! Symbolic expression evaluation.
//!
//! Recursive descent over `+ -` / `* / %` with parentheses, character
//! literals, `0x` hex, decimal, and symbol lookups. Whitespace is
//! insignificant. Arithmetic wraps like the 16-bit target would.

use crate::error::Error;
use obj::symbol::SymbolTable;

pub struct Evaluator<'a> {
    symbols: &'a SymbolTable,
}

impl<'a> Evaluator<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self { symbols }
    }

    pub fn evaluate(&self, expr: &str) -> Result<i32, Error> {
        let input: Vec<char> = expr.chars().filter(|c| !c.is_whitespace()).collect();
        let mut parser = Parser {
            symbols: self.symbols,
            input,
            pos: 0,
        };
        parser.expression()
    }
}

struct Parser<'a> {
    symbols: &'a SymbolTable,
    input: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn expression(&mut self) -> Result<i32, Error> {
        let mut value = self.term()?;
        while let Some(&op) = self.input.get(self.pos) {
            match op {
                '+' => {
                    self.pos += 1;
                    value = value.wrapping_add(self.term()?);
                }
                '-' => {
                    self.pos += 1;
                    value = value.wrapping_sub(self.term()?);
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<i32, Error> {
        let mut value = self.factor()?;
        while let Some(&op) = self.input.get(self.pos) {
            match op {
                '*' => {
                    self.pos += 1;
                    value = value.wrapping_mul(self.factor()?);
                }
                '/' => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    if divisor == 0 {
                        return Err(Error::DivisionByZero);
                    }
                    value = value.wrapping_div(divisor);
                }
                '%' => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    if divisor == 0 {
                        return Err(Error::DivisionByZero);
                    }
                    value = value.wrapping_rem(divisor);
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<i32, Error> {
        let Some(&c) = self.input.get(self.pos) else {
            return Err(Error::InvalidExpression("unexpected end".into()));
        };

        if c == '\'' && self.input.get(self.pos + 2) == Some(&'\'') {
            let value = self.input[self.pos + 1] as i32;
            self.pos += 3;
            return Ok(value);
        }

        if c == '(' {
            self.pos += 1;
            let value = self.expression()?;
            if self.input.get(self.pos) != Some(&')') {
                return Err(Error::UnclosedParen);
            }
            self.pos += 1;
            return Ok(value);
        }

        let start = self.pos;
        while self
            .input
            .get(self.pos)
            .map_or(false, |c| c.is_alphanumeric() || *c == '_')
        {
            self.pos += 1;
        }
        let token: String = self.input[start..self.pos].iter().collect();

        if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
            if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return i32::from_str_radix(hex, 16)
                    .map_err(|_| Error::InvalidExpression(token.clone()));
            }
        }

        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            return token
                .parse::<i32>()
                .map_err(|_| Error::InvalidExpression(token.clone()));
        }

        if let Some(address) = self.symbols.address_of(&token) {
            return Ok(address as i32);
        }

        if token.is_empty() {
            return Err(Error::InvalidExpression(c.to_string()));
        }
        Err(Error::UnknownSymbol(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obj::symbol::SymbolTable;

    fn table() -> SymbolTable {
        let mut symbols = SymbolTable::new();
        symbols.add_symbol("BASE", 0x2000, ".data").unwrap();
        symbols.add_symbol("COUNT", 8, ".text").unwrap();
        symbols
    }

    macro_rules! case {
        ($table:expr, $expr:expr, $value:expr) => {
            assert_eq!(
                Evaluator::new(&$table).evaluate($expr).unwrap(),
                $value,
                "expr: {}",
                $expr
            );
        };
    }

    #[test]
    fn precedence_and_parens() {
        let t = table();
        case!(t, "1 + 2 * 3", 7);
        case!(t, "(1 + 2) * 3", 9);
        case!(t, "10 - 4 / 2", 8);
        case!(t, "10 % 3", 1);
    }

    #[test]
    fn symbols_and_mixed_bases() {
        let t = table();
        case!(t, "BASE + 2", 0x2002);
        case!(t, "BASE + COUNT * 2", 0x2010);
        case!(t, "0x10 + 'A'", 16 + 65);
    }

    #[test]
    fn division_by_zero_rejected() {
        let t = table();
        assert!(matches!(
            Evaluator::new(&t).evaluate("5 / (COUNT - 8)"),
            Err(Error::DivisionByZero)
        ));
        assert!(matches!(
            Evaluator::new(&t).evaluate("5 % 0"),
            Err(Error::DivisionByZero)
        ));
    }

    #[test]
    fn errors_for_bad_input() {
        let t = table();
        assert!(matches!(
            Evaluator::new(&t).evaluate("MISSING + 1"),
            Err(Error::UnknownSymbol(_))
        ));
        assert!(matches!(
            Evaluator::new(&t).evaluate("(1 + 2"),
            Err(Error::UnclosedParen)
        ));
        assert!(Evaluator::new(&t).evaluate("").is_err());
    }
}
