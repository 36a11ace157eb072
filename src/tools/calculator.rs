//! Calculator tool: safe arithmetic evaluation.
//!
//! Expressions are tokenized and evaluated by a small recursive-descent
//! parser that only knows numbers, `+ - * / ** % //` and parentheses. There
//! is no way to reach names, calls or attributes, so nothing but arithmetic
//! can run.
//!
//! Integers stay exact until an operation forces a float: `/` always
//! produces a float, `//` floors, `%` follows the sign of the
//! divisor, and `**` is right-associative and binds tighter than unary minus.

use anyhow::Result;
use serde_json::{json, Value};
use thiserror::Error;

use super::{str_arg, Tool};

/// Unary signs and parentheses nested deeper than this are rejected.
const MAX_DEPTH: usize = 200;

pub struct CalculatorTool;

#[async_trait::async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate a safe arithmetic expression (+,-,*,/,**,%,//, parentheses)."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": { "type": "string" }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let expression = str_arg(&input, "expression")?;
        let value = evaluate(expression)?;
        Ok(json!({ "result": value.to_string() }))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CalcError {
    #[error("Unsafe expression")]
    Unsafe,
    #[error("invalid syntax")]
    Syntax,
    #[error("{0}")]
    Arithmetic(&'static str),
}

/// Either an exact integer or a float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) => write!(f, "{}", format_float(x)),
        }
    }
}

/// Shortest round-trip form, always with a decimal point or a signed two-digit exponent.
fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".into();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf".into() } else { "-inf".into() };
    }
    let magnitude = x.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let sci = format!("{x:e}");
        let (mantissa, exp) = sci.split_once('e').unwrap_or((&sci, "0"));
        let (sign, digits) = match exp.strip_prefix('-') {
            Some(d) => ('-', d),
            None => ('+', exp),
        };
        return format!("{mantissa}e{sign}{digits:0>2}");
    }
    let plain = format!("{x}");
    if plain.contains('.') {
        plain
    } else {
        format!("{plain}.0")
    }
}

/// Evaluates an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<Number, CalcError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(CalcError::Syntax);
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let (number, next) = lex_number(&chars, i)?;
                tokens.push(Token::Num(number));
                i = next;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::DoubleStar);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                tokens.push(Token::DoubleSlash);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            _ => return Err(CalcError::Unsafe),
        }
    }
    Ok(tokens)
}

/// Lexes `digits[.digits][e[+-]digits]` (underscores allowed between digits).
fn lex_number(chars: &[char], start: usize) -> Result<(Number, usize), CalcError> {
    let mut i = start;
    let mut text = String::new();
    let mut is_float = false;

    let take_digits = |i: &mut usize, text: &mut String| {
        let before = text.len();
        while *i < chars.len() && (chars[*i].is_ascii_digit() || chars[*i] == '_') {
            if chars[*i] != '_' {
                text.push(chars[*i]);
            }
            *i += 1;
        }
        text.len() > before
    };

    let int_digits = take_digits(&mut i, &mut text);
    if i < chars.len() && chars[i] == '.' {
        is_float = true;
        text.push('.');
        i += 1;
        let frac_digits = take_digits(&mut i, &mut text);
        if !int_digits && !frac_digits {
            return Err(CalcError::Syntax);
        }
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        is_float = true;
        text.push('e');
        i += 1;
        if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
            text.push(chars[i]);
            i += 1;
        }
        if !take_digits(&mut i, &mut text) {
            return Err(CalcError::Syntax);
        }
    }
    if i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '.') {
        return Err(CalcError::Syntax);
    }

    let number = if is_float {
        Number::Float(text.parse().map_err(|_| CalcError::Syntax)?)
    } else {
        match text.parse::<i64>() {
            Ok(n) => Number::Int(n),
            Err(_) => Number::Float(text.parse().map_err(|_| CalcError::Syntax)?),
        }
    };
    Ok((number, i))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Number, CalcError> {
        let mut left = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let right = self.term()?;
            left = binary(op, left, right)?;
        }
        Ok(left)
    }

    // term := factor (('*' | '/' | '//' | '%') factor)*
    fn term(&mut self) -> Result<Number, CalcError> {
        let mut left = self.factor()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::DoubleSlash | Token::Percent)) =
            self.peek()
        {
            self.pos += 1;
            let right = self.factor()?;
            left = binary(op, left, right)?;
        }
        Ok(left)
    }

    // Every recursive path passes through here, once per sign or paren.
    fn factor(&mut self) -> Result<Number, CalcError> {
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::Arithmetic("expression too deeply nested"));
        }
        self.depth += 1;
        let value = self.unary();
        self.depth -= 1;
        value
    }

    // factor := ('+' | '-') factor | power
    fn unary(&mut self) -> Result<Number, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(match self.factor()? {
                    Number::Int(i) => i
                        .checked_neg()
                        .map(Number::Int)
                        .unwrap_or(Number::Float(-(i as f64))),
                    Number::Float(f) => Number::Float(-f),
                })
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.factor()
            }
            _ => self.power(),
        }
    }

    // power := atom ('**' factor)?
    fn power(&mut self) -> Result<Number, CalcError> {
        let base = self.atom()?;
        if self.peek() == Some(Token::DoubleStar) {
            self.pos += 1;
            let exponent = self.factor()?;
            return binary(Token::DoubleStar, base, exponent);
        }
        Ok(base)
    }

    // atom := number | '(' expr ')'
    fn atom(&mut self) -> Result<Number, CalcError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(CalcError::Syntax),
                }
            }
            _ => Err(CalcError::Syntax),
        }
    }
}

fn binary(op: Token, left: Number, right: Number) -> Result<Number, CalcError> {
    use Number::{Float, Int};

    let value = match (op, left, right) {
        (Token::Plus, Int(a), Int(b)) => a.checked_add(b).map_or(Float(a as f64 + b as f64), Int),
        (Token::Minus, Int(a), Int(b)) => a.checked_sub(b).map_or(Float(a as f64 - b as f64), Int),
        (Token::Star, Int(a), Int(b)) => a.checked_mul(b).map_or(Float(a as f64 * b as f64), Int),
        (Token::Plus, a, b) => Float(a.as_f64() + b.as_f64()),
        (Token::Minus, a, b) => Float(a.as_f64() - b.as_f64()),
        (Token::Star, a, b) => Float(a.as_f64() * b.as_f64()),
        (Token::Slash, a, b) => {
            if b.as_f64() == 0.0 {
                return Err(CalcError::Arithmetic("division by zero"));
            }
            Float(a.as_f64() / b.as_f64())
        }
        (Token::DoubleSlash, Int(a), Int(b)) => {
            if b == 0 {
                return Err(CalcError::Arithmetic("integer division or modulo by zero"));
            }
            match a.checked_div(b) {
                Some(q) if a % b != 0 && ((a < 0) != (b < 0)) => Int(q - 1),
                Some(q) => Int(q),
                None => Float((a as f64 / b as f64).floor()),
            }
        }
        (Token::DoubleSlash, a, b) => {
            if b.as_f64() == 0.0 {
                return Err(CalcError::Arithmetic("float floor division by zero"));
            }
            Float((a.as_f64() / b.as_f64()).floor())
        }
        (Token::Percent, Int(a), Int(b)) => {
            if b == 0 {
                return Err(CalcError::Arithmetic("integer division or modulo by zero"));
            }
            let r = a.checked_rem(b).unwrap_or(0);
            Int(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r })
        }
        (Token::Percent, a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            if b == 0.0 {
                return Err(CalcError::Arithmetic("float modulo"));
            }
            let r = a % b;
            Float(if r != 0.0 && ((r < 0.0) != (b < 0.0)) { r + b } else { r })
        }
        (Token::DoubleStar, Int(a), Int(b)) if b >= 0 => u32::try_from(b)
            .ok()
            .and_then(|e| a.checked_pow(e))
            .map_or(Float((a as f64).powf(b as f64)), Int),
        (Token::DoubleStar, a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            if a == 0.0 && b < 0.0 {
                return Err(CalcError::Arithmetic(
                    "0.0 cannot be raised to a negative power",
                ));
            }
            let result = a.powf(b);
            if result.is_nan() && !a.is_nan() && !b.is_nan() {
                return Err(CalcError::Arithmetic("complex results are not supported"));
            }
            Float(result)
        }
        _ => return Err(CalcError::Syntax),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> String {
        evaluate(expr).unwrap().to_string()
    }

    #[test]
    fn test_integer_arithmetic_stays_exact() {
        assert_eq!(eval("1 + 2 * 3"), "7");
        assert_eq!(eval("(1 + 2) * 3"), "9");
        assert_eq!(eval("2 ** 10"), "1024");
        assert_eq!(eval("10 - 4 - 3"), "3");
    }

    #[test]
    fn test_true_division_is_float() {
        assert_eq!(eval("7 / 2"), "3.5");
        assert_eq!(eval("4 / 2"), "2.0");
        assert_eq!(eval("0.1 + 0.2"), "0.30000000000000004");
    }

    #[test]
    fn test_floor_division_and_modulo_follow_divisor_sign() {
        assert_eq!(eval("7 // 2"), "3");
        assert_eq!(eval("-7 // 2"), "-4");
        assert_eq!(eval("7 % 3"), "1");
        assert_eq!(eval("-7 % 3"), "2");
        assert_eq!(eval("7 % -3"), "-2");
        assert_eq!(eval("7.5 // 2"), "3.0");
    }

    #[test]
    fn test_power_precedence_and_associativity() {
        assert_eq!(eval("-2 ** 2"), "-4");
        assert_eq!(eval("2 ** 3 ** 2"), "512");
        assert_eq!(eval("2 ** -1"), "0.5");
        assert_eq!(eval("(-2) ** 2"), "4");
    }

    #[test]
    fn test_float_formatting() {
        assert_eq!(eval("1e20 * 1"), "1e+20");
        assert_eq!(eval("1 / 100000"), "1e-05");
        assert_eq!(eval("2.50"), "2.5");
    }

    #[test]
    fn test_integer_overflow_falls_back_to_float() {
        assert_eq!(eval("2 ** 64"), "1.8446744073709552e+19");
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        assert_eq!(
            evaluate("1 / 0"),
            Err(CalcError::Arithmetic("division by zero"))
        );
        assert!(evaluate("5 // 0").is_err());
        assert!(evaluate("5 % 0").is_err());
    }

    #[test]
    fn test_unsafe_input_is_rejected() {
        assert_eq!(evaluate("__import__('os')"), Err(CalcError::Unsafe));
        assert_eq!(evaluate("abs(-1)"), Err(CalcError::Unsafe));
        assert_eq!(evaluate("1 < 2"), Err(CalcError::Unsafe));
    }

    #[test]
    fn test_malformed_input_is_a_syntax_error() {
        assert_eq!(evaluate(""), Err(CalcError::Syntax));
        assert_eq!(evaluate("1 +"), Err(CalcError::Syntax));
        assert_eq!(evaluate("(1 + 2"), Err(CalcError::Syntax));
        assert_eq!(evaluate("1 2"), Err(CalcError::Syntax));
        assert_eq!(evaluate("1..2"), Err(CalcError::Syntax));
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let nested = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let too_deep = Err(CalcError::Arithmetic("expression too deeply nested"));
        assert_eq!(evaluate(&nested), too_deep);
        assert_eq!(evaluate(&format!("{}1", "-".repeat(100_000))), too_deep);
        assert_eq!(evaluate(&format!("2 ** {}2", "-".repeat(100_000))), too_deep);

        let shallow = format!("{}7{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(eval(&shallow), "7");
        assert_eq!(eval(&format!("{}1", "-".repeat(100))), "1");
    }

    #[tokio::test]
    async fn test_tool_wraps_result() {
        let out = CalculatorTool
            .execute(json!({"expression": "6 * 7"}))
            .await
            .unwrap();
        assert_eq!(out, json!({"result": "42"}));
    }
}
