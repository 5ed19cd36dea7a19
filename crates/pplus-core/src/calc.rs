/*!
# Constant Expression Evaluator

Folds arithmetic over numeric literals at compile time. Used on `#define`
bodies, pattern-rule replacements and the inline `` \`expr\` `` form.

Supported: `+ - * / % ^`, parentheses, unary minus, the constants `π`, `pi`
and `e`, and sized integer literals such as `#FF:8h` or `#FF:-8h`.
*/

use regex::{Captures, Regex};
use tracing::trace;

use crate::diagnostics::{Diagnostics, SourceLocation};
use crate::error::CalcError;

/// Digits after the decimal point when no explicit scale is requested
pub const DEFAULT_PRECISION: usize = 10;

/// Result of evaluating an expression. Division by zero does not stop
/// evaluation; the offending operation yields 0 and the error is recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: f64,
    pub errors: Vec<CalcError>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Operator(char),
    Negate,
    Open,
    Close,
}

fn precedence(op: char) -> u8 {
    match op {
        '+' | '-' => 1,
        '*' | '/' | '%' => 2,
        '^' => 3,
        _ => 0,
    }
}

fn tokenize(expression: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = expression.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let expects_operand = matches!(
            tokens.last(),
            None | Some(Token::Operator(_)) | Some(Token::Negate) | Some(Token::Open)
        );

        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text.parse::<f64>().map_err(|_| CalcError::UnknownToken {
                    token: text.clone(),
                    expression: expression.to_string(),
                })?;
                tokens.push(Token::Number(value));
            }
            'π' => {
                tokens.push(Token::Number(std::f64::consts::PI));
                i += 1;
            }
            '-' if expects_operand => {
                tokens.push(Token::Negate);
                i += 1;
            }
            '+' if expects_operand => i += 1,
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Operator(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            c if c.is_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let value = match word.as_str() {
                    "pi" => std::f64::consts::PI,
                    "e" => std::f64::consts::E,
                    _ => {
                        return Err(CalcError::UnknownToken {
                            token: word,
                            expression: expression.to_string(),
                        })
                    }
                };
                tokens.push(Token::Number(value));
            }
            other => {
                return Err(CalcError::UnknownToken {
                    token: other.to_string(),
                    expression: expression.to_string(),
                })
            }
        }
    }

    Ok(tokens)
}

/// Shunting-yard conversion to postfix order
fn to_postfix(tokens: Vec<Token>, expression: &str) -> Result<Vec<Token>, CalcError> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Number(_) => output.push(token),
            Token::Negate | Token::Open => stack.push(token),
            Token::Operator(op) => {
                while let Some(&top) = stack.last() {
                    let pops = match top {
                        Token::Negate => true,
                        Token::Operator(other) => precedence(other) >= precedence(op),
                        _ => false,
                    };
                    if !pops {
                        break;
                    }
                    output.push(top);
                    stack.pop();
                }
                stack.push(token);
            }
            Token::Close => loop {
                match stack.pop() {
                    Some(Token::Open) => break,
                    Some(top) => output.push(top),
                    None => return Err(CalcError::MissingOpenParen(expression.to_string())),
                }
            },
        }
    }

    while let Some(top) = stack.pop() {
        if top == Token::Open {
            return Err(CalcError::MissingCloseParen(expression.to_string()));
        }
        output.push(top);
    }

    Ok(output)
}

fn apply(op: char, a: f64, b: f64, errors: &mut Vec<CalcError>) -> f64 {
    match op {
        '+' => a + b,
        '-' => a - b,
        '*' => a * b,
        '/' | '%' if b == 0.0 => {
            errors.push(CalcError::DivisionByZero);
            0.0
        }
        '/' => a / b,
        '%' => {
            let r = a % b;
            if r < 0.0 {
                r + b.abs()
            } else {
                r
            }
        }
        '^' => a.powf(b),
        _ => 0.0,
    }
}

/// Evaluate an arithmetic expression.
///
/// Sized literals must already be normalized to decimal.
pub fn evaluate(expression: &str) -> Result<Evaluation, CalcError> {
    let tokens = tokenize(expression)?;
    if !tokens.iter().any(|t| matches!(t, Token::Number(_))) {
        return Err(CalcError::Malformed(expression.to_string()));
    }

    let postfix = to_postfix(tokens, expression)?;
    let mut errors = Vec::new();
    let mut stack: Vec<f64> = Vec::new();
    let malformed = || CalcError::Malformed(expression.to_string());

    for token in postfix {
        match token {
            Token::Number(n) => stack.push(n),
            Token::Negate => {
                let a = stack.pop().ok_or_else(malformed)?;
                stack.push(-a);
            }
            Token::Operator(op) => {
                let b = stack.pop().ok_or_else(malformed)?;
                let a = stack.pop().ok_or_else(malformed)?;
                stack.push(apply(op, a, b, &mut errors));
            }
            Token::Open | Token::Close => return Err(malformed()),
        }
    }

    match stack.as_slice() {
        [value] => Ok(Evaluation {
            value: *value,
            errors,
        }),
        _ => Err(malformed()),
    }
}

/// Fixed-point rendering with trailing zeros (and a trailing `.`) trimmed
pub fn format_number(value: f64, precision: usize) -> String {
    let text = format!("{value:.precision$}");
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    };
    if text == "-0" {
        "0".to_string()
    } else {
        text
    }
}

fn sized_literal_regex() -> &'static Regex {
    static_regex!(r"#([0-9A-F]+)(?::(-)?(\d+))?([bodh])?\b")
}

fn inline_regex() -> &'static Regex {
    static_regex!(r"\\`([^`]+)`(?::(?:(-)?(\d+)([bodh])?|([fcr])))?")
}

fn radix(base: Option<&str>) -> u32 {
    match base {
        Some("b") => 2,
        Some("o") => 8,
        Some("h") => 16,
        _ => 10,
    }
}

fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Decimal value of a sized literal's digits
pub fn sized_literal_value(digits: &str, signed: bool, width: u32, base: Option<&str>) -> Option<String> {
    let raw = u64::from_str_radix(digits, radix(base)).ok()?;
    let width = if width == 0 { 64 } else { width };
    let unsigned = raw & mask(width);

    if signed && width < 64 && unsigned & (1u64 << (width - 1)) != 0 {
        let value = unsigned as i128 - (1i128 << width);
        Some(value.to_string())
    } else if signed && width == 64 {
        Some((unsigned as i64).to_string())
    } else {
        Some(unsigned.to_string())
    }
}

/// Width of a sized literal or suffix, if it is one the calculator supports
fn literal_width(literal: &str, width: &str, errors: &mut Vec<CalcError>) -> Option<u32> {
    match width.parse::<u32>() {
        Ok(width @ 1..=64) => Some(width),
        _ => {
            errors.push(CalcError::LiteralWidth {
                literal: literal.to_string(),
                width: width.to_string(),
            });
            None
        }
    }
}

/// Replace every sized integer literal by its decimal value.
///
/// A literal whose width is outside `1..=64` stays as written and is
/// reported in `errors`.
pub fn normalize_sized_literals(text: &str, errors: &mut Vec<CalcError>) -> String {
    sized_literal_regex()
        .replace_all(text, |caps: &Captures| {
            let width = match caps.get(3) {
                Some(width) => match literal_width(&caps[0], width.as_str(), errors) {
                    Some(width) => width,
                    None => return caps[0].to_string(),
                },
                None => 64,
            };
            sized_literal_value(
                &caps[1],
                caps.get(2).is_some(),
                width,
                caps.get(4).map(|m| m.as_str()),
            )
            .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn record(errors: Vec<CalcError>, diagnostics: &mut Diagnostics, location: &SourceLocation) {
    for error in errors {
        diagnostics.error(location.clone(), format!("calc: {error}"));
    }
}

/// Fold `text` to a number if it is a constant arithmetic expression.
///
/// Text that contains anything other than numbers, operators and the known
/// constants is returned unchanged. A malformed expression is reported.
pub fn evaluate_math_expression(text: &str, diagnostics: &mut Diagnostics, location: &SourceLocation) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return text.to_string();
    }

    let mut width_errors = Vec::new();
    let normalized = normalize_sized_literals(trimmed, &mut width_errors);
    if !width_errors.is_empty() {
        record(width_errors, diagnostics, location);
        return text.to_string();
    }
    match evaluate(&normalized) {
        Ok(evaluation) => {
            record(evaluation.errors, diagnostics, location);
            let folded = format_number(evaluation.value, DEFAULT_PRECISION);
            trace!("folded '{}' to {}", trimmed, folded);
            folded
        }
        Err(CalcError::UnknownToken { .. }) => text.to_string(),
        Err(CalcError::Malformed(_)) if !normalized.chars().any(|c| c.is_ascii_digit()) => text.to_string(),
        Err(e) => {
            diagnostics.error(location.clone(), format!("calc: {e}"));
            text.to_string()
        }
    }
}

fn render_integer(value: f64, negative: bool, width: u32, base: &str) -> String {
    let bits = (value.trunc() as i64) as u64 & mask(width);
    let digits = match base {
        "b" => format!("{bits:b}"),
        "o" => format!("{bits:o}"),
        "h" => format!("{bits:0>pad$X}", pad = (width as usize).div_ceil(4)),
        _ => {
            if negative {
                (value.trunc() as i64).to_string()
            } else {
                bits.to_string()
            }
        }
    };
    let sign = if negative { "-" } else { "" };
    format!("#{digits}:{sign}{width}{base}")
}

/// Fold every inline `` \`expr\` `` form, with its optional `:suffix`.
///
/// `:[-]<width><b|o|d|h>` renders a sized integer literal, `:<digits>` sets
/// a fixed decimal scale, `:f`, `:c` and `:r` floor, ceil or round.
pub fn fold_inline_expressions(text: &str, diagnostics: &mut Diagnostics, location: &SourceLocation) -> String {
    if !text.contains("\\`") {
        return text.to_string();
    }

    let mut errors = Vec::new();
    let folded = inline_regex()
        .replace_all(text, |caps: &Captures| {
            let expression = normalize_sized_literals(&caps[1], &mut errors);
            let value = match evaluate(&expression) {
                Ok(evaluation) => {
                    errors.extend(evaluation.errors);
                    evaluation.value
                }
                Err(e) => {
                    errors.push(e);
                    0.0
                }
            };

            match (caps.get(3), caps.get(4)) {
                (Some(width), Some(base)) => match literal_width(&caps[0], width.as_str(), &mut errors) {
                    Some(width) => render_integer(value, caps.get(2).is_some(), width, base.as_str()),
                    None => caps[0].to_string(),
                },
                (Some(scale), None) => {
                    let precision: usize = scale.as_str().parse().unwrap_or(DEFAULT_PRECISION);
                    format!("{value:.precision$}")
                }
                _ => {
                    let value = match caps.get(5).map(|m| m.as_str()) {
                        Some("f") => value.floor(),
                        Some("c") => value.ceil(),
                        Some("r") => value.round(),
                        _ => value,
                    };
                    format_number(value, DEFAULT_PRECISION)
                }
            }
        })
        .into_owned();

    record(errors, diagnostics, location);
    folded
}
