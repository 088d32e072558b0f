// Numeric cell parsing
//
// The only path from cell content to a number. Total: anything that does
// not contain a number reads as zero.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::table::CellValue;

/// Parsed cell number. Integer-looking input stays an integer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub const ZERO: Number = Number::Int(0);

    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(f) => f,
        }
    }

    /// Truncates floats toward zero
    pub fn as_i64(self) -> i64 {
        match self {
            Number::Int(n) => n,
            Number::Float(f) => f as i64,
        }
    }
}

impl From<Number> for f64 {
    fn from(n: Number) -> f64 {
        n.as_f64()
    }
}

impl From<Number> for CellValue {
    fn from(n: Number) -> CellValue {
        match n {
            Number::Int(i) => CellValue::Int(i),
            Number::Float(f) => CellValue::Float(f),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{}", n),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[-+]?\d+(?:\.\d*)?").expect("valid number pattern"))
}

/// Parse a cell. Numeric cells pass through unchanged; text goes through
/// [`parse_number_str`]; empty cells are zero.
pub fn parse_number(value: &CellValue) -> Number {
    match value {
        CellValue::Empty => Number::ZERO,
        CellValue::Int(n) => Number::Int(*n),
        CellValue::Float(f) if f.is_finite() => Number::Float(*f),
        CellValue::Float(_) => Number::ZERO,
        CellValue::Text(s) => parse_number_str(s),
    }
}

/// Parse free text such as "1 000", "1,000", "12.5 Ar" or "$1,234.56".
///
/// Spaces and comma thousand separators are stripped, then the first
/// signed decimal run is taken.
pub fn parse_number_str(raw: &str) -> Number {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return Number::ZERO;
    }

    let Some(m) = number_pattern().find(&cleaned) else {
        return Number::ZERO;
    };
    let text = m.as_str();

    if text.contains('.') {
        match text.parse::<f64>() {
            Ok(f) if f.is_finite() => Number::Float(f),
            _ => Number::ZERO,
        }
    } else {
        // Digit runs too long for i64 still have a float reading
        match text.parse::<i64>() {
            Ok(n) => Number::Int(n),
            Err(_) => text
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Number::Float)
                .unwrap_or(Number::ZERO),
        }
    }
}
