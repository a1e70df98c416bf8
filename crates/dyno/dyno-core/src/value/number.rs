//! Decimal numbers kept as their original text.
//!
//! The store transmits numbers as decimal strings of up to 38 significant
//! digits. Holding the text avoids the precision loss of an `f64` round trip;
//! numeric interpretation happens on demand.

use std::fmt;
use std::str::FromStr;

use crate::errors::ValueError;

/// Largest exponent magnitude accepted in a number literal.
const MAX_EXPONENT: i64 = 400;

/// A number represented by its decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Number {
    text: String,
}

impl Number {
    /// Parse and validate a decimal literal (`-12`, `3.50`, `1e3`, `.5`).
    pub fn parse(text: &str) -> Result<Self, ValueError> {
        let trimmed = text.trim();
        validate_literal(trimmed)?;
        Ok(Self {
            text: trimmed.to_string(),
        })
    }

    /// The text exactly as received.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether the value has no fractional part.
    pub fn is_integral(&self) -> bool {
        !self.to_plain_decimal().contains('.')
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.to_plain_decimal().parse().ok()
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.to_plain_decimal().parse().ok()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.text.parse::<f64>().ok().filter(|f| f.is_finite())
    }

    /// Canonical plain decimal text: no exponent, no leading zeros, no
    /// trailing fractional zeros, and `0` for any zero.
    pub fn to_plain_decimal(&self) -> String {
        let (negative, unsigned) = match self.text.as_bytes().first() {
            Some(b'-') => (true, &self.text[1..]),
            Some(b'+') => (false, &self.text[1..]),
            _ => (false, self.text.as_str()),
        };

        let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
            Some(pos) => (
                &unsigned[..pos],
                unsigned[pos + 1..].parse::<i64>().unwrap_or(0),
            ),
            None => (unsigned, 0),
        };

        let (int_part, frac_part) = match mantissa.find('.') {
            Some(pos) => (&mantissa[..pos], &mantissa[pos + 1..]),
            None => (mantissa, ""),
        };

        let mut digits: String = format!("{int_part}{frac_part}");
        let mut point = int_part.len() as i64 + exponent;

        let leading = digits.len() - digits.trim_start_matches('0').len();
        digits.drain(..leading);
        point -= leading as i64;

        if digits.is_empty() {
            return "0".to_string();
        }

        let len = digits.len() as i64;
        let (int_digits, frac_digits) = if point <= 0 {
            ("0".to_string(), format!("{}{digits}", "0".repeat((-point) as usize)))
        } else if point >= len {
            (format!("{digits}{}", "0".repeat((point - len) as usize)), String::new())
        } else {
            let (i, f) = digits.split_at(point as usize);
            (i.to_string(), f.to_string())
        };

        let frac_digits = frac_digits.trim_end_matches('0');
        let mut out = String::with_capacity(int_digits.len() + frac_digits.len() + 2);
        if negative {
            out.push('-');
        }
        out.push_str(&int_digits);
        if !frac_digits.is_empty() {
            out.push('.');
            out.push_str(frac_digits);
        }
        out
    }
}

fn validate_literal(text: &str) -> Result<(), ValueError> {
    let invalid = || ValueError::InvalidNumber {
        text: text.to_string(),
    };

    let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(pos) => (&unsigned[..pos], Some(&unsigned[pos + 1..])),
        None => (unsigned, None),
    };

    let mut seen_digit = false;
    let mut seen_point = false;
    for c in mantissa.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_point => seen_point = true,
            _ => return Err(invalid()),
        }
    }
    if !seen_digit {
        return Err(invalid());
    }

    if let Some(exp) = exponent {
        let digits = exp.strip_prefix(['-', '+']).unwrap_or(exp);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let magnitude = digits
            .parse::<i64>()
            .map_err(|_| ValueError::ExponentOutOfRange {
                text: text.to_string(),
            })?;
        if magnitude > MAX_EXPONENT {
            return Err(ValueError::ExponentOutOfRange {
                text: text.to_string(),
            });
        }
    }
    Ok(())
}

impl FromStr for Number {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Self { text: n.to_string() }
    }
}

impl From<i32> for Number {
    fn from(n: i32) -> Self {
        Self { text: n.to_string() }
    }
}

impl From<u64> for Number {
    fn from(n: u64) -> Self {
        Self { text: n.to_string() }
    }
}

impl TryFrom<f64> for Number {
    type Error = ValueError;

    fn try_from(f: f64) -> Result<Self, Self::Error> {
        if !f.is_finite() {
            return Err(ValueError::NonFinite);
        }
        // `Display` for f64 never switches to exponent notation.
        Ok(Self { text: f.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> String {
        Number::parse(text).unwrap().to_plain_decimal()
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "-", "abc", "1.2.3", "1e", "1e+", "--1", "0x10", "1 2"] {
            assert!(Number::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_parse_keeps_original_text() {
        let n = Number::parse(" 12345678901234567890123456789 ").unwrap();
        assert_eq!(n.as_str(), "12345678901234567890123456789");
    }

    #[test]
    fn test_plain_decimal_normalizes() {
        assert_eq!(plain("42"), "42");
        assert_eq!(plain("007"), "7");
        assert_eq!(plain("3.50"), "3.5");
        assert_eq!(plain("3.0"), "3");
        assert_eq!(plain("1e3"), "1000");
        assert_eq!(plain("1.5E-3"), "0.0015");
        assert_eq!(plain("-0.0"), "0");
        assert_eq!(plain("-12.340"), "-12.34");
        assert_eq!(plain(".5"), "0.5");
        assert_eq!(plain("+8"), "8");
    }

    #[test]
    fn test_integral_and_conversions() {
        assert!(Number::parse("10.000").unwrap().is_integral());
        assert!(!Number::parse("10.01").unwrap().is_integral());
        assert_eq!(Number::parse("2e2").unwrap().as_i64(), Some(200));
        assert_eq!(Number::parse("2.5").unwrap().as_i64(), None);
        assert_eq!(Number::parse("2.5").unwrap().as_f64(), Some(2.5));
    }

    #[test]
    fn test_exponent_out_of_range() {
        assert!(matches!(
            Number::parse("1e9999"),
            Err(ValueError::ExponentOutOfRange { .. })
        ));
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(Number::try_from(0.25).unwrap().as_str(), "0.25");
        assert_eq!(Number::try_from(1e21).unwrap().to_plain_decimal(), "1000000000000000000000");
        assert!(Number::try_from(f64::NAN).is_err());
    }
}
