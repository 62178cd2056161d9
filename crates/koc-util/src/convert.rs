//! Numeric literal conversion.
//!
//! Integer literals come in bases 2, 8, 10, and 16 with optional `_`
//! separators. Float literals are a decimal integer part, a period, and a
//! fractional part. The tokenizer guarantees the character set, so the
//! only failure mode left here is overflow.

use thiserror::Error;

/// Literal conversion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("integer literal does not fit into 64 bits")]
    IntOverflow,
    #[error("float literal is not finite")]
    FloatOverflow,
}

/// Parse an integer literal into its 64-bit value.
///
/// Accepts `0x`, `0o`, and `0b` prefixes and `_` separators anywhere in
/// the digits.
///
/// # Examples
///
/// ```
/// use koc_util::convert::parse_u64;
///
/// assert_eq!(parse_u64("1_000"), Ok(1000));
/// assert_eq!(parse_u64("0xFF"), Ok(255));
/// assert_eq!(parse_u64("0b1010"), Ok(10));
/// assert_eq!(parse_u64("0o55"), Ok(45));
/// assert!(parse_u64("18446744073709551616").is_err());
/// ```
pub fn parse_u64(text: &str) -> Result<u64, ConvertError> {
    let bytes = text.as_bytes();

    let (digits, radix) = if bytes.len() >= 2 && bytes[0] == b'0' {
        match bytes[1] {
            b'x' => (&text[2..], 16),
            b'o' => (&text[2..], 8),
            b'b' => (&text[2..], 2),
            _ => (text, 10),
        }
    } else {
        (text, 10)
    };

    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() {
        // "0x" with no digits lexes as a number token; treat it as zero.
        return Ok(0);
    }

    u64::from_str_radix(&cleaned, radix).map_err(|_| ConvertError::IntOverflow)
}

/// Parse a float literal into an `f64`.
///
/// Underscore separators are stripped before parsing; infinite results
/// are rejected.
pub fn parse_f64(text: &str) -> Result<f64, ConvertError> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ConvertError::FloatOverflow),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal() {
        assert_eq!(parse_u64("0"), Ok(0));
        assert_eq!(parse_u64("12345"), Ok(12345));
        assert_eq!(parse_u64("1_2__3__4___5"), Ok(12345));
        assert_eq!(parse_u64("18446744073709551615"), Ok(u64::MAX));
        assert_eq!(parse_u64("18446744073709551616"), Err(ConvertError::IntOverflow));
    }

    #[test]
    fn test_bases() {
        assert_eq!(parse_u64("0b001"), Ok(1));
        assert_eq!(parse_u64("0xFF"), Ok(255));
        assert_eq!(parse_u64("0xAB_CD"), Ok(0xABCD));
        assert_eq!(parse_u64("0o55"), Ok(45));
        assert_eq!(parse_u64("0x"), Ok(0));
        assert_eq!(
            parse_u64("0xFFFFFFFFFFFFFFFFF"),
            Err(ConvertError::IntOverflow)
        );
    }

    #[test]
    fn test_float() {
        assert_eq!(parse_f64("1.5"), Ok(1.5));
        assert_eq!(parse_f64("12345.0"), Ok(12345.0));
        assert_eq!(parse_f64("5.0_0__0"), Ok(5.0));
    }
}
