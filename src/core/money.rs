//! Price parsing and formatting in integer minor units
//!
//! Prices are stored as cents and never touch floating point. The wizard
//! accepts decimal input ("3.50", "3,50", "4") and rounds anything beyond
//! two fractional digits to the nearest cent.

use crate::core::config;
use crate::core::error::{AppError, AppResult};

/// Parse a user-entered price into cents.
///
/// Accepts `.` or `,` as decimal separator. The price must be strictly
/// positive and below `config::validation::MAX_PRICE_CENTS`.
pub fn parse_price_cents(input: &str) -> AppResult<i64> {
    let trimmed = input.trim().replace(',', ".");
    if trimmed.is_empty() {
        return Err(AppError::Validation("Price cannot be empty".to_string()));
    }

    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed.as_str(), ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(AppError::Validation(format!("'{}' is not a valid price", input.trim())));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(format!("'{}' is not a valid price", input.trim())));
    }

    let whole_value: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| AppError::Validation(format!("'{}' is not a valid price", input.trim())))?
    };

    // Two fractional digits are cents; the third decides rounding.
    let mut frac_digits = frac.chars();
    let d1 = frac_digits.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as i64;
    let d2 = frac_digits.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as i64;
    let d3 = frac_digits.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as i64;

    let mut cents = whole_value
        .checked_mul(100)
        .and_then(|v| v.checked_add(d1 * 10 + d2))
        .ok_or_else(|| AppError::Validation("Price is too large".to_string()))?;
    if d3 >= 5 {
        cents += 1;
    }

    if cents <= 0 {
        return Err(AppError::Validation("Price must be greater than zero".to_string()));
    }
    if cents > config::validation::MAX_PRICE_CENTS {
        return Err(AppError::Validation("Price is too large".to_string()));
    }

    Ok(cents)
}

/// Format cents as a decimal money string, e.g. 350 -> "3.50".
pub fn format_cents(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, (cents % 100).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_number() {
        assert_eq!(parse_price_cents("4").unwrap(), 400);
        assert_eq!(parse_price_cents(" 12 ").unwrap(), 1200);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_price_cents("3.50").unwrap(), 350);
        assert_eq!(parse_price_cents("3.5").unwrap(), 350);
        assert_eq!(parse_price_cents("0.99").unwrap(), 99);
        assert_eq!(parse_price_cents(".50").unwrap(), 50);
    }

    #[test]
    fn test_parse_comma_separator() {
        assert_eq!(parse_price_cents("3,50").unwrap(), 350);
    }

    #[test]
    fn test_rounds_to_nearest_cent() {
        assert_eq!(parse_price_cents("1.005").unwrap(), 101);
        assert_eq!(parse_price_cents("1.004").unwrap(), 100);
        assert_eq!(parse_price_cents("2.999").unwrap(), 300);
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(parse_price_cents("0").is_err());
        assert!(parse_price_cents("0.00").is_err());
        assert!(parse_price_cents("0.004").is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_price_cents("").is_err());
        assert!(parse_price_cents("abc").is_err());
        assert!(parse_price_cents("-3").is_err());
        assert!(parse_price_cents("3.5.0").is_err());
        assert!(parse_price_cents("3 50").is_err());
        assert!(parse_price_cents(".").is_err());
    }

    #[test]
    fn test_rejects_absurd_price() {
        assert!(parse_price_cents("99999999").is_err());
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(350), "3.50");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(1000), "10.00");
        assert_eq!(format_cents(0), "0.00");
    }
}
