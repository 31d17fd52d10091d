//! Разбор денежных сумм OFX.
//!
//! Суммы записываются с точкой в качестве десятичного разделителя, без
//! разделителей тысяч и символов валют, независимо от локали.

use crate::error::{Error, Result};
use rust_decimal::Decimal;

/// Парсит сумму вида `[+-]цифры[.цифры]` в десятичное число.
pub fn parse_amount(input: &str) -> Result<Decimal> {
    let value = input.trim();
    let invalid = || Error::InvalidAmount(format!("'{}'", value));

    let unsigned = value
        .strip_prefix('-')
        .or_else(|| value.strip_prefix('+'))
        .unwrap_or(value);

    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let well_formed = match fraction {
        Some(fraction) => {
            all_digits(whole) && all_digits(fraction) && !(whole.is_empty() && fraction.is_empty())
        }
        None => !whole.is_empty() && all_digits(whole),
    };
    if !well_formed {
        return Err(invalid());
    }

    let mut normalized = String::with_capacity(value.len() + 1);
    if value.starts_with('-') {
        normalized.push('-');
    }
    normalized.push_str(if whole.is_empty() { "0" } else { whole });
    if let Some(fraction) = fraction.filter(|f| !f.is_empty()) {
        normalized.push('.');
        normalized.push_str(fraction);
    }

    Decimal::from_str_exact(&normalized).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("-80").unwrap(), dec!(-80));
        assert_eq!(parse_amount("350.00").unwrap(), dec!(350.00));
        assert_eq!(parse_amount("+12.5").unwrap(), dec!(12.5));
        assert_eq!(parse_amount(" -0.99 ").unwrap(), dec!(-0.99));
        assert_eq!(parse_amount(".50").unwrap(), dec!(0.50));
        assert_eq!(parse_amount("10.").unwrap(), dec!(10));
    }

    #[test]
    fn test_keeps_scale() {
        assert_eq!(parse_amount("350.00").unwrap().to_string(), "350.00");
    }

    #[test]
    fn test_rejects_locale_formats() {
        for input in ["", "-", ".", "1,000.00", "12,50", "$10", "1 000", "1e3", "--1", "1.2.3", "1_000"] {
            let err = parse_amount(input).unwrap_err();
            assert!(
                matches!(err, Error::InvalidAmount(_)),
                "ожидалась ошибка суммы для '{}'",
                input
            );
        }
    }
}
