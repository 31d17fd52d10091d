//! Грамматика даты и времени OFX.
//!
//! Формат: `YYYYMMDD[HHMMSS[.FFF]][[смещение[:ЗОНА]]]`. Смещение задается в
//! часах (`[-7]`, `[+1]`, `[1]`) или в часах и минутах (`[+09:30]`); имя зоны
//! только информационное и на момент времени не влияет. Без смещения время
//! считается UTC.

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::fmt;

/// Разобранная дата OFX.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDate {
    instant: DateTime<FixedOffset>,
    zone: Option<String>,
}

impl ParsedDate {
    /// Момент времени с исходным смещением.
    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.instant
    }

    /// Смещение от UTC в минутах (восток положительный).
    pub fn offset_minutes(&self) -> i32 {
        self.instant.offset().local_minus_utc() / 60
    }

    /// Имя зоны из скобок, если было указано.
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        self.instant.with_timezone(&Utc)
    }
}

impl fmt::Display for ParsedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.instant.to_rfc3339())?;
        if let Some(zone) = &self.zone {
            write!(f, " [{}]", zone)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ParsedDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}

/// Парсит дату OFX.
pub fn parse(input: &str) -> Result<ParsedDate> {
    let value = input.trim();
    let invalid = |reason: &str| Error::InvalidDate(format!("{}: '{}'", reason, value));

    let (stamp, bracket) = match value.find('[') {
        Some(pos) => (&value[..pos], Some(&value[pos..])),
        None => (value, None),
    };

    let (digits, fraction) = match stamp.split_once('.') {
        Some((digits, fraction)) => (digits, Some(fraction)),
        None => (stamp, None),
    };

    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("дата содержит нецифровые символы"));
    }

    let date = match digits.len() {
        8 | 14 => NaiveDate::from_ymd_opt(
            number(&digits[0..4]) as i32,
            number(&digits[4..6]),
            number(&digits[6..8]),
        )
        .ok_or_else(|| invalid("дата вне допустимого диапазона"))?,
        _ => return Err(invalid("ожидается 8 или 14 цифр")),
    };

    let millis = match fraction {
        None => 0,
        Some(_) if digits.len() == 8 => {
            return Err(invalid("доли секунды без времени"));
        }
        Some(f) if f.len() == 3 && f.bytes().all(|b| b.is_ascii_digit()) => number(f),
        Some(_) => return Err(invalid("доли секунды должны состоять из 3 цифр")),
    };

    let time = if digits.len() == 14 {
        NaiveTime::from_hms_milli_opt(
            number(&digits[8..10]),
            number(&digits[10..12]),
            number(&digits[12..14]),
            millis,
        )
        .ok_or_else(|| invalid("время вне допустимого диапазона"))?
    } else {
        NaiveTime::MIN
    };

    let (offset_seconds, zone) = match bracket {
        Some(bracket) => parse_offset(bracket).map_err(|reason| invalid(reason.as_str()))?,
        None => (0, None),
    };

    let offset =
        FixedOffset::east_opt(offset_seconds).ok_or_else(|| invalid("смещение вне диапазона"))?;
    let instant = offset
        .from_local_datetime(&NaiveDateTime::new(date, time))
        .single()
        .ok_or_else(|| invalid("неоднозначное время"))?;

    Ok(ParsedDate { instant, zone })
}

fn number(digits: &str) -> u32 {
    digits
        .bytes()
        .fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
}

/// Разбирает `[смещение[:ЗОНА]]`, возвращает смещение в секундах и имя зоны.
fn parse_offset(bracket: &str) -> std::result::Result<(i32, Option<String>), String> {
    let inner = bracket
        .strip_prefix('[')
        .and_then(|b| b.strip_suffix(']'))
        .ok_or("смещение должно быть заключено в квадратные скобки")?;

    let (sign, unsigned) = match inner.as_bytes().first() {
        Some(b'+') => (1, &inner[1..]),
        Some(b'-') => (-1, &inner[1..]),
        _ => (1, inner),
    };

    let (hours, rest) = match unsigned.split_once(':') {
        Some((hours, rest)) => (hours, Some(rest)),
        None => (unsigned, None),
    };

    // Двоеточие с цифрами - минуты смещения, с буквами - имя зоны.
    let (minutes, zone) = match rest {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => match rest.split_once(':') {
            Some((minutes, zone)) => (Some(minutes), Some(zone)),
            None => (Some(rest), None),
        },
        other => (None, other),
    };

    if hours.is_empty() || hours.len() > 2 || !hours.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("некорректные часы смещения '{}'", hours));
    }
    let hours = number(hours) as i32;
    if hours > 23 {
        return Err(format!("часы смещения вне диапазона: {}", hours));
    }

    let minutes = match minutes {
        Some(m) if m.len() == 2 && m.bytes().all(|b| b.is_ascii_digit()) => {
            let m = number(m) as i32;
            if m > 59 {
                return Err(format!("минуты смещения вне диапазона: {}", m));
            }
            m
        }
        Some(m) => return Err(format!("некорректные минуты смещения '{}'", m)),
        None => 0,
    };

    let zone = match zone {
        Some(zone) if zone.is_empty() => return Err("пустое имя зоны".to_string()),
        Some(zone) if zone.chars().any(|c| c.is_whitespace() || c == '[' || c == ']') => {
            return Err(format!("некорректное имя зоны '{}'", zone));
        }
        Some(zone) => Some(zone.to_string()),
        None => None,
    };

    Ok((sign * (hours * 3600 + minutes * 60), zone))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Timelike};
    use proptest::prelude::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn with_offset(seconds: i32, y: i32, m: u32, d: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(seconds)
            .unwrap()
            .with_ymd_and_hms(y, m, d, 0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_date_only_is_midnight_utc() {
        let date = parse("20050811").unwrap();
        assert_eq!(date.to_utc(), utc(2005, 8, 11, 0, 0, 0));
        assert_eq!(date.offset_minutes(), 0);
        assert_eq!(date.zone(), None);
    }

    #[test]
    fn test_date_time_is_utc() {
        let date = parse("20050811080530").unwrap();
        assert_eq!(date.to_utc(), utc(2005, 8, 11, 8, 5, 30));
    }

    #[test]
    fn test_milliseconds() {
        let date = parse("20050811080530.154").unwrap();
        assert_eq!(
            date.to_utc(),
            utc(2005, 8, 11, 8, 5, 30) + Duration::milliseconds(154)
        );
        assert_eq!(date.instant().nanosecond(), 154_000_000);
    }

    #[test]
    fn test_whole_hour_offsets() {
        let plus = parse("20050811000000.000[+1:CET]").unwrap();
        assert_eq!(plus.instant(), with_offset(3600, 2005, 8, 11));
        assert_eq!(plus.zone(), Some("CET"));
        assert_eq!(plus.offset_minutes(), 60);

        let unsigned = parse("20050811000000.000[1]").unwrap();
        assert_eq!(unsigned.instant(), with_offset(3600, 2005, 8, 11));
        assert_eq!(parse("20050811000000[+1]").unwrap(), unsigned);

        let minus = parse("20050811000000.000[-7:MST]").unwrap();
        assert_eq!(minus.instant(), with_offset(-7 * 3600, 2005, 8, 11));
        assert_eq!(
            minus.instant(),
            parse("20050811000000.000[-7]").unwrap().instant()
        );
    }

    #[test]
    fn test_fractional_offset() {
        let date = parse("20050811000000.000[+09:30]").unwrap();
        assert_eq!(date.instant(), with_offset(9 * 3600 + 30 * 60, 2005, 8, 11));
        assert_eq!(date.offset_minutes(), 570);
        assert_eq!(date.to_utc(), utc(2005, 8, 10, 14, 30, 0));
    }

    #[test]
    fn test_fractional_offset_with_zone() {
        let date = parse("20050811000000[+09:30:ACST]").unwrap();
        assert_eq!(date.offset_minutes(), 570);
        assert_eq!(date.zone(), Some("ACST"));
    }

    #[test]
    fn test_zone_never_changes_instant() {
        let named = parse("20240115120000[-5:PST]").unwrap();
        let bare = parse("20240115120000[-5]").unwrap();
        assert_eq!(named.instant(), bare.instant());
    }

    #[test]
    fn test_zero_offset_equals_no_offset() {
        let zero = parse("20240115120000[0:GMT]").unwrap();
        let none = parse("20240115120000").unwrap();
        assert_eq!(zero.instant(), none.instant());
    }

    #[test]
    fn test_date_only_with_offset() {
        let date = parse("20240115[-5:EST]").unwrap();
        assert_eq!(date.to_utc(), utc(2024, 1, 15, 5, 0, 0));
    }

    #[test]
    fn test_surrounding_whitespace() {
        assert!(parse(" 20240115 ").is_ok());
    }

    #[test]
    fn test_invalid_dates() {
        for input in [
            "",
            "2005081",
            "200508110",
            "202401151200",
            "20051311",
            "20050230",
            "20050811250000",
            "20050811086000",
            "20050811080530.15",
            "20050811.123",
            "2005O811",
            "20050811[]",
            "20050811[+]",
            "20050811[abc]",
            "20050811[+1:]",
            "20050811[+1",
            "20050811[+24]",
            "20050811[+09:75]",
            "20050811[+1]x",
        ] {
            let err = parse(input).unwrap_err();
            assert!(
                matches!(err, Error::InvalidDate(_)),
                "ожидалась ошибка даты для '{}'",
                input
            );
        }
    }

    #[test]
    fn test_from_str() {
        let date: ParsedDate = "20050824080000".parse().unwrap();
        assert_eq!(date.to_utc(), utc(2005, 8, 24, 8, 0, 0));
    }

    proptest! {
        #[test]
        fn prop_date_only_is_midnight(days in 0i64..80_000) {
            let day = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap() + Duration::days(days);
            let parsed = parse(&day.format("%Y%m%d").to_string()).unwrap();
            prop_assert_eq!(parsed.to_utc(), day.and_time(NaiveTime::MIN).and_utc());
            prop_assert_eq!(parsed.offset_minutes(), 0);
        }

        #[test]
        fn prop_millis_match_fraction(seconds in 0u32..86_400, millis in 0u32..1000) {
            let input = format!(
                "20240229{:02}{:02}{:02}.{:03}",
                seconds / 3600,
                seconds / 60 % 60,
                seconds % 60,
                millis
            );
            let parsed = parse(&input).unwrap();
            prop_assert_eq!(parsed.instant().nanosecond(), millis * 1_000_000);
            prop_assert_eq!(parsed.instant().num_seconds_from_midnight(), seconds);
        }
    }
}
