//! Hebrew-locale formatting helpers
//!
//! Output mirrors the `he-IL` conventions the backend's web pages use:
//! `dd.mm.yyyy` dates, 24-hour times, and shekel amounts with the sign after
//! the number.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

const SHEKEL: char = '₪';
/// Right-to-left mark prefixed to currency so the sign stays on the right
const RLM: char = '\u{200f}';
const NBSP: char = '\u{a0}';

/// How many fraction digits a shekel amount keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyStyle {
    /// Dashboard: rounded to whole shekels
    Whole,
    /// Patient records: agorot shown
    Fractional,
}

impl CurrencyStyle {
    fn digits(self) -> u32 {
        match self {
            CurrencyStyle::Whole => 0,
            CurrencyStyle::Fractional => 2,
        }
    }
}

pub fn format_currency(amount: f64, style: CurrencyStyle) -> String {
    if !amount.is_finite() {
        return "-".to_string();
    }
    let number = format_number(amount, style.digits());
    format!("{RLM}{number}{NBSP}{SHEKEL}")
}

/// Compact `₪1,234` label used on chart axes and bars
pub fn format_shekel_label(amount: f64) -> String {
    if !amount.is_finite() {
        return "-".to_string();
    }
    format!("{SHEKEL}{}", format_number(amount, 0))
}

/// Group thousands with commas and round half away from zero
fn format_number(amount: f64, digits: u32) -> String {
    let scale = 10u128.pow(digits);
    let scaled = (amount.abs() * scale as f64).round() as u128;
    let whole = scaled / scale;
    let fraction = scaled % scale;

    let mut grouped = String::new();
    let raw = whole.to_string();
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && scaled != 0 { "-" } else { "" };
    if digits == 0 {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{fraction:0width$}", width = digits as usize)
    }
}

/// Calendar value parsed from whatever the backend sent
enum Parsed {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

fn parse(value: &str) -> Option<Parsed> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(Parsed::DateTime(dt.with_timezone(&Local).naive_local()));
    }
    const PATTERNS: [&str; 6] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for pattern in PATTERNS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, pattern) {
            return Some(Parsed::DateTime(dt));
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok().map(Parsed::Date)
}

/// `2026-03-07` → `07.03.2026`. Empty input gives an empty string and
/// unparseable input is returned as-is.
pub fn format_date(value: &str) -> String {
    if value.trim().is_empty() {
        return String::new();
    }
    match parse(value) {
        Some(Parsed::Date(d)) => d.format("%d.%m.%Y").to_string(),
        Some(Parsed::DateTime(dt)) => dt.format("%d.%m.%Y").to_string(),
        None => value.to_string(),
    }
}

/// `2026-03-07T09:05:00` → `07.03.2026, 09:05`
pub fn format_datetime(value: &str) -> String {
    if value.trim().is_empty() {
        return String::new();
    }
    match parse(value) {
        Some(Parsed::Date(d)) => d.format("%d.%m.%Y, 00:00").to_string(),
        Some(Parsed::DateTime(dt)) => dt.format("%d.%m.%Y, %H:%M").to_string(),
        None => value.to_string(),
    }
}

pub fn format_time(at: &DateTime<Local>) -> String {
    at.format("%H:%M").to_string()
}

/// Escape text for insertion into HTML so it renders literally
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_currency_whole_rounds() {
        assert_eq!(format_currency(1234.5, CurrencyStyle::Whole), "\u{200f}1,235\u{a0}₪");
        assert_eq!(format_currency(0.0, CurrencyStyle::Whole), "\u{200f}0\u{a0}₪");
        assert_eq!(format_currency(1_000_000.0, CurrencyStyle::Whole), "\u{200f}1,000,000\u{a0}₪");
    }

    #[test]
    fn test_currency_fractional_keeps_agorot() {
        assert_eq!(format_currency(250.5, CurrencyStyle::Fractional), "\u{200f}250.50\u{a0}₪");
        assert_eq!(format_currency(1999.999, CurrencyStyle::Fractional), "\u{200f}2,000.00\u{a0}₪");
        assert_eq!(format_currency(-12.3, CurrencyStyle::Fractional), "\u{200f}-12.30\u{a0}₪");
    }

    #[test]
    fn test_currency_non_finite() {
        assert_eq!(format_currency(f64::NAN, CurrencyStyle::Whole), "-");
    }

    #[test]
    fn test_shekel_label() {
        assert_eq!(format_shekel_label(15300.0), "₪15,300");
        assert_eq!(format_shekel_label(999.4), "₪999");
    }

    #[test]
    fn test_format_date_variants() {
        assert_eq!(format_date("2026-03-07"), "07.03.2026");
        assert_eq!(format_date("2026-03-07T09:05:00"), "07.03.2026");
        assert_eq!(format_date("2026-03-07 09:05:00.123"), "07.03.2026");
        assert_eq!(format_date(""), "");
        assert_eq!(format_date("   "), "");
        assert_eq!(format_date("not a date"), "not a date");
    }

    #[test]
    fn test_format_datetime() {
        assert_eq!(format_datetime("2026-03-07T09:05:00"), "07.03.2026, 09:05");
        assert_eq!(format_datetime("2026-03-07"), "07.03.2026, 00:00");
        assert_eq!(format_datetime(""), "");
    }

    #[test]
    fn test_format_time() {
        let at = Local.with_ymd_and_hms(2026, 3, 7, 14, 3, 59).unwrap();
        assert_eq!(format_time(&at), "14:03");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
        );
        assert_eq!(escape_html("שלום"), "שלום");
    }
}
