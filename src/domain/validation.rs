//! Field validators and the input masks applied on every keystroke.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

pub static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

pub const TAX_ID_DIGITS: usize = 11;
pub const MAX_TAX_ID_LEN: usize = 14;
pub const MAX_CARD_NUMBER_LEN: usize = 19;
pub const MIN_CARD_DIGITS: usize = 13;
pub const MAX_CARD_DIGITS: usize = 19;
pub const MAX_EXPIRY_LEN: usize = 5;
pub const MIN_CVV_DIGITS: usize = 3;
pub const MAX_CVV_DIGITS: usize = 4;

pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Validates a CPF: eleven digits, not all equal, both check digits correct.
pub fn validate_tax_id(id: &str) -> bool {
    let digits: Vec<u32> = id.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() != TAX_ID_DIGITS {
        return false;
    }
    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    check_digit(&digits[..9]) == digits[9] && check_digit(&digits[..10]) == digits[10]
}

/// Weighted mod-11 check digit. Weights run from `len + 1` down to 2.
fn check_digit(digits: &[u32]) -> u32 {
    let top = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (top - i as u32))
        .sum();
    let remainder = sum % 11;
    if remainder < 2 { 0 } else { 11 - remainder }
}

/// Validates an "MM/YY" expiry against the month containing `today`.
///
/// A card expiring in the current month is still accepted.
pub fn validate_expiry(mm_yy: &str, today: NaiveDate) -> bool {
    if mm_yy.len() != MAX_EXPIRY_LEN {
        return false;
    }
    let Some((month, year)) = mm_yy.split_once('/') else {
        return false;
    };
    if month.len() != 2 || year.len() != 2 {
        return false;
    }
    let (Ok(month), Ok(year)) = (month.parse::<u32>(), year.parse::<i32>()) else {
        return false;
    };
    if !(1..=12).contains(&month) {
        return false;
    }

    (2000 + year, month) >= (today.year(), today.month())
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Masks a CPF as `000.000.000-00`.
pub fn format_tax_id(value: &str) -> String {
    let mut formatted = String::with_capacity(MAX_TAX_ID_LEN);
    for (i, c) in digits_only(value).chars().take(TAX_ID_DIGITS).enumerate() {
        match i {
            3 | 6 => formatted.push('.'),
            9 => formatted.push('-'),
            _ => {}
        }
        formatted.push(c);
    }
    formatted
}

/// Groups card digits by four, e.g. `4111 1111 1111 1111`.
pub fn format_card_number(value: &str) -> String {
    let mut formatted = String::with_capacity(MAX_CARD_NUMBER_LEN);
    for (i, c) in digits_only(value).chars().enumerate() {
        if i > 0 && i % 4 == 0 {
            formatted.push(' ');
        }
        formatted.push(c);
    }
    formatted.truncate(MAX_CARD_NUMBER_LEN);
    formatted
}

/// Inserts the slash once both month and year digits are present.
pub fn format_expiry(value: &str) -> String {
    let mut formatted = digits_only(value);
    if formatted.len() >= 4 {
        formatted.insert(2, '/');
    }
    formatted.truncate(MAX_EXPIRY_LEN);
    formatted
}

pub fn format_cvv(value: &str) -> String {
    let mut formatted = digits_only(value);
    formatted.truncate(MAX_CVV_DIGITS);
    formatted
}

/// Keeps letters (ASCII and Latin-1 accented) and whitespace.
pub fn sanitize_name(value: &str) -> String {
    value
        .chars()
        .filter(|c| {
            c.is_ascii_alphabetic() || ('\u{C0}'..='\u{FF}').contains(c) || c.is_whitespace()
        })
        .collect()
}

/// Renders an amount the Brazilian way, without the currency symbol: `250,80`.
pub fn format_brl(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded).replace('.', ",")
}
