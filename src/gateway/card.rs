//! Card number helpers: Luhn check, masking, brand and expiry parsing.

use crate::errors::{Result, VaultError};

/// Strip everything but ASCII digits (`"4111 1111-1111 1111"` -> `"4111111111111111"`).
pub fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Luhn checksum over the digits of `card_number`. No digits is invalid.
pub fn luhn_valid(card_number: &str) -> bool {
    let digits = digits_only(card_number);
    if digits.is_empty() {
        return false;
    }

    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// `"**** **** **** 1111"`. Four digits or fewer are returned unchanged.
pub fn mask_card(card_number: &str) -> String {
    let digits = digits_only(card_number);
    if digits.len() <= 4 {
        return digits;
    }
    format!("**** **** **** {}", &digits[digits.len() - 4..])
}

/// Best-effort brand from the leading digits.
pub fn detect_brand(card_number: &str) -> &'static str {
    let digits = digits_only(card_number);
    let prefix = |n: usize| digits.get(..n).and_then(|p| p.parse::<u32>().ok());

    match (prefix(1), prefix(2), prefix(4)) {
        (Some(4), _, _) => "VISA",
        (_, Some(34 | 37), _) => "AMEX",
        (_, Some(51..=55), _) => "MASTERCARD",
        (_, _, Some(2221..=2720)) => "MASTERCARD",
        (_, Some(65), _) | (_, _, Some(6011)) => "DISCOVER",
        _ => "CARD",
    }
}

/// Parse an `MM/YY` (or `MM/YYYY`) expiry into canonical `MM/YY`.
pub fn parse_expiry(input: &str) -> Result<String> {
    let invalid = || VaultError::InvalidInput(format!("expiry '{input}' is not MM/YY"));

    let (mm, yy) = input.trim().split_once('/').ok_or_else(invalid)?;
    let (mm, yy) = (mm.trim(), yy.trim());

    let month: u32 = mm.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) || mm.len() > 2 {
        return Err(invalid());
    }

    let year = match yy.len() {
        2 => yy,
        4 => &yy[2..],
        _ => return Err(invalid()),
    };
    if !year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    Ok(format!("{month:02}/{year}"))
}

/// Validate a card number for tokenization and return its digits.
pub fn normalize_card_number(input: &str) -> Result<String> {
    let digits = digits_only(input);
    if !(12..=19).contains(&digits.len()) {
        return Err(VaultError::InvalidInput(format!(
            "card number must have 12 to 19 digits, got {}",
            digits.len()
        )));
    }
    if !luhn_valid(&digits) {
        return Err(VaultError::InvalidInput(
            "card number fails the Luhn check".into(),
        ));
    }
    Ok(digits)
}
