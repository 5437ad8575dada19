//! Password generation and a simple strength score.

use rand::Rng;

use crate::errors::{Result, VaultError};

pub const SYMBOLS: &str = "!@#$%^&*()-_=+[]{};:,.<>?";

const LETTERS_AND_DIGITS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const MAX_GENERATED_LEN: usize = 256;

/// A random password of `length` characters from the OS-seeded CSPRNG.
pub fn generate_password(length: usize, symbols: bool) -> Result<String> {
    if length == 0 || length > MAX_GENERATED_LEN {
        return Err(VaultError::InvalidInput(format!(
            "password length must be between 1 and {MAX_GENERATED_LEN}"
        )));
    }

    let mut alphabet: Vec<char> = LETTERS_AND_DIGITS.chars().collect();
    if symbols {
        alphabet.extend(SYMBOLS.chars());
    }

    let mut rng = rand::rng();
    Ok((0..length)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())])
        .collect())
}

/// Score out of 5 plus what would improve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strength {
    pub score: u8,
    pub label: &'static str,
    pub notes: Vec<&'static str>,
}

/// Length (up to 2 points), mixed case, digits, symbols.
pub fn password_strength(password: &str) -> Strength {
    let mut score = 0u8;
    let mut notes = Vec::new();
    let len = password.chars().count();

    if len >= 12 {
        score += 2;
    } else if len >= 8 {
        score += 1;
    } else {
        notes.push("Too short (under 8 characters).");
    }

    if password.chars().any(char::is_lowercase) && password.chars().any(char::is_uppercase) {
        score += 1;
    } else {
        notes.push("Mix upper and lower case.");
    }

    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 1;
    } else {
        notes.push("Add digits.");
    }

    if password.chars().any(|c| SYMBOLS.contains(c)) {
        score += 1;
    } else {
        notes.push("Add symbols.");
    }

    let label = match score {
        0 => "Very weak",
        1 => "Weak",
        2 => "Moderate",
        3 => "Strong",
        _ => "Very strong",
    };

    Strength { score, label, notes }
}
