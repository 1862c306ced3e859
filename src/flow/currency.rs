//! Currency amount parsing and display

use crate::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount must contain at least one digit")]
    NoDigits,
    #[error("Amount is too large")]
    TooLarge,
}

impl AmountError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Parse a user-entered amount into whole currency units
///
/// Non-numeric characters (symbols, separators, whitespace, signs, letters)
/// are ignored and the remaining digits are read as one number, so exponent
/// notation is not interpreted: `1e5` parses as 15. A decimal point ends the
/// integer part, so cents are dropped.
pub fn parse_amount(raw: &str) -> Result<u64, AmountError> {
    let whole = raw.split('.').next().unwrap_or_default();
    let digits: String = whole.chars().filter(char::is_ascii_digit).collect();

    if digits.is_empty() {
        return Err(AmountError::NoDigits);
    }

    digits.parse::<u64>().map_err(|_| AmountError::TooLarge)
}

/// Format an amount with a currency symbol and comma thousands separators
pub fn format_amount(symbol: &str, amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{symbol}{grouped}")
}
