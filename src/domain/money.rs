//! Amount parsing and bounds validation for recharge values.
//!
//! Amounts are carried as integer cents everywhere; user input arrives as
//! locale-formatted strings ("1.234,56", "R$ 50", "50.00") and is parsed
//! here before anything else touches it.

use serde::Deserialize;

use crate::error::{AppError, Result};

/// Inclusive recharge bounds, in cents. Values come from configuration;
/// the defaults match the primary flow (5.00 to 10000.00).
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct RechargeLimits {
    pub min_cents: i64,
    pub max_cents: i64,
}

impl Default for RechargeLimits {
    fn default() -> Self {
        Self {
            min_cents: 500,
            max_cents: 1_000_000,
        }
    }
}

impl RechargeLimits {
    pub fn new(min_cents: i64, max_cents: i64) -> Self {
        Self {
            min_cents,
            max_cents,
        }
    }

    /// Applied at submission time even when the amount came from a preset
    /// button, since presets bypass free-text parsing.
    pub fn validate(&self, cents: i64) -> Result<()> {
        if cents <= 0 {
            return Err(AppError::InvalidAmount(
                "Amount must be greater than zero".to_string(),
            ));
        }
        if cents < self.min_cents {
            return Err(AppError::InvalidAmount(format!(
                "Minimum recharge is {}",
                format_amount(self.min_cents)
            )));
        }
        if cents > self.max_cents {
            return Err(AppError::InvalidAmount(format!(
                "Maximum recharge is {}",
                format_amount(self.max_cents)
            )));
        }
        Ok(())
    }
}

/// Parses a user-entered currency string into cents.
///
/// Comma is the decimal separator; dots are thousands separators, except
/// when a dot is the only separator present and is followed by one or two
/// digits ("50.00" typed on an international keyboard).
pub fn parse_amount(input: &str) -> Result<i64> {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidAmount(format!(
            "Not a number: {:?}",
            input
        )));
    }

    let (integer_part, fraction_part) = split_decimal(&cleaned)?;

    let whole: i64 = if integer_part.is_empty() {
        0
    } else {
        integer_part
            .parse()
            .map_err(|_| AppError::InvalidAmount(format!("Not a number: {:?}", input)))?
    };

    let cents_fraction: i64 = match fraction_part.len() {
        0 => 0,
        1 => {
            let d: i64 = fraction_part
                .parse()
                .map_err(|_| AppError::InvalidAmount(format!("Not a number: {:?}", input)))?;
            d * 10
        }
        2 => fraction_part
            .parse()
            .map_err(|_| AppError::InvalidAmount(format!("Not a number: {:?}", input)))?,
        _ => {
            return Err(AppError::InvalidAmount(format!(
                "Too many decimal places: {:?}",
                input
            )))
        }
    };

    whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(cents_fraction))
        .ok_or_else(|| AppError::InvalidAmount(format!("Amount out of range: {:?}", input)))
}

/// Splits a cleaned numeric string into integer and fraction digit runs,
/// resolving which separator (if any) is the decimal one.
fn split_decimal(cleaned: &str) -> Result<(String, String)> {
    let has_comma = cleaned.contains(',');
    let has_dot = cleaned.contains('.');

    let decimal_sep = if has_comma {
        if cleaned.matches(',').count() > 1 {
            return Err(AppError::InvalidAmount(format!(
                "Malformed amount: {:?}",
                cleaned
            )));
        }
        Some(',')
    } else if has_dot {
        // A single dot with 1-2 trailing digits reads as a decimal point;
        // anything else is thousands grouping.
        let after_last = cleaned.rsplit('.').next().unwrap_or("");
        let dot_count = cleaned.matches('.').count();
        if dot_count == 1 && (1..=2).contains(&after_last.len()) {
            Some('.')
        } else {
            None
        }
    } else {
        None
    };

    match decimal_sep {
        Some(sep) => {
            let idx = cleaned
                .rfind(sep)
                .ok_or_else(|| AppError::InvalidAmount(cleaned.to_string()))?;
            let (head, tail) = cleaned.split_at(idx);
            let integer: String = head.chars().filter(|c| c.is_ascii_digit()).collect();
            let fraction: String = tail[1..].chars().filter(|c| c.is_ascii_digit()).collect();
            if tail[1..].chars().any(|c| !c.is_ascii_digit()) {
                return Err(AppError::InvalidAmount(format!(
                    "Malformed amount: {:?}",
                    cleaned
                )));
            }
            Ok((integer, fraction))
        }
        None => {
            let integer: String = cleaned.chars().filter(|c| c.is_ascii_digit()).collect();
            Ok((integer, String::new()))
        }
    }
}

/// Formats cents for display ("50,00").
pub fn format_amount(cents: i64) -> String {
    format!("{},{:02}", cents / 100, (cents % 100).abs())
}

/// Cents as the fractional decimal the wire format expects.
pub fn cents_to_decimal(cents: i64) -> f64 {
    cents as f64 / 100.0
}
