use std::fmt;

/// Amounts are integer minor currency units (e.g. whole won, whole yen).
/// There is no fractional component anywhere in the ledger, so no decimal
/// arithmetic is needed.
pub type Amount = i64;

/// Format an amount with thousands separators.
/// Example: 1234567 -> "1,234,567", -500 -> "-500"
pub fn format_amount(amount: Amount) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let digits = amount.abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}", sign, grouped)
}

/// Parse an amount string into minor units.
/// Accepts plain integers and comma-grouped input.
/// Example: "45000" -> 45000, "45,000" -> 45000
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    let negative = input.starts_with('-');
    let input = input.trim_start_matches('-');

    if input.is_empty() {
        return Err(ParseAmountError::InvalidFormat);
    }

    let cleaned: String = input.chars().filter(|c| *c != ',').collect();
    let amount: i64 = cleaned
        .parse()
        .map_err(|_| ParseAmountError::InvalidFormat)?;

    Ok(if negative { -amount } else { amount })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    InvalidFormat,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::InvalidFormat => write!(f, "invalid amount format"),
        }
    }
}

impl std::error::Error for ParseAmountError {}
