//! Lossless conversion between human decimal strings and on-chain integers.
//!
//! Both DGT and the native currency carry 18 fractional digits. Every amount
//! that crosses into a contract call goes through [`parse_units`], and every
//! amount shown to the player goes through [`format_units`] or
//! [`format_fixed`]. Nothing here touches floating point.

pub use ethnum::U256;

pub const TOKEN_DECIMALS: u32 = 18;
pub const ETHER_DECIMALS: u32 = 18;

/// Largest bet accepted by the game machines, in whole DGT before scaling.
pub const MAX_BET_TOKENS: u64 = 10_000;

/// DGT minted per 1 ETH by `buyTokens`.
pub const DEFAULT_TOKENS_PER_ETH: u64 = 100_000;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UnitsError {
    #[error("amount is empty")]
    Empty,
    #[error("amount must not be negative: {0}")]
    Negative(String),
    #[error("invalid decimal amount: {0}")]
    Invalid(String),
    #[error("amount {input} has more than {decimals} fractional digits")]
    TooPrecise { input: String, decimals: u32 },
    #[error("amount {0} does not fit in 256 bits")]
    Overflow(String),
}

/// `10^decimals`, or `None` past the 256-bit range.
pub fn ten_pow(decimals: u32) -> Option<U256> {
    let ten = U256::from(10u8);
    let mut acc = U256::ONE;
    for _ in 0..decimals {
        acc = acc.checked_mul(ten)?;
    }
    Some(acc)
}

pub fn parse_units(input: &str, decimals: u32) -> Result<U256, UnitsError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UnitsError::Empty);
    }
    if trimmed.starts_with('-') {
        return Err(UnitsError::Negative(trimmed.to_string()));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(UnitsError::Invalid(trimmed.to_string()));
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return Err(UnitsError::Invalid(trimmed.to_string()));
    }

    // Trailing zeros past the supported precision carry no value.
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(UnitsError::TooPrecise {
            input: trimmed.to_string(),
            decimals,
        });
    }

    let overflow = || UnitsError::Overflow(trimmed.to_string());
    let scale = ten_pow(decimals).ok_or_else(overflow)?;
    let whole_value = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).map_err(|_| overflow())?
    };
    let fraction_value = if fraction.is_empty() {
        U256::ZERO
    } else {
        let padded = format!("{fraction:0<width$}", width = decimals as usize);
        U256::from_str_radix(&padded, 10).map_err(|_| overflow())?
    };

    whole_value
        .checked_mul(scale)
        .and_then(|scaled| scaled.checked_add(fraction_value))
        .ok_or_else(overflow)
}

/// Exact inverse of [`parse_units`]. Always keeps at least one fractional
/// digit, so `10^18` formats as `"1.0"`.
pub fn format_units(value: U256, decimals: u32) -> String {
    let Some(scale) = ten_pow(decimals) else {
        return value.to_string();
    };
    if decimals == 0 {
        return value.to_string();
    }
    let whole = value / scale;
    let fraction = value % scale;
    let fraction = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Display form rounded half-up to `places` fractional digits.
pub fn format_fixed(value: U256, decimals: u32, places: u32) -> String {
    let places = places.min(decimals);
    let (Some(drop_scale), Some(keep_scale)) = (ten_pow(decimals - places), ten_pow(places))
    else {
        return value.to_string();
    };
    let half = drop_scale / U256::from(2u8);
    let rounded = value.saturating_add(half) / drop_scale;
    if places == 0 {
        return rounded.to_string();
    }
    let whole = rounded / keep_scale;
    let fraction = rounded % keep_scale;
    format!(
        "{whole}.{:0>width$}",
        fraction.to_string(),
        width = places as usize
    )
}

pub fn parse_ether(input: &str) -> Result<U256, UnitsError> {
    parse_units(input, ETHER_DECIMALS)
}

pub fn format_ether(value: U256) -> String {
    format_units(value, ETHER_DECIMALS)
}

pub fn parse_tokens(input: &str) -> Result<U256, UnitsError> {
    parse_units(input, TOKEN_DECIMALS)
}

pub fn format_tokens(value: U256) -> String {
    format_units(value, TOKEN_DECIMALS)
}

/// One whole DGT in base units.
pub fn one_token() -> U256 {
    U256::new(1_000_000_000_000_000_000)
}

/// Whole tokens to base units, saturating at `U256::MAX`.
pub fn tokens(whole: u64) -> U256 {
    U256::from(whole).saturating_mul(one_token())
}

/// Whole ETH to wei, saturating at `U256::MAX`.
pub fn ether(whole: u64) -> U256 {
    U256::from(whole).saturating_mul(U256::new(1_000_000_000_000_000_000))
}

/// Narrowing that refuses to truncate.
pub fn to_u64(value: U256) -> Option<u64> {
    if value > U256::from(u64::MAX) {
        None
    } else {
        Some(value.as_u64())
    }
}
