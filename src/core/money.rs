use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};

use super::error::EngineError;

pub const MONTHS_PER_YEAR: u32 = 12;

const MONEY_DP: u32 = 2;
const RATE_DP: u32 = 6;

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_DP, RoundingStrategy::MidpointAwayFromZero)
}

pub fn raw_monthly_rate(annual_rate_percent: Decimal) -> Decimal {
    annual_rate_percent / Decimal::from(MONTHS_PER_YEAR) / Decimal::ONE_HUNDRED
}

pub fn monthly_rate(annual_rate_percent: Decimal) -> Decimal {
    round_rate(raw_monthly_rate(annual_rate_percent))
}

pub fn percent_factor(percent: Decimal) -> Decimal {
    Decimal::ONE + percent / Decimal::ONE_HUNDRED
}

pub fn months_in(years: u32) -> Result<u32, EngineError> {
    years
        .checked_mul(MONTHS_PER_YEAR)
        .ok_or_else(|| EngineError::InvalidInput(format!("{years} years is too long a horizon")))
}

pub fn checked_pow(base: Decimal, exp: u32, what: &'static str) -> Result<Decimal, EngineError> {
    base.checked_powu(u64::from(exp))
        .ok_or(EngineError::Overflow(what))
}

pub fn checked_mul(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal, EngineError> {
    a.checked_mul(b).ok_or(EngineError::Overflow(what))
}

pub fn checked_add(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal, EngineError> {
    a.checked_add(b).ok_or(EngineError::Overflow(what))
}

// Sum of factor^k for k in 0..periods.
pub fn level_growth_sum(
    factor: Decimal,
    periods: u32,
    what: &'static str,
) -> Result<Decimal, EngineError> {
    let mut sum = Decimal::ZERO;
    let mut power = Decimal::ONE;
    for _ in 0..periods {
        sum = checked_add(sum, power, what)?;
        power = checked_mul(power, factor, what)?;
    }
    Ok(sum)
}
