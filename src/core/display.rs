use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

const RUPEE: &str = "\u{20b9}";

pub fn calculate_progress(current: Decimal, target: Decimal) -> u32 {
    if target <= Decimal::ZERO {
        return 100;
    }
    let Some(percent) = current
        .checked_div(target)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
    else {
        return 100;
    };
    let rounded = percent.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    rounded
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
        .to_u32()
        .unwrap_or(100)
}

// Floored first, so paise never round up.
pub fn format_currency(amount: Decimal) -> String {
    let floored = amount.floor();
    let negative = floored.is_sign_negative() && !floored.is_zero();
    let digits = floored.abs().trunc().to_string();

    let grouped = group_indian(&digits);
    if negative {
        format!("-{RUPEE}{grouped}")
    } else {
        format!("{RUPEE}{grouped}")
    }
}

// Last three digits form one group; the rest are grouped in pairs.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);

    let mut groups = Vec::with_capacity(head.len() / 2 + 2);
    let lead = head.len() % 2;
    if lead > 0 {
        groups.push(&head[..lead]);
    }
    let mut start = lead;
    while start < head.len() {
        groups.push(&head[start..start + 2]);
        start += 2;
    }
    groups.push(tail);
    groups.join(",")
}
