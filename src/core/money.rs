use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Currency amounts on the roll are whole pesos.
pub type Amount = i64;

const THOUSAND: Decimal = dec!(1000);

/// Round to the nearest whole unit, ties to even.
pub fn round_to_unit(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
}

/// Round to the nearest multiple of 1000, ties to even.
///
/// `2500 -> 2000`, `3500 -> 4000`, `1698.0 -> 2000`.
pub fn round_to_thousand(value: Decimal) -> Option<Decimal> {
    let scaled = value.checked_div(THOUSAND)?;
    round_to_unit(scaled).checked_mul(THOUSAND)
}

/// Convert an already-rounded decimal into an integer amount.
pub fn to_amount(value: Decimal) -> Option<Amount> {
    if !value.fract().is_zero() {
        return None;
    }
    value.to_i64()
}

/// Parse a textual currency amount. Accepts integers and integral decimals
/// such as `1500.0`; surrounding whitespace is ignored.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(trimmed).ok())
}
