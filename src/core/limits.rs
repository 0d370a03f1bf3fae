use super::exclusions::RecordError;
use super::money::{round_to_thousand, round_to_unit, to_amount, Amount};
use super::policy::Policy;
use super::record::{PortfolioFlag, PropertyRecord};
use super::tariff::TariffRef;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The prior period's tax may at most double.
pub const PRIOR_TAX_MULTIPLIER: Amount = 2;

/// The three candidate caps for one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Percentage applied to the prior tax for the third cap (0 disables it)
    pub indicator_rate: Decimal,
    /// Current valuation times tariff rate; 0 when no tariff matched
    pub limit_1: Amount,
    /// Prior tax times [`PRIOR_TAX_MULTIPLIER`]
    pub limit_2: Amount,
    /// Prior tax grown by the indicator rate, to the nearest thousand
    pub limit_3: Amount,
}

/// Indicator rate decision table. Rules are tried in order, first hit wins:
///
/// 1. low stratum, valuation <= threshold: low stratum rate
/// 2. low stratum, valuation > threshold, not in arrears: standard rate
/// 3. other stratum, valuation > 0, not in arrears: standard rate
/// 4. in arrears: 0
/// 5. not in arrears: standard rate
/// 6. otherwise (flag unknown): 0
#[allow(clippy::if_same_then_else)]
pub fn indicator_rate(record: &PropertyRecord, policy: &Policy) -> Decimal {
    let low_stratum = policy.is_low_stratum(record.stratum_current);
    let valuation = record.valuation_current;
    let threshold = policy.ssmlv_threshold;
    let flag = record.portfolio_flag;

    if low_stratum && valuation <= threshold {
        policy.low_stratum_rate
    } else if low_stratum && valuation > threshold && flag == Some(PortfolioFlag::N) {
        policy.standard_rate
    } else if !low_stratum && valuation > 0 && flag == Some(PortfolioFlag::N) {
        policy.standard_rate
    } else if flag == Some(PortfolioFlag::Y) {
        Decimal::ZERO
    } else if flag == Some(PortfolioFlag::N) {
        policy.standard_rate
    } else {
        Decimal::ZERO
    }
}

/// `round(valuation * rate)`, or 0 without a tariff.
pub fn limit_1(record: &PropertyRecord, tariff: Option<&TariffRef>) -> Result<Amount, RecordError> {
    let Some(tariff) = tariff else {
        return Ok(0);
    };
    record
        .valuation_current_decimal()
        .checked_mul(tariff.rate)
        .map(round_to_unit)
        .and_then(to_amount)
        .ok_or_else(|| RecordError::overflow("limit_1"))
}

pub fn limit_2(record: &PropertyRecord) -> Result<Amount, RecordError> {
    record
        .prior_tax_base
        .checked_mul(PRIOR_TAX_MULTIPLIER)
        .ok_or_else(|| RecordError::overflow("limit_2"))
}

/// Prior tax grown by `indicator_rate` percent, rounded to the nearest
/// thousand. 0 when the indicator rate is not positive.
pub fn limit_3(record: &PropertyRecord, indicator_rate: Decimal) -> Result<Amount, RecordError> {
    if indicator_rate <= Decimal::ZERO {
        return Ok(0);
    }
    let growth = Decimal::ONE + indicator_rate / Decimal::ONE_HUNDRED;
    Decimal::from(record.prior_tax_base)
        .checked_mul(growth)
        .and_then(round_to_thousand)
        .and_then(to_amount)
        .ok_or_else(|| RecordError::overflow("limit_3"))
}

pub fn calculate_limits(
    record: &PropertyRecord,
    tariff: Option<&TariffRef>,
    policy: &Policy,
) -> Result<Limits, RecordError> {
    let indicator_rate = indicator_rate(record, policy);
    Ok(Limits {
        indicator_rate,
        limit_1: limit_1(record, tariff)?,
        limit_2: limit_2(record)?,
        limit_3: limit_3(record, indicator_rate)?,
    })
}
