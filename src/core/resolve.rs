use super::exclusions::RecordError;
use super::limits::Limits;
use super::money::{round_to_unit, to_amount, Amount};
use super::policy::Policy;
use super::record::PropertyRecord;
use super::tariff::TariffRef;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which cap determined the billed tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WinningLimit {
    #[serde(rename = "limit_1")]
    Limit1,
    #[serde(rename = "limit_2")]
    Limit2,
    #[serde(rename = "limit_3")]
    Limit3,
    #[serde(rename = "none")]
    None,
}

impl WinningLimit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WinningLimit::Limit1 => "limit_1",
            WinningLimit::Limit2 => "limit_2",
            WinningLimit::Limit3 => "limit_3",
            WinningLimit::None => "none",
        }
    }
}

impl fmt::Display for WinningLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub winning_limit: WinningLimit,
    pub tax_amount: Amount,
    pub discount: Amount,
    pub payable_amount: Amount,
}

/// Pick the binding cap and apply the discount.
///
/// Without a tariff (`limit_1 == 0`) nothing is billed. Otherwise the
/// smallest applicable cap wins; `limit_3` only applies when the indicator
/// rate is positive. Ties go to the lower-numbered limit.
pub fn resolve(limits: &Limits, policy: &Policy) -> Result<Resolution, RecordError> {
    let (winning_limit, tax_amount) = if limits.limit_1 == 0 {
        (WinningLimit::None, 0)
    } else {
        let mut candidates = vec![
            (WinningLimit::Limit1, limits.limit_1),
            (WinningLimit::Limit2, limits.limit_2),
        ];
        if limits.indicator_rate > Decimal::ZERO {
            candidates.push((WinningLimit::Limit3, limits.limit_3));
        }
        // min_by_key keeps the first of equal minima
        candidates
            .into_iter()
            .min_by_key(|(_, amount)| *amount)
            .unwrap_or((WinningLimit::None, 0))
    };

    let discount = discount(tax_amount, policy.discount_rate)?;
    let payable_amount = tax_amount
        .checked_sub(discount)
        .ok_or_else(|| RecordError::overflow("payable_amount"))?;

    Ok(Resolution {
        winning_limit,
        tax_amount,
        discount,
        payable_amount,
    })
}

/// `round(tax * rate)`, ties to even.
pub fn discount(tax_amount: Amount, rate: Decimal) -> Result<Amount, RecordError> {
    Decimal::from(tax_amount)
        .checked_mul(rate)
        .map(round_to_unit)
        .and_then(to_amount)
        .ok_or_else(|| RecordError::overflow("discount"))
}

/// Final result for one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxComputation {
    pub record: PropertyRecord,
    /// Matched tariff; `None` when no schedule entry covers the property
    pub tariff: Option<TariffRef>,
    pub indicator_rate: Decimal,
    pub limit_1: Amount,
    pub limit_2: Amount,
    pub limit_3: Amount,
    pub winning_limit: WinningLimit,
    pub tax_amount: Amount,
    pub discount: Amount,
    pub payable_amount: Amount,
}

impl TaxComputation {
    pub fn new(
        record: PropertyRecord,
        tariff: Option<TariffRef>,
        limits: Limits,
        resolution: Resolution,
    ) -> Self {
        TaxComputation {
            record,
            tariff,
            indicator_rate: limits.indicator_rate,
            limit_1: limits.limit_1,
            limit_2: limits.limit_2,
            limit_3: limits.limit_3,
            winning_limit: resolution.winning_limit,
            tax_amount: resolution.tax_amount,
            discount: resolution.discount,
            payable_amount: resolution.payable_amount,
        }
    }

    pub fn tariff_id(&self) -> Option<u32> {
        self.tariff.map(|t| t.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn limits(indicator_rate: Decimal, l1: Amount, l2: Amount, l3: Amount) -> Limits {
        Limits {
            indicator_rate,
            limit_1: l1,
            limit_2: l2,
            limit_3: l3,
        }
    }

    fn run(limits: Limits) -> Resolution {
        resolve(&limits, &Policy::default()).unwrap()
    }

    #[test]
    fn no_tariff_bills_nothing() {
        let r = run(limits(dec!(13.20), 0, 2_000_000, 1_132_000));
        assert_eq!(r.winning_limit, WinningLimit::None);
        assert_eq!(r.tax_amount, 0);
        assert_eq!(r.discount, 0);
        assert_eq!(r.payable_amount, 0);
    }

    #[test]
    fn minimum_of_three_with_positive_indicator() {
        let r = run(limits(dec!(13.20), 1_042_600, 2_000_000, 1_132_000));
        assert_eq!(r.winning_limit, WinningLimit::Limit1);
        assert_eq!(r.tax_amount, 1_042_600);

        let r = run(limits(dec!(13.20), 1_500_000, 2_000_000, 1_132_000));
        assert_eq!(r.winning_limit, WinningLimit::Limit3);
        assert_eq!(r.tax_amount, 1_132_000);

        let r = run(limits(dec!(5.20), 1_500_000, 800_000, 1_132_000));
        assert_eq!(r.winning_limit, WinningLimit::Limit2);
        assert_eq!(r.tax_amount, 800_000);
    }

    #[test]
    fn limit_3_ignored_without_indicator() {
        let r = run(limits(dec!(0), 1_500_000, 2_000_000, 0));
        assert_eq!(r.winning_limit, WinningLimit::Limit1);
        assert_eq!(r.tax_amount, 1_500_000);

        let r = run(limits(dec!(0), 3_000_000, 2_000_000, 0));
        assert_eq!(r.winning_limit, WinningLimit::Limit2);
        assert_eq!(r.tax_amount, 2_000_000);
    }

    #[test]
    fn ties_go_to_lower_label() {
        let r = run(limits(dec!(13.20), 1_000_000, 1_000_000, 1_000_000));
        assert_eq!(r.winning_limit, WinningLimit::Limit1);

        let r = run(limits(dec!(13.20), 2_000_000, 1_000_000, 1_000_000));
        assert_eq!(r.winning_limit, WinningLimit::Limit2);
    }

    #[test]
    fn discount_and_payable() {
        let r = run(limits(dec!(13.20), 1_042_600, 2_000_000, 1_132_000));
        // 1_042_600 * 0.15 = 156_390
        assert_eq!(r.discount, 156_390);
        assert_eq!(r.payable_amount, 886_210);
    }

    #[test]
    fn discount_rounds_half_to_even() {
        // 10 * 0.15 = 1.5 -> 2 ; 30 * 0.15 = 4.5 -> 4
        assert_eq!(discount(10, dec!(0.15)), Ok(2));
        assert_eq!(discount(30, dec!(0.15)), Ok(4));
        assert_eq!(discount(0, dec!(0.15)), Ok(0));
    }

    #[test]
    fn winning_limit_labels() {
        assert_eq!(WinningLimit::Limit3.to_string(), "limit_3");
        assert_eq!(
            serde_json::to_string(&WinningLimit::None).unwrap(),
            "\"none\""
        );
    }
}
