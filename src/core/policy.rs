use super::money::Amount;
use super::record::Stratum;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Regulatory constants for one billing period.
///
/// Every field has a default matching the current period, so a policy file
/// only needs to list what changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct Policy {
    /// Valuation threshold (SSMLV reference) separating the low-stratum rate
    pub ssmlv_threshold: Amount,
    /// Strata eligible for the low-stratum rate
    pub low_strata: Vec<u8>,
    /// Indicator rate (percent) for low strata at or under the threshold
    #[schemars(with = "f64")]
    pub low_stratum_rate: Decimal,
    /// Indicator rate (percent) for properties not in arrears
    #[schemars(with = "f64")]
    pub standard_rate: Decimal,
    /// Fraction of the tax granted as discount
    #[schemars(with = "f64")]
    pub discount_rate: Decimal,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            ssmlv_threshold: 192_172_500,
            low_strata: vec![1, 2],
            low_stratum_rate: dec!(5.20),
            standard_rate: dec!(13.20),
            discount_rate: dec!(0.15),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("ssmlv threshold must not be negative: {0}")]
    NegativeThreshold(Amount),
    #[error("{name} must not be negative: {value}")]
    NegativeRate { name: &'static str, value: Decimal },
    #[error("discount rate must be between 0 and 1: {0}")]
    DiscountOutOfRange(Decimal),
    #[error("low stratum {0} is not a stratum level (1-9)")]
    InvalidStratum(u8),
}

impl Policy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.ssmlv_threshold < 0 {
            return Err(PolicyError::NegativeThreshold(self.ssmlv_threshold));
        }
        for (name, value) in [
            ("low stratum rate", self.low_stratum_rate),
            ("standard rate", self.standard_rate),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(PolicyError::NegativeRate { name, value });
            }
        }
        if self.discount_rate < Decimal::ZERO || self.discount_rate > Decimal::ONE {
            return Err(PolicyError::DiscountOutOfRange(self.discount_rate));
        }
        if let Some(level) = self
            .low_strata
            .iter()
            .copied()
            .find(|l| Stratum::from_level(*l).is_none())
        {
            return Err(PolicyError::InvalidStratum(level));
        }
        Ok(())
    }

    pub fn is_low_stratum(&self, stratum: Stratum) -> bool {
        stratum
            .level()
            .is_some_and(|level| self.low_strata.contains(&level))
    }
}

/// Read and validate a policy file.
pub fn read_policy_json<R: Read>(reader: R) -> anyhow::Result<Policy> {
    let policy: Policy = serde_json::from_reader(reader)?;
    policy.validate()?;
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_current_period() {
        let policy = Policy::default();
        assert_eq!(policy.ssmlv_threshold, 192172500);
        assert_eq!(policy.low_stratum_rate, dec!(5.20));
        assert_eq!(policy.standard_rate, dec!(13.20));
        assert_eq!(policy.discount_rate, dec!(0.15));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let policy = read_policy_json(r#"{"ssmlv_threshold": 200000000}"#.as_bytes()).unwrap();
        assert_eq!(policy.ssmlv_threshold, 200000000);
        assert_eq!(policy.low_strata, vec![1, 2]);
        assert_eq!(policy.discount_rate, dec!(0.15));
    }

    #[test]
    fn rates_read_exactly() {
        let policy =
            read_policy_json(r#"{"standard_rate": "13.20", "discount_rate": 0.1}"#.as_bytes())
                .unwrap();
        assert_eq!(policy.standard_rate, dec!(13.20));
        assert_eq!(policy.discount_rate, dec!(0.1));
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(read_policy_json(r#"{"ssmlv": 1}"#.as_bytes()).is_err());
    }

    #[test]
    fn validation_errors() {
        let policy = Policy {
            discount_rate: dec!(1.5),
            ..Default::default()
        };
        assert_eq!(
            policy.validate(),
            Err(PolicyError::DiscountOutOfRange(dec!(1.5)))
        );

        let policy = Policy {
            ssmlv_threshold: -1,
            ..Default::default()
        };
        assert_eq!(policy.validate(), Err(PolicyError::NegativeThreshold(-1)));

        let policy = Policy {
            low_strata: vec![1, 0],
            ..Default::default()
        };
        assert_eq!(policy.validate(), Err(PolicyError::InvalidStratum(0)));

        let policy = Policy {
            standard_rate: dec!(-1),
            ..Default::default()
        };
        assert_eq!(
            policy.validate(),
            Err(PolicyError::NegativeRate {
                name: "standard rate",
                value: dec!(-1)
            })
        );
    }

    #[test]
    fn low_stratum_membership() {
        let policy = Policy::default();
        assert!(policy.is_low_stratum(Stratum::Level(1)));
        assert!(policy.is_low_stratum(Stratum::Level(2)));
        assert!(!policy.is_low_stratum(Stratum::Level(3)));
        assert!(!policy.is_low_stratum(Stratum::Unassigned));
    }
}
