//! Property tests for the computation invariants

use predial::core::{
    normalize, resolve, Limits, Policy, RawPropertyRow, Stratum, TariffIndex, TariffSchedule,
    TariffScheduleInput, WinningLimit,
};
use predial::core::tariff::{OneOrMany, TariffEntryInput};
use proptest::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;

fn limits(indicator_positive: bool) -> impl Strategy<Value = Limits> {
    (
        0i64..1_000_000_000,
        0i64..1_000_000_000,
        0i64..1_000_000_000,
    )
        .prop_map(move |(limit_1, limit_2, limit_3)| Limits {
            indicator_rate: if indicator_positive {
                Decimal::new(1320, 2)
            } else {
                Decimal::ZERO
            },
            limit_1,
            limit_2,
            limit_3: if indicator_positive { limit_3 } else { 0 },
        })
}

fn raw_row(object_number: String, valuation: u32, stratum: String, flag: &str) -> RawPropertyRow {
    RawPropertyRow {
        object_number: Some(object_number),
        valuation_prior: Some(valuation.to_string()),
        usage_prior: Some("1".to_string()),
        activity_prior: Some("1".to_string()),
        stratum_prior: Some(stratum.clone()),
        prior_tax_base: Some((valuation / 100).to_string()),
        valuation_current: Some(format!("{}.5", valuation)),
        usage_current: Some("2".to_string()),
        activity_current: Some("01".to_string()),
        stratum_current: Some(stratum),
        portfolio_flag: Some(flag.to_string()),
        ..Default::default()
    }
}

proptest! {
    #[test]
    fn payable_is_tax_minus_discount(
        limits in prop_oneof![limits(true), limits(false)]
    ) {
        let policy = Policy::default();
        let r = resolve(&limits, &policy).unwrap();

        prop_assert_eq!(r.payable_amount, r.tax_amount - r.discount);
        let expected = (Decimal::from(r.tax_amount) * policy.discount_rate)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        prop_assert_eq!(Decimal::from(r.discount), expected);
        prop_assert!(r.payable_amount >= 0);
        prop_assert!(r.payable_amount <= r.tax_amount);
    }

    #[test]
    fn tax_is_smallest_applicable_limit(limits in prop_oneof![limits(true), limits(false)]) {
        let r = resolve(&limits, &Policy::default()).unwrap();
        if limits.limit_1 == 0 {
            prop_assert_eq!(r.winning_limit, WinningLimit::None);
            prop_assert_eq!(r.tax_amount, 0);
            prop_assert_eq!(r.payable_amount, 0);
        } else {
            let mut applicable = vec![limits.limit_1, limits.limit_2];
            if limits.indicator_rate > Decimal::ZERO {
                applicable.push(limits.limit_3);
            }
            let min = applicable.iter().copied().min().unwrap();
            prop_assert_eq!(r.tax_amount, min);
            let label_value = match r.winning_limit {
                WinningLimit::Limit1 => limits.limit_1,
                WinningLimit::Limit2 => limits.limit_2,
                WinningLimit::Limit3 => limits.limit_3,
                WinningLimit::None => unreachable!(),
            };
            prop_assert_eq!(label_value, min);
            if limits.indicator_rate <= Decimal::ZERO {
                prop_assert_ne!(r.winning_limit, WinningLimit::Limit3);
            }
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence(picks in prop::collection::vec(0u8..6, 1..40)) {
        let rows: Vec<_> = picks
            .iter()
            .enumerate()
            .map(|(i, p)| raw_row(format!("{:020}", p), 1_000 + i as u32 * 1_000, "3".to_string(), "N"))
            .collect();
        let batch = normalize(&rows);

        let mut first: HashMap<u8, usize> = HashMap::new();
        for (i, p) in picks.iter().enumerate() {
            first.entry(*p).or_insert(i + 1);
        }
        prop_assert_eq!(batch.records.len(), first.len());
        for record in &batch.records {
            let pick: u8 = record.object_number.parse().unwrap();
            prop_assert_eq!(record.property_id, first[&pick]);
        }
        prop_assert_eq!(batch.exclusions.len(), picks.len() - first.len());
    }

    #[test]
    fn normalization_is_idempotent(
        valuation in 0u32..2_000_000_000,
        stratum in prop_oneof![
            Just("1".to_string()),
            Just("9".to_string()),
            Just("N".to_string()),
            Just("".to_string()),
            Just("2.0".to_string()),
            Just("x".to_string()),
            Just("12".to_string()),
        ],
        flag in prop_oneof![Just("Y"), Just("n"), Just(""), Just("?")],
        short_id in any::<bool>(),
    ) {
        let object_number = if short_id {
            "1234567890123456789".to_string()
        } else {
            "01234567890123456789".to_string()
        };
        let once = normalize(&[raw_row(object_number, valuation, stratum, flag)]);
        prop_assert_eq!(once.records.len(), 1);

        let again: Vec<RawPropertyRow> = once.records.iter().map(RawPropertyRow::from).collect();
        let twice = normalize(&again);
        prop_assert_eq!(&once.records, &twice.records);
        prop_assert_eq!(twice.stats.strata_coerced, 0);
        prop_assert_eq!(twice.stats.object_numbers_padded, 0);
        prop_assert_eq!(once.records[0].valuation_current % 1000, 0);
    }

    #[test]
    fn index_lookup_matches_first_covering_entry(
        entries in prop::collection::vec(
            (0usize..3, prop::collection::vec(0u8..=9, 0..3)),
            1..8,
        ),
        ua in 0usize..3,
        level in 0u8..=9,
    ) {
        let codes = ["0101", "0201", "0301"];
        let to_stratum = |l: u8| Stratum::from_level(l).unwrap_or(Stratum::Unassigned);
        let tariffs = entries
            .iter()
            .enumerate()
            .map(|(i, (code, strata))| TariffEntryInput {
                id: format!("T{}", i + 1),
                rate: Decimal::new(55, 4),
                usage_activity: OneOrMany::One(codes[*code].to_string()),
                strata: Some(OneOrMany::Many(strata.iter().map(|l| to_stratum(*l)).collect())),
            })
            .collect();
        let schedule = TariffSchedule::new(TariffScheduleInput { tariffs }).unwrap();
        let index = TariffIndex::build(&schedule);

        let stratum = to_stratum(level);
        let expected = schedule
            .entries()
            .iter()
            .find(|e| e.covers(codes[ua], stratum))
            .map(|e| e.number);
        prop_assert_eq!(index.lookup(codes[ua], stratum).map(|e| e.number), expected);
    }
}
