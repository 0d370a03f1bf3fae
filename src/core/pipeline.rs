//! The full computation: normalize, match, calculate limits, resolve.

use super::exclusions::Exclusion;
use super::limits::calculate_limits;
use super::normalize::normalize;
use super::policy::{Policy, PolicyError};
use super::record::RawPropertyRow;
use super::resolve::{resolve, TaxComputation, WinningLimit};
use super::tariff::{match_tariff, MatchedRecord, TariffIndex, TariffSchedule};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything a run produces: computations in input order, plus the
/// records that were excluded and why.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub computations: Vec<TaxComputation>,
    pub exclusions: Vec<Exclusion>,
    pub stats: BatchStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub input_rows: usize,
    pub computed: usize,
    pub excluded: usize,
    pub excluded_by_reason: BTreeMap<String, usize>,
    pub strata_coerced: usize,
    pub object_numbers_padded: usize,
    pub unmatched_tariffs: usize,
    pub by_winning_limit: BTreeMap<WinningLimit, LimitTotals>,
    pub totals: LimitTotals,
}

/// Record count and summed amounts over a set of computations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LimitTotals {
    pub records: usize,
    pub tax: i128,
    pub discount: i128,
    pub payable: i128,
}

impl LimitTotals {
    fn add(&mut self, computation: &TaxComputation) {
        self.records += 1;
        self.tax += i128::from(computation.tax_amount);
        self.discount += i128::from(computation.discount);
        self.payable += i128::from(computation.payable_amount);
    }
}

/// Run one batch against one tariff schedule snapshot.
///
/// Only an invalid policy aborts the run; record-level failures end up in
/// [`BatchOutcome::exclusions`].
pub fn run_batch(
    rows: &[RawPropertyRow],
    schedule: &TariffSchedule,
    policy: &Policy,
) -> Result<BatchOutcome, PolicyError> {
    policy.validate()?;

    let normalized = normalize(rows);
    let index = TariffIndex::build(schedule);

    let results: Vec<Result<TaxComputation, Exclusion>> = normalized
        .records
        .into_par_iter()
        .map(|record| compute(match_tariff(record, &index), policy))
        .collect();

    let mut exclusions = normalized.exclusions;
    let mut computations = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(computation) => computations.push(computation),
            Err(exclusion) => exclusions.push(exclusion),
        }
    }
    exclusions.sort_by_key(|e| e.row);

    let mut stats = BatchStats {
        input_rows: normalized.stats.input_rows,
        strata_coerced: normalized.stats.strata_coerced,
        object_numbers_padded: normalized.stats.object_numbers_padded,
        ..Default::default()
    };
    stats.record(&computations, &exclusions);

    if stats.unmatched_tariffs > 0 {
        log::warn!(
            "{} record(s) matched no tariff and were billed 0",
            stats.unmatched_tariffs
        );
    }
    if stats.excluded > 0 {
        log::warn!(
            "{} of {} row(s) excluded: {:?}",
            stats.excluded,
            stats.input_rows,
            stats.excluded_by_reason
        );
    }
    log::info!(
        "Computed {} record(s), total payable {}",
        stats.computed,
        stats.totals.payable
    );

    Ok(BatchOutcome {
        computations,
        exclusions,
        stats,
    })
}

/// Limits and resolution for a single matched record.
pub fn compute(matched: MatchedRecord, policy: &Policy) -> Result<TaxComputation, Exclusion> {
    let MatchedRecord { record, tariff } = matched;
    let outcome = calculate_limits(&record, tariff.as_ref(), policy)
        .and_then(|limits| resolve(&limits, policy).map(|resolution| (limits, resolution)));
    match outcome {
        Ok((limits, resolution)) => Ok(TaxComputation::new(record, tariff, limits, resolution)),
        Err(err) => Err(Exclusion::new(
            record.property_id,
            Some(&record.object_number),
            err,
        )),
    }
}

impl BatchStats {
    fn record(&mut self, computations: &[TaxComputation], exclusions: &[Exclusion]) {
        self.computed = computations.len();
        self.excluded = exclusions.len();
        for exclusion in exclusions {
            *self
                .excluded_by_reason
                .entry(exclusion.reason.kind().to_string())
                .or_default() += 1;
        }
        for computation in computations {
            if computation.tariff.is_none() {
                self.unmatched_tariffs += 1;
            }
            self.by_winning_limit
                .entry(computation.winning_limit)
                .or_default()
                .add(computation);
            self.totals.add(computation);
        }
    }
}
