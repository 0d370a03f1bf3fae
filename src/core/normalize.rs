//! Record cleaning: required-field filter, de-duplication, padding, rounding
//! and stratum coercion.

use super::exclusions::{Exclusion, RecordError};
use super::money::{parse_decimal, round_to_thousand, to_amount, Amount};
use super::record::{
    PortfolioFlag, PropertyRecord, RawPropertyRow, Stratum, RESIDENTIAL_USAGE_ACTIVITY,
};
use rust_decimal::Decimal;
use std::collections::HashMap;

pub const OBJECT_NUMBER_LEN: usize = 20;
pub const CODE_LEN: usize = 2;

/// Output of the normalizer: clean records in input order plus everything
/// that was dropped on the way.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub records: Vec<PropertyRecord>,
    pub exclusions: Vec<Exclusion>,
    pub stats: NormalizationStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizationStats {
    pub input_rows: usize,
    /// Stratum cells (prior or current) that were null or unparseable
    pub strata_coerced: usize,
    pub object_numbers_padded: usize,
}

/// Clean a batch of raw rows.
///
/// Rows are processed in input order; de-duplication keeps the first row
/// for each object number, so this must run before any parallel fan-out.
pub fn normalize(rows: &[RawPropertyRow]) -> NormalizedBatch {
    let mut batch = NormalizedBatch {
        stats: NormalizationStats {
            input_rows: rows.len(),
            ..Default::default()
        },
        ..Default::default()
    };
    let mut first_seen: HashMap<String, usize> = HashMap::new();

    for (idx, row) in rows.iter().enumerate() {
        let row_no = idx + 1;
        let raw_object_number = row.object_number.as_deref();

        if let Some(field) = first_missing_field(row) {
            batch.exclusions.push(Exclusion::new(
                row_no,
                raw_object_number,
                RecordError::missing(field),
            ));
            continue;
        }

        let (object_number, padded) = match normalize_object_number(raw_object_number) {
            Ok(normalized) => normalized,
            Err(err) => {
                batch
                    .exclusions
                    .push(Exclusion::new(row_no, raw_object_number, err));
                continue;
            }
        };

        if let Some(&first_row) = first_seen.get(&object_number) {
            batch.exclusions.push(Exclusion::new(
                row_no,
                raw_object_number,
                RecordError::DuplicateObjectNumber { first_row },
            ));
            continue;
        }
        first_seen.insert(object_number.clone(), row_no);

        match normalize_fields(row_no, object_number, row) {
            Ok((record, coerced)) => {
                if padded {
                    batch.stats.object_numbers_padded += 1;
                }
                batch.stats.strata_coerced += coerced;
                batch.records.push(record);
            }
            Err(err) => batch
                .exclusions
                .push(Exclusion::new(row_no, raw_object_number, err)),
        }
    }

    log::info!(
        "Normalized {} of {} rows ({} excluded, {} strata coerced)",
        batch.records.len(),
        batch.stats.input_rows,
        batch.exclusions.len(),
        batch.stats.strata_coerced
    );
    batch
}

fn first_missing_field(row: &RawPropertyRow) -> Option<&'static str> {
    let required = [
        ("objeto_numerico", &row.object_number),
        ("usu_vigant", &row.usage_prior),
        ("actividad_vigant", &row.activity_prior),
        ("avalpred_vigant", &row.valuation_prior),
        ("predial_vigant", &row.prior_tax_base),
        ("avalpred_vigact", &row.valuation_current),
    ];
    required
        .into_iter()
        .find(|(_, value)| is_blank(value.as_deref()))
        .map(|(name, _)| name)
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Pad a 19 character object number to 20; reject anything that does not
/// end up as exactly 20 ASCII digits.
pub fn normalize_object_number(raw: Option<&str>) -> Result<(String, bool), RecordError> {
    let value = raw.map(str::trim).unwrap_or_default();
    let (normalized, padded) = if value.len() == OBJECT_NUMBER_LEN - 1 {
        (format!("0{value}"), true)
    } else {
        (value.to_string(), false)
    };
    if normalized.len() != OBJECT_NUMBER_LEN || !normalized.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RecordError::InvalidObjectNumber {
            value: value.to_string(),
        });
    }
    Ok((normalized, padded))
}

/// Pad a single character usage/activity code to two characters.
pub fn pad_code(field: &str, raw: Option<&str>) -> Result<String, RecordError> {
    let value = raw.map(str::trim).unwrap_or_default();
    let padded = match value.chars().count() {
        1 => format!("0{value}"),
        CODE_LEN => value.to_string(),
        _ => {
            return Err(RecordError::InvalidCode {
                field: field.to_string(),
                value: value.to_string(),
            })
        }
    };
    Ok(padded)
}

fn parse_non_negative(field: &str, raw: Option<&str>) -> Result<Decimal, RecordError> {
    let value = raw.map(str::trim).unwrap_or_default();
    let amount = parse_decimal(value).ok_or_else(|| RecordError::InvalidNumber {
        field: field.to_string(),
        value: value.to_string(),
    })?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(RecordError::NegativeAmount {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(amount)
}

/// Parse a valuation and round it to the nearest thousand, ties to even.
pub fn normalize_valuation(field: &str, raw: Option<&str>) -> Result<Amount, RecordError> {
    let amount = parse_non_negative(field, raw)?;
    round_to_thousand(amount)
        .and_then(to_amount)
        .ok_or_else(|| RecordError::overflow(field))
}

fn normalize_tax_base(field: &str, raw: Option<&str>) -> Result<Amount, RecordError> {
    let amount = parse_non_negative(field, raw)?;
    if !amount.fract().is_zero() {
        return Err(RecordError::InvalidNumber {
            field: field.to_string(),
            value: amount.to_string(),
        });
    }
    to_amount(amount).ok_or_else(|| RecordError::overflow(field))
}

fn normalize_fields(
    property_id: usize,
    object_number: String,
    row: &RawPropertyRow,
) -> Result<(PropertyRecord, usize), RecordError> {
    let usage_prior = pad_code("usu_vigant", row.usage_prior.as_deref())?;
    let activity_prior = pad_code("actividad_vigant", row.activity_prior.as_deref())?;
    let usage_current = pad_code("usu_vigact", row.usage_current.as_deref())?;
    let activity_current = pad_code("actividad_vigact", row.activity_current.as_deref())?;

    let valuation_prior = normalize_valuation("avalpred_vigant", row.valuation_prior.as_deref())?;
    let valuation_current =
        normalize_valuation("avalpred_vigact", row.valuation_current.as_deref())?;
    let prior_tax_base = normalize_tax_base("predial_vigant", row.prior_tax_base.as_deref())?;

    let (stratum_prior, prior_coerced) = Stratum::coerce(row.stratum_prior.as_deref());
    let (stratum_current, current_coerced) = Stratum::coerce(row.stratum_current.as_deref());

    let usage_activity_current = format!("{usage_current}{activity_current}");
    let is_residential = usage_activity_current == RESIDENTIAL_USAGE_ACTIVITY;

    let record = PropertyRecord {
        property_id,
        object_number,
        property_type: clean_text(&row.property_type),
        commune: clean_text(&row.commune),
        neighborhood: clean_text(&row.neighborhood),
        update_status: clean_text(&row.update_status),
        usage_prior,
        activity_prior,
        usage_current,
        activity_current,
        stratum_prior,
        stratum_current,
        valuation_prior,
        valuation_current,
        prior_tax_base,
        portfolio_flag: PortfolioFlag::parse(row.portfolio_flag.as_deref()),
        usage_activity_current,
        is_residential,
    };
    Ok((record, usize::from(prior_coerced) + usize::from(current_coerced)))
}

fn clean_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
