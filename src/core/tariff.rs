use super::record::{PropertyRecord, Stratum};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("tariff schedule is empty")]
    Empty,
    #[error("tariff id has no numeric part: {0:?}")]
    InvalidId(String),
    #[error("tariff id {id} repeated with a different rate: {first} vs {second}")]
    ConflictingRate {
        id: u32,
        first: Decimal,
        second: Decimal,
    },
    #[error("tariff {id}: rate must not be negative: {rate}")]
    NegativeRate { id: String, rate: Decimal },
    #[error("tariff {id}: no usage/activity codes")]
    NoUsageActivity { id: String },
}

/// A single value or a list of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// Tariff schedule file
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TariffScheduleInput {
    /// Tariff entries; order matters, the first matching entry wins
    #[serde(alias = "tarifas_residencial_urbano_rural")]
    pub tariffs: Vec<TariffEntryInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TariffEntryInput {
    /// Tariff identifier, e.g. "T12"; the numeric part is the persisted id
    #[serde(alias = "id_tarifa")]
    pub id: String,
    /// Rate applied per peso of current valuation, e.g. 0.0055
    #[serde(alias = "num_tarifa", with = "rust_decimal::serde::arbitrary_precision")]
    #[schemars(with = "f64")]
    pub rate: Decimal,
    /// Usage+activity composite codes covered, e.g. "0101"
    #[serde(alias = "uso_actividad_vigact")]
    pub usage_activity: OneOrMany<String>,
    /// Strata covered (1-9 or "N"); empty or absent covers any stratum
    #[serde(alias = "estrato_vigact", default)]
    #[schemars(with = "Option<Vec<String>>")]
    pub strata: Option<OneOrMany<Stratum>>,
}

/// A validated, immutable tariff entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TariffEntry {
    /// Identifier as written in the schedule
    pub tariff_id: String,
    /// Numeric id used as the tariff dimension key
    pub number: u32,
    pub rate: Decimal,
    pub usage_activities: Vec<String>,
    /// Empty means any stratum
    pub strata: Vec<Stratum>,
}

impl TariffEntry {
    pub fn covers(&self, usage_activity: &str, stratum: Stratum) -> bool {
        self.usage_activities.iter().any(|ua| ua == usage_activity)
            && (self.strata.is_empty() || self.strata.contains(&stratum))
    }

    pub fn to_ref(&self) -> TariffRef {
        TariffRef {
            id: self.number,
            rate: self.rate,
        }
    }
}

/// The part of a matched tariff carried on each computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffRef {
    pub id: u32,
    pub rate: Decimal,
}

/// Strip the non-numeric prefix of a tariff id: `"T12" -> 12`.
pub fn parse_tariff_number(id: &str) -> Result<u32, ScheduleError> {
    let digits = id.trim().trim_start_matches(|c: char| !c.is_ascii_digit());
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScheduleError::InvalidId(id.to_string()));
    }
    digits
        .parse()
        .map_err(|_| ScheduleError::InvalidId(id.to_string()))
}

/// Ordered tariff schedule for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TariffSchedule {
    entries: Vec<TariffEntry>,
}

impl TariffSchedule {
    pub fn new(input: TariffScheduleInput) -> Result<Self, ScheduleError> {
        if input.tariffs.is_empty() {
            return Err(ScheduleError::Empty);
        }

        let mut rates: HashMap<u32, Decimal> = HashMap::new();
        let mut entries = Vec::with_capacity(input.tariffs.len());
        for tariff in input.tariffs {
            let number = parse_tariff_number(&tariff.id)?;
            // one id may cover several codes, but always at one rate
            let first = *rates.entry(number).or_insert(tariff.rate);
            if first != tariff.rate {
                return Err(ScheduleError::ConflictingRate {
                    id: number,
                    first,
                    second: tariff.rate,
                });
            }
            if tariff.rate.is_sign_negative() && !tariff.rate.is_zero() {
                return Err(ScheduleError::NegativeRate {
                    id: tariff.id,
                    rate: tariff.rate,
                });
            }
            let usage_activities: Vec<String> = tariff
                .usage_activity
                .into_vec()
                .into_iter()
                .map(|ua| ua.trim().to_string())
                .filter(|ua| !ua.is_empty())
                .collect();
            if usage_activities.is_empty() {
                return Err(ScheduleError::NoUsageActivity { id: tariff.id });
            }
            entries.push(TariffEntry {
                tariff_id: tariff.id,
                number,
                rate: tariff.rate,
                usage_activities,
                strata: tariff.strata.map(OneOrMany::into_vec).unwrap_or_default(),
            });
        }
        Ok(TariffSchedule { entries })
    }

    pub fn entries(&self) -> &[TariffEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read and validate a tariff schedule file.
pub fn read_schedule_json<R: Read>(reader: R) -> anyhow::Result<TariffSchedule> {
    let input: TariffScheduleInput = serde_json::from_reader(reader)?;
    let schedule = TariffSchedule::new(input)?;
    log::info!("Loaded tariff schedule with {} entries", schedule.len());
    Ok(schedule)
}

/// Schedule positions reachable from one usage/activity code.
#[derive(Debug, Default)]
struct Slots {
    by_stratum: HashMap<Stratum, usize>,
    any_stratum: Option<usize>,
}

/// `(usage_activity, stratum)` lookup built once per run.
///
/// Each slot keeps the earliest schedule position that covers it, so a
/// lookup returns the same entry a front-to-back scan of the schedule would.
#[derive(Debug)]
pub struct TariffIndex<'a> {
    schedule: &'a TariffSchedule,
    slots: HashMap<&'a str, Slots>,
}

impl<'a> TariffIndex<'a> {
    pub fn build(schedule: &'a TariffSchedule) -> Self {
        let mut slots: HashMap<&'a str, Slots> = HashMap::new();
        for (position, entry) in schedule.entries.iter().enumerate() {
            for ua in &entry.usage_activities {
                let slot = slots.entry(ua.as_str()).or_default();
                if entry.strata.is_empty() {
                    slot.any_stratum.get_or_insert(position);
                } else {
                    for stratum in &entry.strata {
                        slot.by_stratum.entry(*stratum).or_insert(position);
                    }
                }
            }
        }
        TariffIndex { schedule, slots }
    }

    pub fn lookup(&self, usage_activity: &str, stratum: Stratum) -> Option<&'a TariffEntry> {
        let slot = self.slots.get(usage_activity)?;
        let position = match (slot.by_stratum.get(&stratum).copied(), slot.any_stratum) {
            (Some(a), Some(b)) => a.min(b),
            (a, b) => a.or(b)?,
        };
        self.schedule.entries.get(position)
    }
}

/// A normalized record with its tariff resolved (or not).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRecord {
    pub record: PropertyRecord,
    pub tariff: Option<TariffRef>,
}

/// Resolve the tariff for one record. An unmatched record is carried forward
/// with `tariff: None`.
pub fn match_tariff(record: PropertyRecord, index: &TariffIndex<'_>) -> MatchedRecord {
    let tariff = index
        .lookup(&record.usage_activity_current, record.stratum_current)
        .map(TariffEntry::to_ref);
    if tariff.is_none() {
        log::debug!(
            "No tariff for {} (usage/activity {}, stratum {})",
            record.object_number,
            record.usage_activity_current,
            record.stratum_current
        );
    }
    MatchedRecord { record, tariff }
}
