pub mod exclusions;
pub mod limits;
pub mod money;
pub mod normalize;
pub mod pipeline;
pub mod policy;
pub mod record;
pub mod resolve;
pub mod star;
pub mod tariff;

// Flat public surface for domain types and functions.
pub use exclusions::{Exclusion, RecordError};
pub use limits::{calculate_limits, indicator_rate, Limits, PRIOR_TAX_MULTIPLIER};
pub use money::Amount;
pub use normalize::{normalize, NormalizationStats, NormalizedBatch};
pub use pipeline::{compute, run_batch, BatchOutcome, BatchStats, LimitTotals};
pub use policy::{read_policy_json, Policy, PolicyError};
pub use record::{
    read_rows_csv, write_rows_csv, CsvField, PortfolioFlag, PropertyRecord, RawPropertyRow,
    ResidenceType, Stratum, RESIDENTIAL_USAGE_ACTIVITY,
};
pub use resolve::{resolve, Resolution, TaxComputation, WinningLimit};
pub use star::{split_star, FactRow, PropertyDimRow, StarSchema, TariffDimRow};
pub use tariff::{
    match_tariff, read_schedule_json, MatchedRecord, ScheduleError, TariffEntry, TariffIndex,
    TariffRef, TariffSchedule, TariffScheduleInput,
};
