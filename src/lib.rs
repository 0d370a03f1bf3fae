//! Property tax computation for municipal valuation rolls.
//!
//! Raw rows are normalized, matched against a tariff schedule, capped by
//! three independent limits and discounted. See [`core::run_batch`].

pub mod core;
