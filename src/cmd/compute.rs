//! Compute command - run the full batch and emit results

use super::InputArgs;
use clap::Args;
use predial::core::star::write_csv;
use predial::core::{
    split_star, Amount, BatchStats, Exclusion, Stratum, TaxComputation, WinningLimit,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ComputeCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Write property_dim.csv, tariff_dim.csv and tax_fact.csv into this directory
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Output as JSON instead of CSV
    #[arg(long, conflicts_with = "out_dir")]
    json: bool,
}

/// One line of the flat CSV output
#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    property_id: usize,
    object_number: &'a str,
    usage_activity: &'a str,
    stratum: Stratum,
    tariff_id: Option<u32>,
    tariff_rate: Option<Decimal>,
    valuation_current: Amount,
    prior_tax_base: Amount,
    indicator_rate: Decimal,
    limit_1: Amount,
    limit_2: Amount,
    limit_3: Amount,
    winning_limit: WinningLimit,
    tax_amount: Amount,
    discount: Amount,
    payable_amount: Amount,
}

impl<'a> From<&'a TaxComputation> for ResultRow<'a> {
    fn from(c: &'a TaxComputation) -> Self {
        ResultRow {
            property_id: c.record.property_id,
            object_number: &c.record.object_number,
            usage_activity: &c.record.usage_activity_current,
            stratum: c.record.stratum_current,
            tariff_id: c.tariff_id(),
            tariff_rate: c.tariff.map(|t| t.rate),
            valuation_current: c.record.valuation_current,
            prior_tax_base: c.record.prior_tax_base,
            indicator_rate: c.indicator_rate,
            limit_1: c.limit_1,
            limit_2: c.limit_2,
            limit_3: c.limit_3,
            winning_limit: c.winning_limit,
            tax_amount: c.tax_amount,
            discount: c.discount,
            payable_amount: c.payable_amount,
        }
    }
}

#[derive(Debug, Serialize)]
struct ComputeOutput<'a> {
    computations: &'a [TaxComputation],
    exclusions: &'a [Exclusion],
    stats: &'a BatchStats,
}

impl ComputeCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let outcome = self.input.run()?;

        if let Some(dir) = &self.out_dir {
            std::fs::create_dir_all(dir)?;
            split_star(&outcome.computations).write_dir(dir)?;
        } else if self.json {
            let output = ComputeOutput {
                computations: &outcome.computations,
                exclusions: &outcome.exclusions,
                stats: &outcome.stats,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            let rows: Vec<ResultRow> = outcome.computations.iter().map(ResultRow::from).collect();
            write_csv(&rows, io::stdout())?;
        }
        Ok(())
    }
}
