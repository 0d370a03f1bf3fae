//! Split computations into property and tariff dimensions plus a fact table.

use super::money::Amount;
use super::record::{PortfolioFlag, ResidenceType, Stratum};
use super::resolve::{TaxComputation, WinningLimit};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const PROPERTY_DIM_FILE: &str = "property_dim.csv";
pub const TARIFF_DIM_FILE: &str = "tariff_dim.csv";
pub const FACT_FILE: &str = "tax_fact.csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyDimRow {
    pub property_id: usize,
    pub object_number: String,
    pub property_type: Option<String>,
    pub usage_prior: String,
    pub activity_prior: String,
    pub stratum_prior: Stratum,
    pub usage_current: String,
    pub activity_current: String,
    pub stratum_current: Stratum,
    pub commune: Option<String>,
    pub neighborhood: Option<String>,
    pub update_status: Option<String>,
    pub portfolio_flag: Option<PortfolioFlag>,
    pub residence_type: ResidenceType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TariffDimRow {
    pub tariff_id: u32,
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactRow {
    pub property_id: usize,
    pub tariff_id: Option<u32>,
    pub valuation_prior: Amount,
    pub prior_tax_base: Amount,
    pub valuation_current: Amount,
    pub indicator_rate: Decimal,
    pub limit_1: Amount,
    pub limit_2: Amount,
    pub limit_3: Amount,
    pub winning_limit: WinningLimit,
    pub tax_amount: Amount,
    pub discount: Amount,
    pub payable_amount: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StarSchema {
    pub properties: Vec<PropertyDimRow>,
    pub tariffs: Vec<TariffDimRow>,
    pub facts: Vec<FactRow>,
}

pub fn split_star(computations: &[TaxComputation]) -> StarSchema {
    let mut tariffs: BTreeMap<u32, Decimal> = BTreeMap::new();
    let mut properties = Vec::with_capacity(computations.len());
    let mut facts = Vec::with_capacity(computations.len());

    for c in computations {
        if let Some(tariff) = c.tariff {
            tariffs.entry(tariff.id).or_insert(tariff.rate);
        }
        let r = &c.record;
        properties.push(PropertyDimRow {
            property_id: r.property_id,
            object_number: r.object_number.clone(),
            property_type: r.property_type.clone(),
            usage_prior: r.usage_prior.clone(),
            activity_prior: r.activity_prior.clone(),
            stratum_prior: r.stratum_prior,
            usage_current: r.usage_current.clone(),
            activity_current: r.activity_current.clone(),
            stratum_current: r.stratum_current,
            commune: r.commune.clone(),
            neighborhood: r.neighborhood.clone(),
            update_status: r.update_status.clone(),
            portfolio_flag: r.portfolio_flag,
            residence_type: r.residence_type(),
        });
        facts.push(FactRow {
            property_id: r.property_id,
            tariff_id: c.tariff_id(),
            valuation_prior: r.valuation_prior,
            prior_tax_base: r.prior_tax_base,
            valuation_current: r.valuation_current,
            indicator_rate: c.indicator_rate,
            limit_1: c.limit_1,
            limit_2: c.limit_2,
            limit_3: c.limit_3,
            winning_limit: c.winning_limit,
            tax_amount: c.tax_amount,
            discount: c.discount,
            payable_amount: c.payable_amount,
        });
    }

    StarSchema {
        properties,
        tariffs: tariffs
            .into_iter()
            .map(|(tariff_id, rate)| TariffDimRow { tariff_id, rate })
            .collect(),
        facts,
    }
}

impl StarSchema {
    /// Write the three tables as CSV files into `dir`, which must exist.
    pub fn write_dir(&self, dir: &Path) -> anyhow::Result<()> {
        write_csv(&self.properties, File::create(dir.join(PROPERTY_DIM_FILE))?)?;
        write_csv(&self.tariffs, File::create(dir.join(TARIFF_DIM_FILE))?)?;
        write_csv(&self.facts, File::create(dir.join(FACT_FILE))?)?;
        log::info!(
            "Wrote {} properties, {} tariffs, {} facts to {}",
            self.properties.len(),
            self.tariffs.len(),
            self.facts.len(),
            dir.display()
        );
        Ok(())
    }
}

pub fn write_csv<T: Serialize, W: Write>(rows: &[T], writer: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::limits::Limits;
    use crate::core::record::PropertyRecord;
    use crate::core::resolve::Resolution;
    use crate::core::tariff::TariffRef;
    use rust_decimal_macros::dec;

    fn computation(property_id: usize, tariff: Option<TariffRef>) -> TaxComputation {
        let record = PropertyRecord {
            property_id,
            object_number: format!("{:020}", property_id),
            property_type: Some("U".to_string()),
            commune: Some("10".to_string()),
            neighborhood: None,
            update_status: None,
            usage_prior: "01".to_string(),
            activity_prior: "01".to_string(),
            usage_current: "01".to_string(),
            activity_current: "01".to_string(),
            stratum_prior: Stratum::Level(3),
            stratum_current: Stratum::Level(3),
            valuation_prior: 150_000_000,
            valuation_current: 160_400_000,
            prior_tax_base: 1_000_000,
            portfolio_flag: Some(PortfolioFlag::N),
            usage_activity_current: "0101".to_string(),
            is_residential: true,
        };
        let limit_1 = if tariff.is_some() { 1_042_600 } else { 0 };
        let limits = Limits {
            indicator_rate: dec!(13.20),
            limit_1,
            limit_2: 2_000_000,
            limit_3: 1_132_000,
        };
        let resolution = Resolution {
            winning_limit: if tariff.is_some() {
                WinningLimit::Limit1
            } else {
                WinningLimit::None
            },
            tax_amount: limit_1,
            discount: if tariff.is_some() { 156_390 } else { 0 },
            payable_amount: if tariff.is_some() { 886_210 } else { 0 },
        };
        TaxComputation::new(record, tariff, limits, resolution)
    }

    #[test]
    fn tariffs_are_distinct_and_sorted() {
        let t = |id, rate| Some(TariffRef { id, rate });
        let star = split_star(&[
            computation(1, t(7, dec!(0.007))),
            computation(2, t(2, dec!(0.0065))),
            computation(3, None),
            computation(4, t(7, dec!(0.007))),
        ]);
        assert_eq!(
            star.tariffs,
            vec![
                TariffDimRow {
                    tariff_id: 2,
                    rate: dec!(0.0065)
                },
                TariffDimRow {
                    tariff_id: 7,
                    rate: dec!(0.007)
                },
            ]
        );
        assert_eq!(star.properties.len(), 4);
        assert_eq!(star.facts.len(), 4);
        assert_eq!(star.facts[2].tariff_id, None);
        assert_eq!(star.facts[2].winning_limit, WinningLimit::None);
        assert_eq!(star.facts[0].tariff_id, Some(7));
    }

    #[test]
    fn fact_rows_reference_properties() {
        let star = split_star(&[computation(5, None)]);
        assert_eq!(star.facts[0].property_id, star.properties[0].property_id);
        assert_eq!(star.properties[0].residence_type, ResidenceType::Residential);
    }

    #[test]
    fn fact_csv_layout() {
        let star = split_star(&[computation(1, Some(TariffRef {
            id: 2,
            rate: dec!(0.0065),
        }))]);
        let mut out = Vec::new();
        write_csv(&star.facts, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("property_id,tariff_id,valuation_prior,prior_tax_base,valuation_current,indicator_rate,limit_1,limit_2,limit_3,winning_limit,tax_amount,discount,payable_amount")
        );
        assert_eq!(
            lines.next(),
            Some("1,2,150000000,1000000,160400000,13.20,1042600,2000000,1132000,limit_1,1042600,156390,886210")
        );
    }
}
