//! Summary command - counts and totals per winning limit

use super::InputArgs;
use clap::Args;
use predial::core::{BatchStats, LimitTotals};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct SummaryCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Tabled)]
struct LimitRow {
    #[tabled(rename = "Winning Limit")]
    limit: String,
    #[tabled(rename = "Records")]
    records: usize,
    #[tabled(rename = "Tax")]
    tax: String,
    #[tabled(rename = "Discount")]
    discount: String,
    #[tabled(rename = "Payable")]
    payable: String,
}

impl LimitRow {
    fn new(limit: &str, totals: &LimitTotals) -> Self {
        LimitRow {
            limit: limit.to_string(),
            records: totals.records,
            tax: format_amount(totals.tax),
            discount: format_amount(totals.discount),
            payable: format_amount(totals.payable),
        }
    }
}

impl SummaryCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let outcome = self.input.run()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome.stats)?);
        } else {
            print_summary(&outcome.stats);
        }
        Ok(())
    }
}

fn print_summary(stats: &BatchStats) {
    println!();
    println!("PROPERTY TAX SUMMARY");
    println!();
    println!(
        "  Rows: {} | Computed: {} | Excluded: {} | No tariff: {} | Strata coerced: {}",
        stats.input_rows,
        stats.computed,
        stats.excluded,
        stats.unmatched_tariffs,
        stats.strata_coerced
    );
    for (reason, count) in &stats.excluded_by_reason {
        println!("    {}: {}", reason, count);
    }
    println!();

    let table = Table::new(limit_rows(stats))
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
    println!();
}

fn limit_rows(stats: &BatchStats) -> Vec<LimitRow> {
    let mut rows: Vec<LimitRow> = stats
        .by_winning_limit
        .iter()
        .map(|(limit, totals)| LimitRow::new(limit.as_str(), totals))
        .collect();
    rows.push(LimitRow::new("total", &stats.totals));
    rows
}

/// Whole pesos with thousands separators.
fn format_amount(amount: i128) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use predial::core::WinningLimit;

    #[test]
    fn one_row_per_limit_then_total() {
        let mut stats = BatchStats::default();
        stats.by_winning_limit.insert(
            WinningLimit::Limit1,
            LimitTotals {
                records: 2,
                tax: 2_085_200,
                discount: 312_780,
                payable: 1_772_420,
            },
        );
        stats.by_winning_limit.insert(
            WinningLimit::None,
            LimitTotals {
                records: 1,
                ..Default::default()
            },
        );
        stats.totals = LimitTotals {
            records: 3,
            tax: 2_085_200,
            discount: 312_780,
            payable: 1_772_420,
        };

        let rows = limit_rows(&stats);
        let labels: Vec<_> = rows.iter().map(|r| r.limit.as_str()).collect();
        assert_eq!(labels, vec!["limit_1", "none", "total"]);
        assert_eq!(rows[0].payable, "1,772,420");
        assert_eq!(rows[2].records, 3);
        assert_eq!(rows[2].discount, "312,780");
    }

    #[test]
    fn amounts_are_grouped() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(886_210), "886,210");
        assert_eq!(format_amount(1_042_600), "1,042,600");
        assert_eq!(format_amount(-1_000), "-1,000");
    }
}
