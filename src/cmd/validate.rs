//! Validate command - surface data quality issues without emitting results

use super::InputArgs;
use clap::Args;
use predial::core::BatchOutcome;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// A validation issue for output
#[derive(Debug, Clone, Serialize)]
struct ValidationIssue {
    row: usize,
    object_number: String,
    #[serde(rename = "type")]
    issue_type: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct ValidationOutput {
    input_rows: usize,
    issue_count: usize,
    issues: Vec<ValidationIssue>,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let outcome = self.input.run()?;
        let issues = collect_issues(&outcome);

        if self.json {
            let output = ValidationOutput {
                input_rows: outcome.stats.input_rows,
                issue_count: issues.len(),
                issues: issues.clone(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_text(&issues, outcome.stats.input_rows);
        }

        // Exit with code 1 if issues found
        if !issues.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }
}

fn collect_issues(outcome: &BatchOutcome) -> Vec<ValidationIssue> {
    let excluded = outcome.exclusions.iter().map(|e| ValidationIssue {
        row: e.row,
        object_number: e.object_number.clone().unwrap_or_default(),
        issue_type: e.reason.kind().to_string(),
        message: e.reason.to_string(),
    });
    let unmatched = outcome
        .computations
        .iter()
        .filter(|c| c.tariff.is_none())
        .map(|c| ValidationIssue {
            row: c.record.property_id,
            object_number: c.record.object_number.clone(),
            issue_type: "TariffNotFound".to_string(),
            message: format!(
                "no tariff for usage/activity {} and stratum {}; billed 0",
                c.record.usage_activity_current, c.record.stratum_current
            ),
        });
    let mut issues: Vec<_> = excluded.chain(unmatched).collect();
    issues.sort_by_key(|i| i.row);
    issues
}

fn print_text(issues: &[ValidationIssue], input_rows: usize) {
    println!();
    println!("VALIDATION RESULTS ({} rows)", input_rows);
    println!();

    if issues.is_empty() {
        println!("\u{2713} No issues found.");
        return;
    }

    println!("\u{26A0} {} issue(s) found:", issues.len());
    println!();
    for issue in issues {
        println!(
            "  row {}. [{}] {}",
            issue.row, issue.issue_type, issue.object_number
        );
        println!("     {}", issue.message);
    }
    println!();
}
