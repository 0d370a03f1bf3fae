//! Schema command - print expected input formats

use clap::Args;
use predial::core::{Policy, RawPropertyRow, TariffScheduleInput};
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// What to describe
    #[arg(value_enum, default_value = "tariffs")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the tariff schedule file
    Tariffs,
    /// JSON Schema for the policy file
    Policy,
    /// CSV header row with column names
    CsvHeader,
    /// CSV column descriptions
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::Tariffs => {
                let schema = schema_for!(TariffScheduleInput);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::Policy => {
                let schema = schema_for!(Policy);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::CsvHeader => {
                let names: Vec<&str> = RawPropertyRow::csv_schema().iter().map(|f| f.name).collect();
                println!("{}", names.join(";"));
            }
            SchemaFormat::CsvFields => print_csv_fields(),
        }
        Ok(())
    }
}

fn print_csv_fields() {
    println!("CSV Input Format");
    println!("================");
    println!();
    for field in RawPropertyRow::csv_schema() {
        let req = if field.required { "required" } else { "optional" };
        println!("{:20} ({:8})  {}", field.name, req, field.description);
    }
    println!();
    println!("Delimiter defaults to ';'. Header names are case-insensitive; other columns are ignored.");
}
