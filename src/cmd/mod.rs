pub mod compute;
pub mod schema;
pub mod summary;
pub mod validate;

use clap::Args;
use predial::core::{
    read_policy_json, read_rows_csv, read_schedule_json, run_batch, Amount, BatchOutcome,
    Policy, RawPropertyRow, TariffSchedule,
};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Inputs shared by every command that runs the computation.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Property rows file (delimited text). Reads from stdin if not specified.
    #[arg(default_value = "-")]
    rows: PathBuf,

    /// Tariff schedule (JSON)
    #[arg(short, long)]
    tariffs: PathBuf,

    /// Policy parameters (JSON); omitted fields keep their defaults
    #[arg(short, long)]
    policy: Option<PathBuf>,

    /// Override the SSMLV valuation threshold
    #[arg(long)]
    ssmlv: Option<Amount>,

    /// Field delimiter of the rows file
    #[arg(short, long, default_value_t = ';')]
    delimiter: char,
}

impl InputArgs {
    /// Load all inputs and run the batch.
    pub fn run(&self) -> anyhow::Result<BatchOutcome> {
        let schedule = self.read_schedule()?;
        let policy = self.read_policy()?;
        let rows = self.read_rows()?;
        let outcome = run_batch(&rows, &schedule, &policy)?;
        Ok(outcome)
    }

    fn read_schedule(&self) -> anyhow::Result<TariffSchedule> {
        let file = File::open(&self.tariffs)?;
        read_schedule_json(BufReader::new(file))
    }

    fn read_policy(&self) -> anyhow::Result<Policy> {
        let mut policy = match &self.policy {
            Some(path) => read_policy_json(BufReader::new(File::open(path)?))?,
            None => Policy::default(),
        };
        if let Some(ssmlv) = self.ssmlv {
            policy.ssmlv_threshold = ssmlv;
            policy.validate()?;
        }
        Ok(policy)
    }

    fn read_rows(&self) -> anyhow::Result<Vec<RawPropertyRow>> {
        if !self.delimiter.is_ascii() {
            anyhow::bail!("delimiter must be a single ASCII character");
        }
        let delimiter = self.delimiter as u8;
        if self.rows.as_os_str() == "-" {
            read_from_stdin(delimiter)
        } else {
            read_from_file(&self.rows, delimiter)
        }
    }
}

fn read_from_file(path: &Path, delimiter: u8) -> anyhow::Result<Vec<RawPropertyRow>> {
    let file = File::open(path)?;
    read_rows_csv(BufReader::new(file), delimiter)
}

fn read_from_stdin(delimiter: u8) -> anyhow::Result<Vec<RawPropertyRow>> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
    }

    read_rows_csv(io::Cursor::new(buffer), delimiter)
}
