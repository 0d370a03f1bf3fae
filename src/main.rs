use clap::{Parser, Subcommand};

mod cmd;

#[derive(Parser, Debug)]
#[command(name = "predial", version, about = "Property tax calculator for valuation rolls")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute taxes for every property in the roll
    Compute(cmd::compute::ComputeCommand),
    /// Report rows that would be excluded or billed without a tariff
    Validate(cmd::validate::ValidateCommand),
    /// Counts and totals per winning limit
    Summary(cmd::summary::SummaryCommand),
    /// Print expected input formats
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Compute(command) => command.exec(),
        Command::Validate(command) => command.exec(),
        Command::Summary(command) => command.exec(),
        Command::Schema(command) => command.exec(),
    }
}
