use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "weather-etl")]
#[command(about = "Daily weather snapshot ETL: OpenWeatherMap -> analytical warehouse")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, default_value = "weather-etl.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run extract, transform and load in one process
    Run {
        /// Print the transformed batch as CSV instead of loading it
        #[arg(long)]
        dry_run: bool,
    },
    /// Fetch raw records and write them to a JSON file
    Extract {
        #[arg(short, long)]
        output: String,
    },
    /// Turn a raw JSON file into a batch file
    Transform {
        #[arg(short, long)]
        input: String,
        #[arg(short, long)]
        output: String,
    },
    /// Append a batch file to the destination table
    Load {
        #[arg(short, long)]
        input: String,
    },
}
