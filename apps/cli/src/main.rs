//! Prospector CLI — email-first decision-maker discovery.
//!
//! Reads a list of companies, finds each company's website and published
//! email addresses, and writes the validated decision-makers as JSON lines.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
