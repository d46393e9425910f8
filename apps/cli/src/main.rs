//! brandscan CLI — brand intelligence scanning for web domains.
//!
//! Researches a domain, discovers and scrapes its key pages, extracts
//! structured products/pricing/features, and validates the result.

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
