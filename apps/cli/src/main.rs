//! Civicore CLI — civic-election data and news-coverage compiler.
//!
//! Reconciles elections, candidates, and supporting news articles from
//! external sources into a canonical local record set.

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
