//! dbbuilder CLI: build building-product databases from generative and
//! search services.
//!
//! Generates parameter tables, searches for manufacturers, and finds their
//! websites and product pages, checkpointing results as delimited tables.

mod commands;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
