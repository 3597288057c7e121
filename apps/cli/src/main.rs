//! LinkForge CLI — internal link automation for product descriptions.
//!
//! Inserts scoped, idempotent keyword links into remote product descriptions
//! and reports per-document outcomes.

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
