//! substack2md CLI — archive Substack publications as local markdown.
//!
//! Scrapes a publication's posts into markdown and HTML files with
//! localized images and a per-writer JSON ledger.

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
