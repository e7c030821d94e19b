//! sheetbind CLI: content loading and binding for a static page.
//!
//! Fetches page copy from a Google Sheet (cached locally for an hour) and
//! writes it into the page's fixed slots.

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
