mod cli;
mod config;
mod error;
mod grid;
mod output;
mod pipeline;
mod store;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting Pipelens - Build Pipeline Viewer");
    cli.execute()?;

    Ok(())
}
