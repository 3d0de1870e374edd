//! gunshotmatch: GunShotMatch command-line interface.
//! Entry point only; see `cli` and `subcommands/*`.

mod align;
mod classifier;
mod cli;
mod config;
mod datafile;
mod export;
mod model;
mod pipeline;
mod report;
mod subcommands;
mod versions;

use anyhow::Result;
use cli::Cli;

fn main() -> Result<()> {
    // Initialize env_logger with a default filter of "gunshotmatch=info"
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("gunshotmatch=info"))
        .format_timestamp_millis()
        .init();
    let cli = <Cli as clap::Parser>::parse();
    cli.run()
}
