use anyhow::Result;
use clap::Parser;

use sits_pipeline::cli::{Cli, Commands};
use sits_pipeline::commands::generate;

fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Generate(args) => generate::run(&cli, args),
    }
}
