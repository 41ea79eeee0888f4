use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// Census pipeline CLI (argument schema only)
#[derive(Parser, Debug)]
#[command(name = "sits", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the urban, rural and electoral layers for one municipality
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Three-digit municipality code, e.g. 032, 087, 118
    pub municipality: String,

    /// Input data directory (expects mapas/ and tablas/ inside)
    #[arg(long, default_value = "data", value_hint = ValueHint::DirPath)]
    pub data_dir: PathBuf,

    /// Output directory for the generated layers
    #[arg(long, default_value = "output", value_hint = ValueHint::DirPath)]
    pub out_dir: PathBuf,
}
