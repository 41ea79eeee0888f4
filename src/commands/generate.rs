use anyhow::Result;

use crate::cli::{Cli, GenerateArgs};
use crate::config::PipelineConfig;
use crate::pipeline;

pub fn run(cli: &Cli, args: &GenerateArgs) -> Result<()> {
    let config = PipelineConfig::new(
        args.municipality.clone(),
        args.data_dir.clone(),
        args.out_dir.clone(),
    );

    if cli.verbose > 0 {
        eprintln!(
            "[generate] municipality={} data={} -> {}",
            config.municipality,
            config.data_dir.display(),
            config.out_dir.display()
        );
    }

    let report = pipeline::run_pipeline(&config)?;

    for status in &report.layers {
        match (status.ok, &status.output) {
            (true, Some(output)) => println!(
                "[generate] {} ready: {} feature(s) -> {}",
                status.layer, status.features, output
            ),
            _ => println!(
                "[generate] {} skipped: {}",
                status.layer,
                status.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    match &report.municipality_name {
        Some(name) => println!("[generate] municipality {} ({}) done.", report.municipality, name),
        None => println!(
            "[generate] municipality {} done; no census layer matched.",
            report.municipality
        ),
    }
    Ok(())
}
