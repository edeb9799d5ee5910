use crate::cli::RepairArgs;
use crate::config::PartialRepairConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use lynx_core::engine::progress::ProgressReporter;
use lynx_core::workflows::{self, repair::RepairReport};
use std::path::Path;
use tracing::{info, warn};

pub fn run(args: RepairArgs) -> Result<()> {
    let partial_config = PartialRepairConfig::load(args.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;

    let output = args.output_path();
    if output == args.input {
        info!("No output path given; the input will be rewritten in place.");
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Repairing {}...", args.input.display());
    let report = workflows::repair::run_file(&args.input, output, &config, &reporter)?;

    print_summary(&report, output);
    Ok(())
}

fn print_summary(report: &RepairReport, output: &Path) {
    println!(
        "✓ {} particle(s), {} bond(s): {} wrapped, {} boundary bond(s), {} relocated.",
        report.particle_count,
        report.bond_count,
        report.wrapped_particles,
        report.violations,
        report.relocated_particles
    );
    if report.residual_violations > 0 {
        warn!(
            "{} bond(s) still span the periodic boundary.",
            report.residual_violations
        );
        println!(
            "Warning: {} bond(s) still span the periodic boundary.",
            report.residual_violations
        );
    }
    println!("Repaired record written to: {}", output.display());
}
