//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads or generates the signal catalog
//! - runs the network Fisher analysis
//! - prints the summary and writes exports

use clap::Parser;
use log::{info, warn};

use crate::cli::{AnalyzeArgs, Command, RunArgs, SampleArgs};
use crate::data::{generate_population, load_catalog, population_parameter_names, PopulationConfig};
use crate::domain::{FisherConfig, ParameterSet, RunConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `gwf` binary.
pub fn run() -> Result<(), AppError> {
    env_logger::init();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.run)?;
    let catalog = load_catalog(&args.catalog)?;

    for row_error in &catalog.row_errors {
        warn!("catalog line {}: {}", row_error.line, row_error.message);
    }
    info!(
        "loaded {} signals from '{}' ({} rows rejected)",
        catalog.signals.len(),
        args.catalog.display(),
        catalog.row_errors.len()
    );

    analyze_and_report(&config, &catalog.signals, &catalog.parameter_names)
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.run)?;
    let population = PopulationConfig {
        count: args.count,
        seed: args.seed,
        mass_mean: args.mass_mean,
        mass_sigma: args.mass_sigma,
        mass_min: args.mass_min,
        mass_max: args.mass_max,
        distance_min: args.distance_min,
        distance_max: args.distance_max,
        ..PopulationConfig::default()
    };

    let catalog = generate_population(&population)?;
    info!("generated {} signals (seed {})", catalog.len(), args.seed);

    analyze_and_report(&config, &catalog, &population_parameter_names())
}

fn analyze_and_report(
    config: &RunConfig,
    catalog: &[ParameterSet],
    parameter_names: &[String],
) -> Result<(), AppError> {
    let network = pipeline::build_network(config)?;

    let groups = match &config.sub_networks {
        Some(groups) => groups.clone(),
        None => vec![(0..network.detectors().len()).collect()],
    };
    let single_run = groups.len() == 1;

    for ids in &groups {
        let sub_network = network.partial(ids)?;
        let errors = pipeline::run_with_network(&sub_network, config, catalog)?;

        println!(
            "{}",
            crate::report::format_run_summary(&sub_network, config, catalog.len(), &errors)?
        );

        let file_stem = crate::io::errors_file_name(&network, ids, &config.population_name)?;
        let path = crate::io::write_errors_txt(
            &config.output_dir,
            &file_stem,
            catalog,
            parameter_names,
            &errors,
            &config.fisher_parameters,
        )?;
        println!("Wrote {}", path.display());

        // JSON is a single-run artifact; with several sub-networks the files
        // would overwrite each other.
        if single_run {
            if let Some(json_path) = &config.export_json {
                crate::io::write_results_json(
                    json_path,
                    &sub_network,
                    catalog,
                    &errors,
                    &config.fisher_parameters,
                )?;
                println!("Wrote {}", json_path.display());
            }
        }
    }

    Ok(())
}

pub fn run_config_from_args(args: &RunArgs) -> Result<RunConfig, AppError> {
    let sub_networks = match &args.sub_networks {
        Some(spec) => Some(crate::cli::parse_sub_networks(spec)?),
        None => None,
    };

    Ok(RunConfig {
        detectors: args.detectors.clone(),
        detector_snr_threshold: args.detector_snr,
        network_snr_threshold: args.network_snr,
        fisher_parameters: args.fisher_parameters.clone(),
        waveform: args.waveform,
        f_min: args.f_min,
        f_max: args.f_max,
        delta_f: args.delta_f,
        use_duty_cycle: args.duty_cycle,
        fisher: FisherConfig {
            fd_eps: args.fd_eps,
            svd_threshold: args.svd_threshold,
            f_ref: args.f_ref,
        },
        sub_networks,
        population_name: args.population.clone(),
        output_dir: args.out_dir.clone(),
        export_json: args.export_json.clone(),
    })
}
