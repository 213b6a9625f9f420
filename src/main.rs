// Production Line Simulator - Main Entry Point
//
// You can run it via Cargo:
//
// ```console
// $ cargo build --release
// $ ./target/release/prodline-sim --print-template > line.json
// $ ./target/release/prodline-sim --input line.json --output report.json
// ```
//
// Or with overrides:
//
// ```console
// $ ./target/release/prodline-sim --input line.json --seed 7 --release-policy first-fit --verbose
// ```

use anyhow::{bail, Context};
use clap::Parser;
use prodline_sim::simulation::{
    validate_routings, EngineMessage, LoggingConfig, LoggingError, SimulationOrchestrator,
    SimulationReport,
};
use prodline_sim::types::config::CliArgs;
use prodline_sim::types::SimulationInput;
use std::process;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;

fn main() {
    // Parse CLI arguments first to check for special flags
    let args = CliArgs::parse();

    if args.print_template {
        match SimulationInput::template().print_json() {
            Ok(json) => {
                println!("{}", json);
                return;
            }
            Err(e) => {
                eprintln!("Failed to serialize the template input: {}", e);
                process::exit(1);
            }
        }
    }

    let guard = match init_logging(&args) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    info!("Starting Production Line Simulator");

    let code = match run(&args) {
        Ok(true) => {
            info!("Production Line Simulator completed successfully");
            0
        }
        Ok(false) => 1,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    };

    // Flush the file writer before exiting
    drop(guard);
    process::exit(code);
}

fn init_logging(args: &CliArgs) -> Result<Option<WorkerGuard>, LoggingError> {
    if let Some(dir) = &args.log_dir {
        let level = if args.debug {
            tracing::Level::DEBUG
        } else if args.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        };
        return LoggingConfig::new()
            .with_level(level)
            .with_json_format()
            .with_file_logging(dir, "prodline-sim")
            .init();
    }

    if args.debug {
        LoggingConfig::init_debug()
    } else if args.verbose {
        LoggingConfig::init_verbose()
    } else {
        // Default: minimal logging for normal users
        LoggingConfig::new().with_level(tracing::Level::WARN).init()
    }
}

/// Load, validate and run; `Ok(false)` when the run itself ended on a fatal error
fn run(args: &CliArgs) -> anyhow::Result<bool> {
    let input = SimulationInput::from_cli_args(args).context("Failed to load the input document")?;
    input.validate().context("Run settings validation failed")?;
    info!("Input loaded and validated successfully");

    if args.dry_run {
        validate_routings(&input).context("Routing integrity check failed")?;
        eprintln!("Input validation successful!");
        eprintln!("Dry run mode - simulation will not be executed.");
        print_input_summary(&input);
        return Ok(true);
    }

    print_input_summary(&input);

    let mut orchestrator = SimulationOrchestrator::new();
    let request_id = orchestrator.submit(input);

    let mut report: Option<SimulationReport> = None;
    let mut fatal: Option<Vec<String>> = None;
    while let Some(message) = orchestrator.recv() {
        if message.request_id() != request_id {
            continue;
        }
        match message {
            EngineMessage::Results { report: r, .. } => report = Some(*r),
            EngineMessage::FatalError { errors, .. } => fatal = Some(errors),
            EngineMessage::Log { lines, .. } => {
                debug!(lines = lines.len(), "Run trace received");
                break;
            }
        }
    }
    orchestrator.shutdown();

    if let Some(errors) = fatal {
        eprintln!("Simulation aborted:");
        for line in &errors {
            eprintln!("  - {}", line);
        }
        return Ok(false);
    }

    let Some(report) = report else {
        bail!("Engine worker stopped without a result");
    };

    eprintln!("\n{}", report.summary());
    eprintln!("\n{}", report.detailed_breakdown());

    match &args.output {
        Some(path) => {
            report.write_json(path).with_context(|| format!("Failed to write the report to {}", path))?;
            eprintln!("Report written to {}", path);
        }
        None => println!("{}", report.to_json().context("Failed to serialize the report")?),
    }
    Ok(true)
}

fn print_input_summary(input: &SimulationInput) {
    eprintln!("=== Production Line Simulator ===");
    eprintln!(
        "Line: {} stations, {} buffers, {} flows",
        input.line.stations.len(),
        input.line.buffers.len(),
        input.line.flows.len()
    );
    eprintln!(
        "Resources: {} worker pool(s), {} tool pool(s)",
        input.line.worker_pools.len(),
        input.line.tool_pools.len()
    );
    eprintln!("Orders: {}", input.orders.len());
    eprintln!("Start date: {}", input.settings.start_date);
    if let Some(seed) = input.settings.seed {
        eprintln!("Random seed: {}", seed);
    }
    eprintln!("Release policy: {}", input.settings.release_policy);
    eprintln!("==================================");
}
