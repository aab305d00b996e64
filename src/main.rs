//! Run example:
//!
//! cargo run --release --bin wmles-driver -- run run.toml
//!
//! Parallel, one driver per rank:
//!
//! cargo mpirun --np 2 --bin wmles-driver --features mpi -- run run.toml
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use wmles_driver::comm::Communication;
use wmles_driver::config::RunConfig;
use wmles_driver::driver::Backend;
use wmles_driver::run::{marker_table, simulate};

/// Time-stepping driver for wall-modeled LES solvers
#[derive(Parser)]
#[command(name = "wmles-driver")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Step a flow solver and sample wall model data", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the time loop
    Run {
        /// Run file (toml)
        run_file: PathBuf,
        /// Override the sampled wall marker
        #[arg(short, long)]
        marker: Option<String>,
    },
    /// List the boundary markers of the solver
    Markers {
        /// Run file (toml)
        run_file: PathBuf,
    },
}

#[cfg(feature = "mpi")]
fn communicator() -> Result<wmles_driver::comm::MpiComm> {
    Ok(wmles_driver::comm::MpiComm::initialize()?)
}

#[cfg(not(feature = "mpi"))]
fn communicator() -> Result<wmles_driver::comm::SerialComm> {
    Ok(wmles_driver::comm::SerialComm)
}

fn load(run_file: &Path) -> Result<RunConfig> {
    RunConfig::from_file(run_file).with_context(|| format!("invalid run file {:?}", run_file))
}

fn execute_run<C: Communication>(
    run_file: &Path,
    marker: Option<String>,
    comm: &C,
) -> Result<()> {
    let mut config = load(run_file)?;
    config.override_marker(marker)?;
    let summary = simulate(&config, comm).context("run failed")?;
    if comm.is_root() {
        info!(
            "{} time steps, {} wall samples, last time iteration {:?} ({:?})",
            summary.steps, summary.samples, summary.last_time_iter, summary.reason
        );
    }
    Ok(())
}

fn execute_markers<C: Communication>(run_file: &Path, comm: &C) -> Result<()> {
    let config = load(run_file)?;
    let driver = Backend::initialize(config.backend, &config.solver_config, config.n_zone, comm)
        .context("cannot initialize solver")?;
    if comm.is_root() {
        for entry in marker_table(&driver) {
            println!("{}", entry);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let comm = communicator()?;
    match cli.command {
        Commands::Run { run_file, marker } => execute_run(&run_file, marker, &comm),
        Commands::Markers { run_file } => execute_markers(&run_file, &comm),
    }
}
