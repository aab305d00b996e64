//! # `wmles-driver`: Time-stepping driver for wall-modeled LES solvers
//!
//! # Dependencies
//! - cargo >= v1.60
//! - `hdf5` (optional, sudo apt-get install -y libhdf5-dev)
//! - mpi installation and libclang (optional)
//!
//! # Details
//!
//! The crate couples an external flow solver to consuming code through
//! an explicit per time step lifecycle. The solver is only seen through the
//! [`driver::FlowDriver`] trait:
//!
//! 1. initialize the solver from its configuration file,
//!    see [`driver::Initialize`]
//! 2. resolve the wall marker and its vertex count once,
//!    see [`boundary::BoundaryReader`]
//! 3. synchronize all ranks, then for every time iteration run
//!    preprocess, run, postprocess, update, output and monitor,
//!    see [`driver::step_lifecycle`]
//! 4. unless the monitor asked to stop, read `u`, `du`, `y` and `tauw` at
//!    every wall vertex and hand the snapshot to a [`sink::SampleSink`]
//!
//! ## Implemented backends
//!
//! - `SyntheticChannel`: log-law channel wall data, see [`driver::synthetic`]
//! - `ScriptedDriver`: prescribed data with call log, see [`driver::scripted`]
//!
//! # Example
//! Drive a synthetic channel ( Run with `cargo run --bin wmles-driver -- run run.toml` )
//! ```ignore
//! use wmles_driver::comm::SerialComm;
//! use wmles_driver::driver::{Initialize, SyntheticChannel};
//! use wmles_driver::run;
//! use wmles_driver::sink::BoundaryHistory;
//! use std::path::Path;
//!
//! fn main() {
//!     let comm = SerialComm;
//!     let mut channel = SyntheticChannel::initialize(Path::new("channel.toml"), 1, &comm).unwrap();
//!     let mut history = BoundaryHistory::new();
//!     run(&mut channel, "lower", 0, &mut history, &comm).unwrap();
//!     println!("mean wall shear stress: {:?}", history.mean_tauw());
//! }
//! ```
#![warn(missing_docs)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#[macro_use]
extern crate enum_dispatch;
pub mod boundary;
pub mod comm;
pub mod config;
pub mod driver;
pub mod error;
#[cfg(feature = "hdf5")]
pub mod io;
pub mod run;
pub mod sink;
pub mod types;

pub use error::{DriverError, Result};
pub use run::run;

use boundary::BoundaryReader;
use comm::Communication;
use driver::{time_window, Controller, FlowDriver};
use sink::SampleSink;
use tracing::{debug, info};

/// Why the time loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// All configured time iterations were performed
    Completed,
    /// Monitor requested a stop
    Monitor,
}

/// Outcome of [`integrate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of lifecycle steps
    pub steps: usize,
    /// Last stepped time iteration
    pub last_time_iter: Option<usize>,
    /// Number of vertex samples handed to the sink
    pub samples: usize,
    /// Why the loop ended
    pub reason: StopReason,
}

/// Step the driver through its time window.
///
/// All ranks meet at a barrier before the first step. Every accepted step
/// is followed by a read of all vertices of `reader`'s marker, which is
/// passed to `sink`.
///
/// Stop Criteria:
/// 1. Time iteration limit
/// 2. Monitor requests a stop (no boundary read for that step)
///
/// # Errors
/// First failing lifecycle call or sink, nothing is retried
pub fn integrate<D, S, C>(
    controller: &mut Controller<D>,
    reader: &BoundaryReader,
    sink: &mut S,
    comm: &C,
) -> Result<RunSummary>
where
    D: FlowDriver,
    S: SampleSink + ?Sized,
    C: Communication,
{
    let window = time_window(controller.driver());
    if comm.is_root() {
        info!("------------------------------ Begin Solver -----------------------------");
    }
    comm.barrier();

    let mut summary = RunSummary {
        steps: 0,
        last_time_iter: None,
        samples: 0,
        reason: StopReason::Completed,
    };
    for time_iter in window.iter() {
        // Lifecycle
        let status = controller.step(time_iter)?;
        summary.steps += 1;
        summary.last_time_iter = Some(time_iter);

        // Break
        if status.is_stop() {
            if comm.is_root() {
                info!("stop requested by monitor at time iteration {}", time_iter);
            }
            summary.reason = StopReason::Monitor;
            return Ok(summary);
        }

        // Wall data
        let snapshot = controller.read_boundary(reader)?;
        summary.samples += snapshot.n_vertex();
        if comm.is_root() {
            if let Some([u, du, _, tauw]) = snapshot.means() {
                debug!(
                    "time_iter = {:>8}     u = {:5.3e}     du = {:5.3e}     tauw = {:5.3e} (rank 0)",
                    time_iter, u, du, tauw
                );
            }
        }
        sink.consume(&snapshot)?;
    }
    if comm.is_root() {
        info!("time iteration limit reached: {}", window.end());
    }
    Ok(summary)
}
