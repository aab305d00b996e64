//! Set up and perform a complete run
use crate::boundary::BoundaryReader;
use crate::comm::Communication;
use crate::config::{OutputConfig, RunConfig};
use crate::driver::{Backend, Controller, FlowDriver};
use crate::error::Result;
use crate::integrate;
use crate::sink::{Every, Fanout, InfoLog, SampleSink};
use crate::types::MarkerId;
use crate::RunSummary;
use std::fmt;
use tracing::info;

/// Resolve `marker`, then integrate `driver` over its time window.
///
/// A missing marker is reported before the first time step.
///
/// # Errors
/// Marker not found, failing lifecycle call or sink
pub fn run<D, S, C>(
    driver: &mut D,
    marker: &str,
    component: usize,
    sink: &mut S,
    comm: &C,
) -> Result<RunSummary>
where
    D: FlowDriver + ?Sized,
    S: SampleSink + ?Sized,
    C: Communication,
{
    let reader = BoundaryReader::new(&*driver, marker, component)?;
    if comm.is_root() {
        info!(
            "marker {:?}: id {}, {} vertices on rank 0",
            reader.name(),
            reader.marker(),
            reader.n_vertex()
        );
    }
    let mut controller = Controller::new(driver);
    integrate(&mut controller, &reader, sink, comm)
}

/// Sinks requested in the output section
///
/// # Errors
/// Hdf5 output requested without the `hdf5` feature
pub fn build_sink<'c, C: Communication>(
    output: &OutputConfig,
    comm: &'c C,
) -> Result<Fanout<'c>> {
    let mut fanout = Fanout::new();
    if let Some(path) = &output.info_file {
        fanout.push(Every::new(
            output.write_interval,
            InfoLog::new(path, comm),
        ));
    }
    if let Some(path) = &output.hdf5_file {
        #[cfg(feature = "hdf5")]
        fanout.push(Every::new(
            output.write_interval,
            crate::io::Hdf5Writer::new(path, comm.rank(), comm.size()),
        ));
        #[cfg(not(feature = "hdf5"))]
        return Err(crate::error::DriverError::Config(format!(
            "cannot write {:?}, hdf5 feature is disabled",
            path
        )));
    }
    Ok(fanout)
}

/// Initialize the configured backend and run it with the configured sinks
///
/// # Errors
/// See [`Backend::initialize`], [`build_sink`] and [`run`]
pub fn simulate<C: Communication>(config: &RunConfig, comm: &C) -> Result<RunSummary> {
    let mut driver = Backend::initialize(
        config.backend,
        &config.solver_config,
        config.n_zone,
        comm,
    )?;
    let mut sink = build_sink(&config.output, comm)?;
    run(
        &mut driver,
        &config.marker,
        config.component,
        &mut sink,
        comm,
    )
}

/// One boundary marker as reported by the solver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerEntry {
    /// Marker tag
    pub tag: String,
    /// Marker id, `None` if the tag has no id
    pub id: Option<MarkerId>,
    /// Vertices on this partition, only for markers with id
    pub n_vertex: Option<usize>,
}

impl fmt::Display for MarkerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.id, self.n_vertex) {
            (Some(id), Some(n)) => {
                write!(f, "{:<16} id {:>4}   {:>8} vertices", self.tag, id.0, n)
            }
            _ => write!(f, "{:<16} (no id)", self.tag),
        }
    }
}

/// All marker tags of `driver` in solver order, with id and vertex count
pub fn marker_table<D: FlowDriver + ?Sized>(driver: &D) -> Vec<MarkerEntry> {
    let ids = driver.all_boundary_markers();
    driver
        .all_boundary_marker_tags()
        .into_iter()
        .map(|tag| {
            let id = ids.get(&tag).copied().map(MarkerId);
            MarkerEntry {
                n_vertex: id.map(|id| driver.number_vertices(id)),
                id,
                tag,
            }
        })
        .collect()
}
