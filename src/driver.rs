//! # Flow driver interface
//!
//! A flow driver is an external solver seen through a narrow call surface:
//! marker introspection, a six call lifecycle per time iteration and
//! per vertex getters on wall markers. Backends implement [`FlowDriver`]
//! and [`Initialize`].
//!
//! Implemented backends:
//! - `ScriptedDriver`, prescribed data with a call log, see [`scripted`]
//! - `SyntheticChannel`, log-law channel wall data, see [`synthetic`]
pub mod controller;
pub mod scripted;
pub mod synthetic;
pub use controller::{Controller, LifecycleState};
pub use scripted::ScriptedDriver;
pub use synthetic::SyntheticChannel;

use crate::comm::Communication;
use crate::config::BackendKind;
use crate::error::{DriverError, Result};
use crate::types::{MarkerId, MonitorStatus, TimeWindow};
use std::collections::HashMap;
use std::path::Path;

/// Call surface of a single-zone flow solver
///
/// The lifecycle calls must be issued in the order of
/// [`crate::types::LifecycleStage::ORDER`], see [`step_lifecycle`].
/// Vertex getters return the state of the last completed step and are
/// only defined for `vertex < number_vertices(marker)`.
#[enum_dispatch]
pub trait FlowDriver {
    /// Tags of all boundary markers on this partition
    fn all_boundary_marker_tags(&self) -> Vec<String>;
    /// Map from marker tag to marker id
    fn all_boundary_markers(&self) -> HashMap<String, usize>;
    /// Number of vertices of a marker on this partition
    fn number_vertices(&self, marker: MarkerId) -> usize;
    /// First time iteration
    fn time_iter(&self) -> usize;
    /// Number of time iterations
    fn n_time_iter(&self) -> usize;

    /// Time iteration preprocessing
    ///
    /// # Errors
    /// Solver internal failure
    fn preprocess(&mut self, time_iter: usize) -> Result<()>;
    /// Advance the solution by one time iteration
    ///
    /// # Errors
    /// Solver internal failure, e.g. divergence
    fn run(&mut self) -> Result<()>;
    /// Postprocess the new solution
    ///
    /// # Errors
    /// Solver internal failure
    fn postprocess(&mut self) -> Result<()>;
    /// Commit the new solution
    ///
    /// # Errors
    /// Solver internal failure
    fn update(&mut self) -> Result<()>;
    /// Write solver output
    ///
    /// # Errors
    /// Solver internal failure
    fn output(&mut self, time_iter: usize) -> Result<()>;
    /// Convergence monitoring, decides if the run stops
    ///
    /// # Errors
    /// Solver internal failure
    fn monitor(&mut self, time_iter: usize) -> Result<MonitorStatus>;

    /// Velocity component at the wall model exchange location
    fn velocity_off_wall(&self, marker: MarkerId, vertex: usize, component: usize) -> f64;
    /// Velocity gradient component at the exchange location
    fn velocity_gradient_off_wall(&self, marker: MarkerId, vertex: usize, component: usize)
        -> f64;
    /// Wall normal coordinate of a vertex
    fn vertex_coordinate_y(&self, marker: MarkerId, vertex: usize) -> f64;
    /// Wall shear stress returned by the wall model
    fn wall_shear_stress_wmles(&self, marker: MarkerId, vertex: usize) -> f64;
}

impl<D: FlowDriver + ?Sized> FlowDriver for &mut D {
    fn all_boundary_marker_tags(&self) -> Vec<String> {
        (**self).all_boundary_marker_tags()
    }
    fn all_boundary_markers(&self) -> HashMap<String, usize> {
        (**self).all_boundary_markers()
    }
    fn number_vertices(&self, marker: MarkerId) -> usize {
        (**self).number_vertices(marker)
    }
    fn time_iter(&self) -> usize {
        (**self).time_iter()
    }
    fn n_time_iter(&self) -> usize {
        (**self).n_time_iter()
    }
    fn preprocess(&mut self, time_iter: usize) -> Result<()> {
        (**self).preprocess(time_iter)
    }
    fn run(&mut self) -> Result<()> {
        (**self).run()
    }
    fn postprocess(&mut self) -> Result<()> {
        (**self).postprocess()
    }
    fn update(&mut self) -> Result<()> {
        (**self).update()
    }
    fn output(&mut self, time_iter: usize) -> Result<()> {
        (**self).output(time_iter)
    }
    fn monitor(&mut self, time_iter: usize) -> Result<MonitorStatus> {
        (**self).monitor(time_iter)
    }
    fn velocity_off_wall(&self, marker: MarkerId, vertex: usize, component: usize) -> f64 {
        (**self).velocity_off_wall(marker, vertex, component)
    }
    fn velocity_gradient_off_wall(
        &self,
        marker: MarkerId,
        vertex: usize,
        component: usize,
    ) -> f64 {
        (**self).velocity_gradient_off_wall(marker, vertex, component)
    }
    fn vertex_coordinate_y(&self, marker: MarkerId, vertex: usize) -> f64 {
        (**self).vertex_coordinate_y(marker, vertex)
    }
    fn wall_shear_stress_wmles(&self, marker: MarkerId, vertex: usize) -> f64 {
        (**self).wall_shear_stress_wmles(marker, vertex)
    }
}

/// Construct and preprocess a driver
pub trait Initialize: Sized {
    /// Build a driver from a solver configuration file.
    ///
    /// # Errors
    /// Invalid configuration, unsupported zone count or
    /// communicator size
    fn initialize<C: Communication>(config_path: &Path, n_zone: usize, comm: &C) -> Result<Self>;
}

/// Bundled backends
#[enum_dispatch(FlowDriver)]
#[derive(Debug)]
pub enum Backend {
    /// Prescribed data, used for dry runs and tests
    Scripted(ScriptedDriver),
    /// Log-law channel wall data
    Synthetic(SyntheticChannel),
}

impl Backend {
    /// Initialize the backend selected in the run file
    ///
    /// # Errors
    /// See [`Initialize::initialize`]
    pub fn initialize<C: Communication>(
        kind: BackendKind,
        config_path: &Path,
        n_zone: usize,
        comm: &C,
    ) -> Result<Self> {
        Ok(match kind {
            BackendKind::Scripted => ScriptedDriver::initialize(config_path, n_zone, comm)?.into(),
            BackendKind::Synthetic => {
                SyntheticChannel::initialize(config_path, n_zone, comm)?.into()
            }
        })
    }
}

/// Single-zone backends reject any other zone count
///
/// # Errors
/// `n_zone != 1`
pub fn check_single_zone(n_zone: usize) -> Result<()> {
    if n_zone == 1 {
        Ok(())
    } else {
        Err(DriverError::Config(format!(
            "single-zone driver requires n_zone = 1, got {}",
            n_zone
        )))
    }
}

/// Look up a marker tag in both the tag list and the tag to id map.
///
/// Returns `None` if either of them misses the tag.
pub fn resolve_marker<D: FlowDriver + ?Sized>(driver: &D, name: &str) -> Option<MarkerId> {
    if !driver.all_boundary_marker_tags().iter().any(|tag| tag == name) {
        return None;
    }
    driver.all_boundary_markers().get(name).copied().map(MarkerId)
}

/// Like [`resolve_marker`], but a missing marker is an error
///
/// # Errors
/// Marker not found
pub fn require_marker<D: FlowDriver + ?Sized>(driver: &D, name: &str) -> Result<MarkerId> {
    resolve_marker(driver, name).ok_or_else(|| DriverError::MarkerNotFound {
        name: name.to_owned(),
    })
}

/// Number of vertices of a resolved marker
pub fn vertex_count<D: FlowDriver + ?Sized>(driver: &D, marker: MarkerId) -> usize {
    driver.number_vertices(marker)
}

/// Time iterations the driver was configured for
pub fn time_window<D: FlowDriver + ?Sized>(driver: &D) -> TimeWindow {
    TimeWindow::new(driver.time_iter(), driver.n_time_iter())
}

/// Run one full lifecycle step.
///
/// Calls preprocess, run, postprocess, update, output and monitor in this
/// order. The first failing call aborts the step.
///
/// # Errors
/// Error of the failing lifecycle call
pub fn step_lifecycle<D: FlowDriver + ?Sized>(
    driver: &mut D,
    time_iter: usize,
) -> Result<MonitorStatus> {
    driver.preprocess(time_iter)?;
    driver.run()?;
    driver.postprocess()?;
    driver.update()?;
    driver.output(time_iter)?;
    driver.monitor(time_iter)
}

#[cfg(test)]
mod tests {
    use super::scripted::{Call, ScriptedDriver};
    use super::*;
    use crate::types::{LifecycleStage, VertexSample};

    fn driver() -> ScriptedDriver {
        ScriptedDriver::new(TimeWindow::new(0, 3))
            .with_marker("lower", vec![VertexSample::default(); 4])
            .with_marker("upper", vec![VertexSample::default(); 2])
    }

    #[test]
    fn test_resolve_marker() {
        let driver = driver();
        assert_eq!(resolve_marker(&driver, "lower"), Some(MarkerId(0)));
        assert_eq!(resolve_marker(&driver, "upper"), Some(MarkerId(1)));
        assert_eq!(resolve_marker(&driver, "inlet"), None);
    }

    #[test]
    fn test_resolve_marker_requires_tag_and_id() {
        let driver = driver().with_untagged_marker("side").with_unmapped_tag("outlet");
        assert_eq!(resolve_marker(&driver, "side"), None);
        assert_eq!(resolve_marker(&driver, "outlet"), None);
        assert!(matches!(
            require_marker(&driver, "outlet"),
            Err(DriverError::MarkerNotFound { .. })
        ));
    }

    #[test]
    fn test_step_lifecycle_order() {
        let mut driver = driver();
        let status = step_lifecycle(&mut driver, 0).unwrap();
        assert_eq!(status, MonitorStatus::Continue);
        assert_eq!(
            driver.lifecycle_calls(),
            vec![
                Call::Preprocess(0),
                Call::Run,
                Call::Postprocess,
                Call::Update,
                Call::Output(0),
                Call::Monitor(0),
            ]
        );
    }

    #[test]
    fn test_step_lifecycle_aborts_on_failure() {
        let mut driver = driver().fail_at(LifecycleStage::Postprocess, 0);
        let err = step_lifecycle(&mut driver, 0).unwrap_err();
        assert!(matches!(
            err,
            DriverError::Solver {
                stage: LifecycleStage::Postprocess,
                time_iter: 0,
                ..
            }
        ));
        assert_eq!(
            driver.lifecycle_calls(),
            vec![Call::Preprocess(0), Call::Run, Call::Postprocess]
        );
    }

    #[test]
    fn test_single_zone() {
        assert!(check_single_zone(1).is_ok());
        assert!(matches!(check_single_zone(2), Err(DriverError::Config(_))));
    }

    #[test]
    fn test_backend_dispatch() {
        let mut backend: Backend = driver().into();
        assert_eq!(time_window(&backend), TimeWindow::new(0, 3));
        assert_eq!(step_lifecycle(&mut backend, 0).unwrap(), MonitorStatus::Continue);
        assert_eq!(vertex_count(&backend, MarkerId(0)), 4);
    }
}
