//! Flow driver with prescribed wall data
//!
//! Does not solve anything. Markers, vertex data, the stop iteration and
//! failures are prescribed, and every call is logged, so the driver loop
//! can be checked against the lifecycle contract.
use super::{check_single_zone, FlowDriver, Initialize};
use crate::comm::Communication;
use crate::error::{DriverError, Result};
use crate::types::{LifecycleStage, MarkerId, MonitorStatus, TimeWindow, VertexSample};
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

/// Per vertex getter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadKind {
    /// `velocity_off_wall` with component
    Velocity(usize),
    /// `velocity_gradient_off_wall` with component
    VelocityGradient(usize),
    /// `vertex_coordinate_y`
    CoordY,
    /// `wall_shear_stress_wmles`
    WallShearStress,
}

/// One logged call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    /// `all_boundary_marker_tags`
    MarkerTags,
    /// `all_boundary_markers`
    MarkerIds,
    /// `number_vertices`
    NumberVertices(MarkerId),
    /// `preprocess`
    Preprocess(usize),
    /// `run`
    Run,
    /// `postprocess`
    Postprocess,
    /// `update`
    Update,
    /// `output`
    Output(usize),
    /// `monitor`
    Monitor(usize),
    /// Per vertex getter
    Read(ReadKind, MarkerId, usize),
}

impl Call {
    /// True for the six lifecycle calls
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::Preprocess(_)
                | Self::Run
                | Self::Postprocess
                | Self::Update
                | Self::Output(_)
                | Self::Monitor(_)
        )
    }
}

/// Driver with prescribed data
#[derive(Debug)]
pub struct ScriptedDriver {
    tags: Vec<String>,
    ids: HashMap<String, usize>,
    /// Vertex data, indexed by marker id
    vertices: Vec<Vec<VertexSample>>,
    window: TimeWindow,
    stop_at: Option<usize>,
    failure: Option<(LifecycleStage, usize)>,
    /// Added to `u` and `tauw` per time iteration
    drift: f64,
    /// Time iteration between preprocess and monitor
    current: Option<usize>,
    /// Position in `LifecycleStage::ORDER` of the next call
    next_stage: usize,
    /// Last time iteration that passed update
    completed: Option<usize>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedDriver {
    /// Driver without markers over the given time window
    pub fn new(window: TimeWindow) -> Self {
        Self {
            tags: Vec::new(),
            ids: HashMap::new(),
            vertices: Vec::new(),
            window,
            stop_at: None,
            failure: None,
            drift: 0.,
            current: None,
            next_stage: 0,
            completed: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn push_marker(&mut self, name: &str, samples: Vec<VertexSample>) -> usize {
        let id = self.vertices.len();
        self.vertices.push(samples);
        self.ids.insert(name.to_owned(), id);
        id
    }

    /// Add a marker with tag, id and vertex data
    pub fn with_marker(mut self, name: &str, samples: Vec<VertexSample>) -> Self {
        self.push_marker(name, samples);
        self.tags.push(name.to_owned());
        self
    }

    /// Add a marker which has an id, but is missing from the tag list
    pub fn with_untagged_marker(mut self, name: &str) -> Self {
        self.push_marker(name, Vec::new());
        self
    }

    /// Add a tag without id
    pub fn with_unmapped_tag(mut self, name: &str) -> Self {
        self.tags.push(name.to_owned());
        self
    }

    /// Monitor requests a stop at this time iteration
    pub fn stop_at(mut self, time_iter: usize) -> Self {
        self.stop_at = Some(time_iter);
        self
    }

    /// Lifecycle call `stage` fails at this time iteration
    pub fn fail_at(mut self, stage: LifecycleStage, time_iter: usize) -> Self {
        self.failure = Some((stage, time_iter));
        self
    }

    /// Wall data changes by `drift` per time iteration
    pub fn with_drift(mut self, drift: f64) -> Self {
        self.drift = drift;
        self
    }

    /// All calls so far
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Lifecycle calls so far
    pub fn lifecycle_calls(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .copied()
            .filter(Call::is_lifecycle)
            .collect()
    }

    /// Number of per vertex getter calls
    pub fn read_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Read(..)))
            .count()
    }

    fn log(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    /// Check ordering and failure injection for a lifecycle call
    fn enter(&mut self, stage: LifecycleStage) -> Result<usize> {
        let expected = LifecycleStage::ORDER[self.next_stage];
        let time_iter = match stage {
            LifecycleStage::Preprocess => self.current.unwrap_or(self.window.start),
            _ => self.current.ok_or_else(|| {
                DriverError::solver(stage, self.window.start, "called before preprocess")
            })?,
        };
        if stage != expected {
            return Err(DriverError::solver(
                stage,
                time_iter,
                format!("called out of order, expected {}", expected),
            ));
        }
        if self.failure == Some((stage, time_iter)) {
            return Err(DriverError::solver(stage, time_iter, "injected failure"));
        }
        self.next_stage = (self.next_stage + 1) % LifecycleStage::ORDER.len();
        Ok(time_iter)
    }

    fn sample(&self, marker: MarkerId, vertex: usize) -> Option<VertexSample> {
        let base = self.vertices.get(marker.0)?.get(vertex).copied()?;
        #[allow(clippy::cast_precision_loss)]
        let shift = self.completed.map_or(0., |t| self.drift * t as f64);
        Some(VertexSample {
            u: base.u + shift,
            tauw: base.tauw + shift,
            ..base
        })
    }
}

impl FlowDriver for ScriptedDriver {
    fn all_boundary_marker_tags(&self) -> Vec<String> {
        self.log(Call::MarkerTags);
        self.tags.clone()
    }

    fn all_boundary_markers(&self) -> HashMap<String, usize> {
        self.log(Call::MarkerIds);
        self.ids.clone()
    }

    fn number_vertices(&self, marker: MarkerId) -> usize {
        self.log(Call::NumberVertices(marker));
        self.vertices.get(marker.0).map_or(0, Vec::len)
    }

    fn time_iter(&self) -> usize {
        self.window.start
    }

    fn n_time_iter(&self) -> usize {
        self.window.n_iter
    }

    fn preprocess(&mut self, time_iter: usize) -> Result<()> {
        self.log(Call::Preprocess(time_iter));
        self.current = Some(time_iter);
        self.enter(LifecycleStage::Preprocess)?;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.log(Call::Run);
        self.enter(LifecycleStage::Run)?;
        Ok(())
    }

    fn postprocess(&mut self) -> Result<()> {
        self.log(Call::Postprocess);
        self.enter(LifecycleStage::Postprocess)?;
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        self.log(Call::Update);
        let time_iter = self.enter(LifecycleStage::Update)?;
        self.completed = Some(time_iter);
        Ok(())
    }

    fn output(&mut self, time_iter: usize) -> Result<()> {
        self.log(Call::Output(time_iter));
        self.enter(LifecycleStage::Output)?;
        Ok(())
    }

    fn monitor(&mut self, time_iter: usize) -> Result<MonitorStatus> {
        self.log(Call::Monitor(time_iter));
        self.enter(LifecycleStage::Monitor)?;
        self.current = None;
        Ok(MonitorStatus::from(self.stop_at == Some(time_iter)))
    }

    fn velocity_off_wall(&self, marker: MarkerId, vertex: usize, component: usize) -> f64 {
        self.log(Call::Read(ReadKind::Velocity(component), marker, vertex));
        self.sample(marker, vertex).map_or(f64::NAN, |s| s.u)
    }

    fn velocity_gradient_off_wall(
        &self,
        marker: MarkerId,
        vertex: usize,
        component: usize,
    ) -> f64 {
        self.log(Call::Read(ReadKind::VelocityGradient(component), marker, vertex));
        self.sample(marker, vertex).map_or(f64::NAN, |s| s.du)
    }

    fn vertex_coordinate_y(&self, marker: MarkerId, vertex: usize) -> f64 {
        self.log(Call::Read(ReadKind::CoordY, marker, vertex));
        self.sample(marker, vertex).map_or(f64::NAN, |s| s.y)
    }

    fn wall_shear_stress_wmles(&self, marker: MarkerId, vertex: usize) -> f64 {
        self.log(Call::Read(ReadKind::WallShearStress, marker, vertex));
        self.sample(marker, vertex).map_or(f64::NAN, |s| s.tauw)
    }
}

/// Script file of the `scripted` backend
#[derive(Debug, Clone, Deserialize)]
struct Script {
    #[serde(default)]
    start_iter: usize,
    n_iter: usize,
    #[serde(default)]
    stop_at: Option<usize>,
    #[serde(default)]
    drift: f64,
    #[serde(default, rename = "marker")]
    markers: Vec<ScriptMarker>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScriptMarker {
    name: String,
    vertices: usize,
}

impl Initialize for ScriptedDriver {
    fn initialize<C: Communication>(config_path: &Path, n_zone: usize, _comm: &C) -> Result<Self> {
        check_single_zone(n_zone)?;
        let content = std::fs::read_to_string(config_path).map_err(|e| {
            DriverError::Config(format!("cannot read {:?}: {}", config_path, e))
        })?;
        let script: Script = toml::from_str(&content)?;
        let mut driver = Self::new(TimeWindow::new(script.start_iter, script.n_iter))
            .with_drift(script.drift);
        if let Some(t) = script.stop_at {
            driver = driver.stop_at(t);
        }
        for marker in &script.markers {
            #[allow(clippy::cast_precision_loss)]
            let samples = (0..marker.vertices)
                .map(|j| VertexSample {
                    u: 1.0 + j as f64,
                    du: 1.0,
                    y: j as f64 / marker.vertices as f64,
                    tauw: 1.0,
                })
                .collect();
            driver = driver.with_marker(&marker.name, samples);
        }
        Ok(driver)
    }
}
