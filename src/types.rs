//! Plain value types shared by the driver, the boundary reader and the sinks
use std::fmt;
use std::ops::Range;

/// Solver assigned identifier of a boundary marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub usize);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of the monitor call at the end of a lifecycle step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    /// Keep stepping
    Continue,
    /// Solver requested the end of the run (converged, final iteration, ...)
    Stop,
}

impl MonitorStatus {
    /// True if the solver asked to stop
    pub fn is_stop(self) -> bool {
        matches!(self, Self::Stop)
    }
}

impl From<bool> for MonitorStatus {
    /// Native solvers report a bare "stop calculation" flag
    fn from(stop: bool) -> Self {
        if stop {
            Self::Stop
        } else {
            Self::Continue
        }
    }
}

/// The six calls of one lifecycle step, in their mandatory order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleStage {
    /// Time iteration preprocessing
    Preprocess,
    /// Advance the solution
    Run,
    /// Postprocess the new solution
    Postprocess,
    /// Commit the solution as the new state
    Update,
    /// Write solver output files
    Output,
    /// Convergence and stop monitoring
    Monitor,
}

impl LifecycleStage {
    /// Stages in calling order
    pub const ORDER: [LifecycleStage; 6] = [
        Self::Preprocess,
        Self::Run,
        Self::Postprocess,
        Self::Update,
        Self::Output,
        Self::Monitor,
    ];
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Preprocess => "preprocess",
            Self::Run => "run",
            Self::Postprocess => "postprocess",
            Self::Update => "update",
            Self::Output => "output",
            Self::Monitor => "monitor",
        };
        f.write_str(name)
    }
}

/// Time iterations handled by one run: `start..start + n_iter`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// First time iteration (restart iteration)
    pub start: usize,
    /// Number of time iterations to perform
    pub n_iter: usize,
}

impl TimeWindow {
    /// New window
    pub fn new(start: usize, n_iter: usize) -> Self {
        Self { start, n_iter }
    }

    /// One past the last time iteration
    pub fn end(&self) -> usize {
        self.start + self.n_iter
    }

    /// Time iterations in calling order
    pub fn iter(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// Wall model quantities at one wall vertex
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexSample {
    /// Velocity at the exchange location
    pub u: f64,
    /// Velocity gradient at the exchange location
    pub du: f64,
    /// Wall normal coordinate
    pub y: f64,
    /// Wall shear stress from the wall model
    pub tauw: f64,
}

impl VertexSample {
    /// Dataset names, in the order of [`VertexSample::to_array`]
    pub const FIELDS: [&'static str; 4] = ["u", "du", "y", "tauw"];

    /// Return as `[u, du, y, tauw]`
    pub fn to_array(self) -> [f64; 4] {
        [self.u, self.du, self.y, self.tauw]
    }
}
