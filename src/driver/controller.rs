//! Lifecycle state machine around a flow driver
use super::{step_lifecycle, FlowDriver};
use crate::boundary::{BoundaryReader, BoundarySnapshot};
use crate::error::{DriverError, Result};
use crate::types::MonitorStatus;

/// Where the driver is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Initialized, no time step yet
    Ready,
    /// Last step completed and the solver wants to continue
    Stepped(usize),
    /// Monitor requested a stop at this time iteration
    Stopped(usize),
    /// A lifecycle call failed
    Failed,
}

impl LifecycleState {
    fn name(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Stepped(_) => "stepping",
            Self::Stopped(_) => "stopped",
            Self::Failed => "failed",
        }
    }

    /// True if no further steps are accepted
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped(_) | Self::Failed)
    }
}

/// Owns a driver and enforces the lifecycle contract:
///
/// - one full lifecycle per step, in fixed order
/// - time iterations advance by exactly one
/// - nothing is accepted after a stop or a failure
/// - boundary data only after a completed, continuing step
#[derive(Debug)]
pub struct Controller<D> {
    driver: D,
    state: LifecycleState,
}

impl<D: FlowDriver> Controller<D> {
    /// Wrap an initialized driver
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            state: LifecycleState::Ready,
        }
    }

    /// Current state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Read access to the driver (introspection)
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Return the driver
    pub fn into_inner(self) -> D {
        self.driver
    }

    /// Run the full lifecycle for `time_iter`
    ///
    /// # Errors
    /// Terminal state, non-consecutive time iteration or
    /// failing lifecycle call. A failing call moves the
    /// controller into [`LifecycleState::Failed`].
    pub fn step(&mut self, time_iter: usize) -> Result<MonitorStatus> {
        match self.state {
            LifecycleState::Stepped(prev) if time_iter != prev + 1 => {
                return Err(DriverError::OutOfOrder {
                    expected: prev + 1,
                    got: time_iter,
                });
            }
            state if state.is_terminal() => return Err(DriverError::Terminated(state.name())),
            _ => (),
        }
        match step_lifecycle(&mut self.driver, time_iter) {
            Ok(status) => {
                self.state = if status.is_stop() {
                    LifecycleState::Stopped(time_iter)
                } else {
                    LifecycleState::Stepped(time_iter)
                };
                Ok(status)
            }
            Err(e) => {
                self.state = LifecycleState::Failed;
                Err(e)
            }
        }
    }

    /// Time iteration whose data is currently readable
    ///
    /// # Errors
    /// No completed, continuing step
    pub fn completed_step(&self) -> Result<usize> {
        match self.state {
            LifecycleState::Stepped(t) => Ok(t),
            _ => Err(DriverError::NoCompletedStep),
        }
    }

    /// Read all vertices of the reader's marker for the last step
    ///
    /// # Errors
    /// No completed, continuing step
    pub fn read_boundary(&self, reader: &BoundaryReader) -> Result<BoundarySnapshot> {
        let time_iter = self.completed_step()?;
        Ok(reader.read_all(&self.driver, time_iter))
    }
}
