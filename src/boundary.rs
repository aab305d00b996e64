//! # Boundary data reader
//!
//! Reads the wall model quantities `u`, `du`, `y` and `tauw` at every
//! vertex of one marker. The marker is resolved and its vertex count is
//! queried once, when the reader is built, and reused for the whole run.
use crate::driver::{require_marker, vertex_count, FlowDriver};
use crate::error::{DriverError, Result};
use crate::types::{MarkerId, VertexSample};
use ndarray::Array1;

/// Reader bound to one resolved marker
#[derive(Debug, Clone)]
pub struct BoundaryReader {
    name: String,
    marker: MarkerId,
    n_vertex: usize,
    component: usize,
}

impl BoundaryReader {
    /// Resolve `name` and cache its vertex count.
    ///
    /// `component` selects the velocity (gradient) component.
    ///
    /// # Errors
    /// Marker not found
    pub fn new<D: FlowDriver + ?Sized>(driver: &D, name: &str, component: usize) -> Result<Self> {
        let marker = require_marker(driver, name)?;
        let n_vertex = vertex_count(driver, marker);
        Ok(Self {
            name: name.to_owned(),
            marker,
            n_vertex,
            component,
        })
    }

    /// Marker tag
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved marker id
    pub fn marker(&self) -> MarkerId {
        self.marker
    }

    /// Cached vertex count
    pub fn n_vertex(&self) -> usize {
        self.n_vertex
    }

    /// Velocity component
    pub fn component(&self) -> usize {
        self.component
    }

    fn read_unchecked<D: FlowDriver + ?Sized>(&self, driver: &D, vertex: usize) -> VertexSample {
        VertexSample {
            u: driver.velocity_off_wall(self.marker, vertex, self.component),
            du: driver.velocity_gradient_off_wall(self.marker, vertex, self.component),
            y: driver.vertex_coordinate_y(self.marker, vertex),
            tauw: driver.wall_shear_stress_wmles(self.marker, vertex),
        }
    }

    /// Read the four quantities at one vertex
    ///
    /// # Errors
    /// `vertex` not below the vertex count
    pub fn read_vertex<D: FlowDriver + ?Sized>(
        &self,
        driver: &D,
        vertex: usize,
    ) -> Result<VertexSample> {
        if vertex >= self.n_vertex {
            return Err(DriverError::VertexOutOfRange {
                marker: self.marker,
                index: vertex,
                count: self.n_vertex,
            });
        }
        Ok(self.read_unchecked(driver, vertex))
    }

    /// Read all vertices for the step `time_iter` just completed
    pub fn read_all<D: FlowDriver + ?Sized>(&self, driver: &D, time_iter: usize) -> BoundarySnapshot {
        let mut snapshot = BoundarySnapshot::zeros(time_iter, self.n_vertex);
        for j in 0..self.n_vertex {
            let sample = self.read_unchecked(driver, j);
            snapshot.u[j] = sample.u;
            snapshot.du[j] = sample.du;
            snapshot.y[j] = sample.y;
            snapshot.tauw[j] = sample.tauw;
        }
        snapshot
    }
}

/// Samples of all vertices of a marker at one time iteration
#[derive(Debug, Clone, PartialEq)]
pub struct BoundarySnapshot {
    /// Time iteration
    pub time_iter: usize,
    /// Velocity at the exchange location
    pub u: Array1<f64>,
    /// Velocity gradient at the exchange location
    pub du: Array1<f64>,
    /// Wall normal coordinate
    pub y: Array1<f64>,
    /// Wall shear stress
    pub tauw: Array1<f64>,
}

impl BoundarySnapshot {
    /// Snapshot of `n_vertex` zeros
    pub fn zeros(time_iter: usize, n_vertex: usize) -> Self {
        Self {
            time_iter,
            u: Array1::zeros(n_vertex),
            du: Array1::zeros(n_vertex),
            y: Array1::zeros(n_vertex),
            tauw: Array1::zeros(n_vertex),
        }
    }

    /// Number of vertices
    pub fn n_vertex(&self) -> usize {
        self.u.len()
    }

    /// Sample of vertex `j`, `None` if out of range
    pub fn sample(&self, j: usize) -> Option<VertexSample> {
        Some(VertexSample {
            u: *self.u.get(j)?,
            du: *self.du.get(j)?,
            y: *self.y.get(j)?,
            tauw: *self.tauw.get(j)?,
        })
    }

    /// Fields paired with their dataset names, see [`VertexSample::FIELDS`]
    pub fn fields(&self) -> [(&'static str, &Array1<f64>); 4] {
        let [u, du, y, tauw] = VertexSample::FIELDS;
        [(u, &self.u), (du, &self.du), (y, &self.y), (tauw, &self.tauw)]
    }

    /// Marker average of `[u, du, y, tauw]`, `None` without vertices
    pub fn means(&self) -> Option<[f64; 4]> {
        Some([
            self.u.mean()?,
            self.du.mean()?,
            self.y.mean()?,
            self.tauw.mean()?,
        ])
    }
}
