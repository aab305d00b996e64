//! # Consumers of boundary snapshots
//!
//! The driver loop hands every snapshot to a [`SampleSink`]. Implemented:
//! - [`Discard`], drop the data
//! - [`BoundaryHistory`], keep everything in memory
//! - [`InfoLog`], append marker averages over all ranks to a text file
//! - `Hdf5Writer`, one group per time iteration (feature `hdf5`)
//! - [`Every`], forward only every n-th snapshot
//! - [`Fanout`], forward to several sinks
use crate::boundary::BoundarySnapshot;
use crate::comm::Communication;
use crate::error::Result;
use ndarray::{Array1, Array2, Axis};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Consumer of boundary snapshots
pub trait SampleSink {
    /// Called once per accepted time step
    ///
    /// # Errors
    /// Sink specific, e.g. failed write
    fn consume(&mut self, snapshot: &BoundarySnapshot) -> Result<()>;
}

impl<S: SampleSink + ?Sized> SampleSink for Box<S> {
    fn consume(&mut self, snapshot: &BoundarySnapshot) -> Result<()> {
        (**self).consume(snapshot)
    }
}

impl<S: SampleSink + ?Sized> SampleSink for &mut S {
    fn consume(&mut self, snapshot: &BoundarySnapshot) -> Result<()> {
        (**self).consume(snapshot)
    }
}

/// Drop every snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl SampleSink for Discard {
    fn consume(&mut self, _snapshot: &BoundarySnapshot) -> Result<()> {
        Ok(())
    }
}

/// All snapshots of a run, stacked along time
#[derive(Debug, Clone, Default)]
pub struct BoundaryHistory {
    /// Time iterations
    pub time_iters: Vec<usize>,
    snapshots: Vec<BoundarySnapshot>,
}

impl BoundaryHistory {
    /// Empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored time iterations
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// True if nothing was stored
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Stored snapshots in time order
    pub fn snapshots(&self) -> &[BoundarySnapshot] {
        &self.snapshots
    }

    /// Quantity `name` (`u`, `du`, `y` or `tauw`) as `[time, vertex]` array.
    ///
    /// `None` for unknown names or if vertex counts differ between
    /// snapshots.
    pub fn stacked(&self, name: &str) -> Option<Array2<f64>> {
        let n_vertex = self.snapshots.first().map_or(0, BoundarySnapshot::n_vertex);
        let mut out = Array2::zeros((self.snapshots.len(), n_vertex));
        for (mut row, snapshot) in out.axis_iter_mut(Axis(0)).zip(&self.snapshots) {
            let (_, field) = snapshot.fields().iter().copied().find(|(n, _)| *n == name)?;
            if field.len() != n_vertex {
                return None;
            }
            row.assign(field);
        }
        Some(out)
    }

    /// Time average of the wall shear stress per vertex
    pub fn mean_tauw(&self) -> Option<Array1<f64>> {
        self.stacked("tauw")?.mean_axis(Axis(0))
    }
}

impl SampleSink for BoundaryHistory {
    fn consume(&mut self, snapshot: &BoundarySnapshot) -> Result<()> {
        self.time_iters.push(snapshot.time_iter);
        self.snapshots.push(snapshot.clone());
        Ok(())
    }
}

/// Appends `time_iter mean(u) mean(du) mean(tauw)` lines to a text file.
///
/// Means are taken over the vertices of the marker on all ranks. Every rank
/// must consume the same snapshots, only rank 0 writes.
#[derive(Clone)]
pub struct InfoLog<'a> {
    path: PathBuf,
    comm: &'a dyn Communication,
}

impl<'a> InfoLog<'a> {
    /// Log to `path`, averaged over the ranks of `comm`
    pub fn new<P: AsRef<Path>>(path: P, comm: &'a dyn Communication) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            comm,
        }
    }

    /// Target file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleSink for InfoLog<'_> {
    #[allow(clippy::cast_precision_loss)]
    fn consume(&mut self, snapshot: &BoundarySnapshot) -> Result<()> {
        let local = [
            snapshot.u.sum(),
            snapshot.du.sum(),
            snapshot.tauw.sum(),
            snapshot.n_vertex() as f64,
        ];
        let mut global = [0.; 4];
        self.comm.all_gather_sum(&local, &mut global);
        if !self.comm.is_root() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        let [u, du, tauw, n] = global;
        if n > 0. {
            writeln!(
                file,
                "{} {:e} {:e} {:e}",
                snapshot.time_iter,
                u / n,
                du / n,
                tauw / n
            )?;
        } else {
            writeln!(file, "{} nan nan nan", snapshot.time_iter)?;
        }
        Ok(())
    }
}

/// Forwards every `interval`-th snapshot (counted from the first one)
#[derive(Debug, Clone)]
pub struct Every<S> {
    interval: usize,
    count: usize,
    inner: S,
}

impl<S> Every<S> {
    /// Wrap `inner`, an interval of 0 is treated as 1
    pub fn new(interval: usize, inner: S) -> Self {
        Self {
            interval: interval.max(1),
            count: 0,
            inner,
        }
    }

    /// Wrapped sink
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: SampleSink> SampleSink for Every<S> {
    fn consume(&mut self, snapshot: &BoundarySnapshot) -> Result<()> {
        let due = self.count % self.interval == 0;
        self.count += 1;
        if due {
            self.inner.consume(snapshot)?;
        }
        Ok(())
    }
}

/// Forwards to several sinks, in order; stops at the first error
#[derive(Default)]
pub struct Fanout<'a> {
    sinks: Vec<Box<dyn SampleSink + 'a>>,
}

impl<'a> Fanout<'a> {
    /// No sinks
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn push<S: SampleSink + 'a>(&mut self, sink: S) {
        self.sinks.push(Box::new(sink));
    }

    /// Number of sinks
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// True without sinks
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl SampleSink for Fanout<'_> {
    fn consume(&mut self, snapshot: &BoundarySnapshot) -> Result<()> {
        for sink in &mut self.sinks {
            sink.consume(snapshot)?;
        }
        Ok(())
    }
}
