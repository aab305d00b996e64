//! Write boundary snapshots to hdf5
//!
//! File layout, one group per written time iteration:
//! ```text
//! iter00000042/u
//! iter00000042/du
//! iter00000042/y
//! iter00000042/tauw
//! iter00000042/time_iter
//! ```
use super::read_write_hdf5::{read_from_hdf5, read_scalar_from_hdf5};
use super::read_write_hdf5::{write_scalar_to_hdf5, write_to_hdf5};
use crate::boundary::BoundarySnapshot;
use crate::error::Result;
use crate::sink::SampleSink;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Group name of a time iteration
pub fn group_name(time_iter: usize) -> String {
    format!("iter{:0>8}", time_iter)
}

/// Hdf5 sink
#[derive(Debug, Clone)]
pub struct Hdf5Writer {
    filename: PathBuf,
}

impl Hdf5Writer {
    /// Write to `path`. With more than one rank every rank writes
    /// its own file, `wall.h5` becomes `wall_r0002.h5` on rank 2.
    pub fn new<P: AsRef<Path>>(path: P, rank: usize, size: usize) -> Self {
        let path = path.as_ref();
        let filename = if size > 1 {
            let stem = path.file_stem().map_or_else(
                || "boundary".to_owned(),
                |s| s.to_string_lossy().into_owned(),
            );
            let ext = path
                .extension()
                .map_or_else(|| "h5".to_owned(), |e| e.to_string_lossy().into_owned());
            path.with_file_name(format!("{}_r{:0>4}.{}", stem, rank, ext))
        } else {
            path.to_path_buf()
        };
        Self { filename }
    }

    /// Target file
    pub fn filename(&self) -> &Path {
        &self.filename
    }
}

impl SampleSink for Hdf5Writer {
    fn consume(&mut self, snapshot: &BoundarySnapshot) -> Result<()> {
        if let Some(parent) = self.filename.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let group = group_name(snapshot.time_iter);
        for (name, field) in snapshot.fields().iter() {
            write_to_hdf5(&self.filename, &format!("{}/{}", group, name), *field)?;
        }
        write_scalar_to_hdf5(
            &self.filename,
            &format!("{}/time_iter", group),
            snapshot.time_iter as u64,
        )?;
        debug!(" ==> {:?} ({})", self.filename, group);
        Ok(())
    }
}

/// Read back the snapshot of `time_iter`
///
/// # Errors
/// Missing file or group
#[allow(clippy::cast_possible_truncation)]
pub fn read_snapshot<P: AsRef<Path>>(filename: P, time_iter: usize) -> Result<BoundarySnapshot> {
    let filename = filename.as_ref();
    let group = group_name(time_iter);
    let read = |name: &str| {
        read_from_hdf5::<f64, ndarray::Ix1, _>(filename, &format!("{}/{}", group, name))
    };
    let stored: u64 = read_scalar_from_hdf5(filename, &format!("{}/time_iter", group))?;
    Ok(BoundarySnapshot {
        time_iter: stored as usize,
        u: read("u")?,
        du: read("du")?,
        y: read("y")?,
        tauw: read("tauw")?,
    })
}
